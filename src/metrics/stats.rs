//! Latency statistics over a sample of successful attempts

use serde::{Deserialize, Serialize};

/// Summary statistics of a latency sample, in milliseconds
///
/// Every field is `None` when the sample is empty, so "no successful
/// attempts" never reads as "zero latency". Serialized as JSON `null`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    /// Number of samples
    pub samples: usize,
    /// Arithmetic mean
    pub mean_ms: Option<f64>,
    /// Smallest sample
    pub min_ms: Option<f64>,
    /// Largest sample
    pub max_ms: Option<f64>,
    /// Population standard deviation
    pub stddev_ms: Option<f64>,
}

impl LatencyStats {
    /// Compute statistics over a sample
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            samples: samples.len(),
            mean_ms: Some(mean),
            min_ms: Some(min),
            max_ms: Some(max),
            stddev_ms: Some(variance.sqrt()),
        }
    }

    /// Check if the statistics are undefined
    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }
}

/// Format an optional millisecond value for human output
pub fn format_ms(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2} ms", v))
        .unwrap_or_else(|| "n/a".to_string())
}

//! Latency distribution histogram

use crate::metrics::ExperimentResult;
use super::{ensure_font, FONT_FAMILY};
use anyhow::{bail, Result};
use plotters::prelude::*;
use std::path::Path;

const MAX_BINS: usize = 20;
const MIN_BINS: usize = 5;

pub struct HistogramPlotter;

impl HistogramPlotter {
    /// Plot the distribution of successful attempt latencies
    pub fn plot(result: &ExperimentResult, path: &Path) -> Result<()> {
        let mut values: Vec<f64> = result
            .attempts()
            .filter(|a| a.is_success())
            .map(|a| a.latency_ms)
            .collect();
        if values.is_empty() {
            bail!("no successful attempts to plot for '{}'", result.name);
        }
        values.sort_by(f64::total_cmp);

        let bins = bin_latencies(&values);
        let max_count = bins.counts.iter().copied().max().unwrap_or(0);

        ensure_font()?;
        let root = BitMapBackend::new(path, (1200, 800)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("{} latency distribution", result.name),
                (FONT_FAMILY, 40),
            )
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(
                bins.min..(bins.min + bins.width * bins.counts.len() as f64),
                0f64..(max_count as f64 * 1.1).max(1.0),
            )?;

        chart
            .configure_mesh()
            .x_desc("Latency (ms)")
            .y_desc("Attempts")
            .x_label_formatter(&|x| format!("{:.0}", x))
            .draw()?;

        chart.draw_series(bins.counts.iter().enumerate().map(|(idx, &count)| {
            let x0 = bins.min + idx as f64 * bins.width;
            let x1 = x0 + bins.width;
            Rectangle::new([(x0, 0.0), (x1, count as f64)], BLUE.mix(0.6).filled())
        }))?;

        if let Some(mean) = result.latency.mean_ms {
            chart.draw_series(LineSeries::new(
                vec![(mean, 0.0), (mean, max_count as f64 * 1.05)],
                RED.stroke_width(2),
            ))?;
        }

        root.present()?;
        Ok(())
    }
}

struct Bins {
    min: f64,
    width: f64,
    counts: Vec<u32>,
}

/// Bin sorted latencies into equal-width buckets
fn bin_latencies(sorted: &[f64]) -> Bins {
    let min = sorted.first().copied().unwrap_or(0.0);
    let max = sorted.last().copied().unwrap_or(0.0);
    let num_bins = sorted.len().clamp(MIN_BINS, MAX_BINS);

    let span = max - min;
    let width = if span > 0.0 {
        span / num_bins as f64
    } else {
        1.0
    };

    let mut counts = vec![0u32; num_bins];
    for &value in sorted {
        let idx = (((value - min) / width) as usize).min(num_bins - 1);
        counts[idx] += 1;
    }

    Bins { min, width, counts }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binning_covers_every_sample() {
        let values = vec![100.0, 110.0, 120.0, 130.0, 140.0, 400.0];
        let bins = bin_latencies(&values);
        assert_eq!(bins.counts.len(), 6);
        assert_eq!(bins.counts.iter().sum::<u32>(), 6);
        assert_eq!(bins.min, 100.0);
        assert_eq!(*bins.counts.last().unwrap(), 1);
    }

    #[test]
    fn test_binning_identical_values() {
        let bins = bin_latencies(&[200.0, 200.0, 200.0]);
        assert_eq!(bins.width, 1.0);
        assert_eq!(bins.counts[0], 3);
        assert_eq!(bins.counts.len(), MIN_BINS);
    }
}

//! CSV export functionality

use crate::metrics::{ComprehensiveResult, ExperimentResult, LatencyStats};
use anyhow::{Context, Result};
use csv::Writer;
use std::fs::File;
use std::path::Path;

pub struct CsvExporter;

impl CsvExporter {
    /// Export every raw attempt, one row per attempt
    pub fn export_attempts(result: &ExperimentResult, path: &Path) -> Result<()> {
        let mut wtr = writer(path)?;

        wtr.write_record([
            "experiment",
            "prompt_index",
            "category",
            "attempt",
            "started_at",
            "latency_ms",
            "outcome",
            "error",
            "response_bytes",
            "prompt",
            "limitations",
        ])?;

        for prompt_result in &result.prompts {
            let prompt = &prompt_result.prompt;
            for attempt in &prompt_result.attempts {
                wtr.write_record([
                    result.name.clone(),
                    attempt.prompt_index.to_string(),
                    prompt.category.clone().unwrap_or_default(),
                    attempt.attempt_index.to_string(),
                    attempt.started_at.to_rfc3339(),
                    format!("{:.2}", attempt.latency_ms),
                    attempt.outcome.as_str().to_string(),
                    attempt.error.clone().unwrap_or_default(),
                    attempt
                        .response_bytes
                        .map(|b| b.to_string())
                        .unwrap_or_default(),
                    prompt.text.clone(),
                    attempt.limitation_labels(),
                ])?;
            }
        }

        wtr.flush()?;
        Ok(())
    }

    /// Export per-prompt statistics plus an overall row
    ///
    /// Undefined statistics are written as empty cells.
    pub fn export_summary(result: &ExperimentResult, path: &Path) -> Result<()> {
        let mut wtr = writer(path)?;

        wtr.write_record([
            "prompt_index",
            "category",
            "prompt",
            "attempts",
            "successes",
            "errors",
            "success_rate_percent",
            "mean_ms",
            "min_ms",
            "max_ms",
            "stddev_ms",
            "baseline_secs",
            "improvement_secs",
            "improvement_percent",
        ])?;

        for p in &result.prompts {
            let mut row = vec![
                p.prompt.index.to_string(),
                p.prompt.category.clone().unwrap_or_default(),
                p.prompt.text.clone(),
                p.count.to_string(),
                p.success_count.to_string(),
                p.error_count.to_string(),
                percent(p.success_rate()),
            ];
            row.extend(stats_cells(&p.latency));
            row.push(cell(p.prompt.baseline_secs));
            row.push(cell(p.improvement_secs));
            row.push(cell(p.improvement_percent));
            wtr.write_record(&row)?;
        }

        let mut overall = vec![
            "overall".to_string(),
            String::new(),
            String::new(),
            result.total_attempts.to_string(),
            result.total_successes.to_string(),
            result.total_errors.to_string(),
            percent(result.success_rate),
        ];
        overall.extend(stats_cells(&result.latency));
        overall.extend([String::new(), String::new(), String::new()]);
        wtr.write_record(&overall)?;

        wtr.flush()?;
        Ok(())
    }

    /// Export one summary row per experiment
    pub fn export_comparison(combined: &ComprehensiveResult, path: &Path) -> Result<()> {
        let mut wtr = writer(path)?;

        wtr.write_record([
            "experiment",
            "client",
            "attempts",
            "successes",
            "errors",
            "success_rate_percent",
            "mean_ms",
            "min_ms",
            "max_ms",
            "stddev_ms",
            "total_elapsed_secs",
        ])?;

        for (name, result) in &combined.experiments {
            let mut row = vec![
                name.clone(),
                result.client.clone(),
                result.total_attempts.to_string(),
                result.total_successes.to_string(),
                result.total_errors.to_string(),
                percent(result.success_rate),
            ];
            row.extend(stats_cells(&result.latency));
            row.push(format!("{:.2}", result.total_elapsed_ms / 1000.0));
            wtr.write_record(&row)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

fn writer(path: &Path) -> Result<Writer<File>> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    Ok(Writer::from_writer(file))
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

fn percent(rate: f64) -> String {
    format!("{:.1}", rate * 100.0)
}

fn stats_cells(stats: &LatencyStats) -> [String; 4] {
    [
        cell(stats.mean_ms),
        cell(stats.min_ms),
        cell(stats.max_ms),
        cell(stats.stddev_ms),
    ]
}

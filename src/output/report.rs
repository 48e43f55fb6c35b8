//! Report emitter
//!
//! Writes every artifact of a run into the output directory. Each artifact is
//! an independent step: a failed chart or file is logged and recorded in the
//! [`ReportOutcome`], and the remaining steps still run.

use super::{CsvExporter, JsonExporter, ResponseLog};
use crate::error::panic_message;
use crate::metrics::{ComprehensiveResult, ExperimentResult};
use crate::visualization::{ComparisonPlotter, HistogramPlotter, LatencyBarPlotter};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

/// Timestamp format used in every report filename
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// What an emit call produced
#[derive(Debug, Default)]
pub struct ReportOutcome {
    /// Files written successfully
    pub written: Vec<PathBuf>,
    /// (step, error) for every step that failed
    pub failures: Vec<(String, String)>,
    /// Steps skipped because there was nothing to render
    pub skipped: Vec<String>,
}

impl ReportOutcome {
    /// Check if every attempted step succeeded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Emits JSON, CSV, text and chart reports for experiment results
#[derive(Debug, Clone)]
pub struct ReportEmitter {
    output_dir: PathBuf,
    charts: bool,
    timestamp: String,
}

impl ReportEmitter {
    /// Create an emitter writing into `output_dir`, stamped with the current time
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            charts: true,
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    /// Enable or disable chart rendering
    pub fn with_charts(mut self, charts: bool) -> Self {
        self.charts = charts;
        self
    }

    /// Use a fixed timestamp for filenames
    pub fn with_timestamp(mut self, at: DateTime<Local>) -> Self {
        self.timestamp = at.format(TIMESTAMP_FORMAT).to_string();
        self
    }

    /// Get the output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of one artifact: `<kind>_<experiment>_<timestamp>.<ext>`
    pub fn artifact_path(&self, kind: &str, experiment: &str, ext: &str) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}_{}.{}",
            kind,
            sanitize(experiment),
            self.timestamp,
            ext
        ))
    }

    /// Emit every artifact for one experiment
    pub fn emit(&self, result: &ExperimentResult) -> ReportOutcome {
        let mut outcome = ReportOutcome::default();
        self.prepare_dir(&mut outcome);
        self.emit_into(result, &mut outcome);
        outcome
    }

    fn emit_into(&self, result: &ExperimentResult, outcome: &mut ReportOutcome) {
        let name = result.name.as_str();
        self.step(outcome, "json", self.artifact_path("results", name, "json"), |p| {
            JsonExporter::export(result, p)
        });
        self.step(outcome, "attempts csv", self.artifact_path("attempts", name, "csv"), |p| {
            CsvExporter::export_attempts(result, p)
        });
        self.step(outcome, "summary csv", self.artifact_path("summary", name, "csv"), |p| {
            CsvExporter::export_summary(result, p)
        });
        self.step(outcome, "response log", self.artifact_path("responses", name, "txt"), |p| {
            ResponseLog::export(result, p)
        });

        if !self.charts {
            return;
        }
        if result.latency.is_empty() {
            tracing::warn!(experiment = name, "No successful attempts, skipping charts");
            outcome.skipped.push(format!("{name} charts"));
            return;
        }

        self.step(outcome, "latency chart", self.artifact_path("latency", name, "png"), |p| {
            LatencyBarPlotter::plot(result, p)
        });
        self.step(outcome, "histogram", self.artifact_path("histogram", name, "png"), |p| {
            HistogramPlotter::plot(result, p)
        });
    }

    /// Emit every experiment plus the combined JSON, comparison CSV and chart
    pub fn emit_comprehensive(&self, combined: &ComprehensiveResult) -> ReportOutcome {
        let mut outcome = ReportOutcome::default();
        self.prepare_dir(&mut outcome);

        for result in combined.experiments.values() {
            self.emit_into(result, &mut outcome);
        }

        self.step(&mut outcome, "combined json", self.artifact_path("results", "all", "json"), |p| {
            JsonExporter::export_comprehensive(combined, p)
        });
        self.step(&mut outcome, "comparison csv", self.artifact_path("comparison", "all", "csv"), |p| {
            CsvExporter::export_comparison(combined, p)
        });

        if self.charts {
            if combined.experiments.values().all(|e| e.latency.is_empty()) {
                outcome.skipped.push("comparison chart".to_string());
            } else {
                self.step(
                    &mut outcome,
                    "comparison chart",
                    self.artifact_path("comparison", "all", "png"),
                    |p| ComparisonPlotter::plot(combined, p),
                );
            }
        }

        outcome
    }

    fn prepare_dir(&self, outcome: &mut ReportOutcome) {
        if let Err(e) = fs::create_dir_all(&self.output_dir) {
            tracing::error!(
                dir = %self.output_dir.display(),
                error = %e,
                "Failed to create output directory"
            );
            outcome
                .failures
                .push(("output directory".to_string(), e.to_string()));
        }
    }

    fn step<F>(&self, outcome: &mut ReportOutcome, label: &str, path: PathBuf, f: F)
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| f(&path)))
            .unwrap_or_else(|payload| Err(anyhow!("panicked: {}", panic_message(&*payload))));
        match attempt {
            Ok(()) => {
                tracing::info!(step = label, path = %path.display(), "Report written");
                outcome.written.push(path);
            }
            Err(e) => {
                tracing::warn!(step = label, path = %path.display(), error = %e, "Report step failed");
                outcome.failures.push((label.to_string(), format!("{e:#}")));
            }
        }
    }
}

/// Keep experiment names filesystem-safe
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExperimentConfig;
    use crate::metrics::{PromptResult, SearchAttempt};
    use crate::prompts::Prompt;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn result(name: &str, succeed: bool) -> ExperimentResult {
        let now = Utc::now();
        let attempts = if succeed {
            vec![
                SearchAttempt::success(1, 1, now, 100.0),
                SearchAttempt::success(1, 2, now, 140.0),
            ]
        } else {
            vec![SearchAttempt::failure(1, 1, now, 5.0, "down")]
        };
        let prompt = PromptResult::from_attempts(Prompt::new(1, "q"), attempts);
        ExperimentResult::from_prompt_results(
            name,
            "mock",
            now,
            ExperimentConfig::immediate(2),
            vec![prompt],
            300.0,
        )
    }

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 9, 30, 5).unwrap()
    }

    #[test]
    fn test_artifact_path_is_timestamped() {
        let emitter = ReportEmitter::new("/tmp/out").with_timestamp(fixed_time());
        assert_eq!(
            emitter.artifact_path("results", "search", "json"),
            PathBuf::from("/tmp/out/results_search_20250601_093005.json")
        );
        assert_eq!(
            emitter.artifact_path("results", "news/search", "json"),
            PathBuf::from("/tmp/out/results_news_search_20250601_093005.json")
        );
    }

    #[test]
    fn test_emit_without_charts_writes_data_files() {
        let dir = tempdir().unwrap();
        let emitter = ReportEmitter::new(dir.path())
            .with_charts(false)
            .with_timestamp(fixed_time());

        let outcome = emitter.emit(&result("search", true));
        assert!(outcome.is_complete(), "{:?}", outcome.failures);
        assert_eq!(outcome.written.len(), 4);
        for path in &outcome.written {
            assert!(path.exists());
        }

        let loaded =
            JsonExporter::load(&emitter.artifact_path("results", "search", "json")).unwrap();
        assert_eq!(loaded.name, "search");
        assert_eq!(loaded.total_attempts, 2);
        assert_eq!(loaded.latency.mean_ms, Some(120.0));
    }

    #[test]
    fn test_charts_skipped_without_successes() {
        let dir = tempdir().unwrap();
        let emitter = ReportEmitter::new(dir.path()).with_timestamp(fixed_time());

        let outcome = emitter.emit(&result("agent", false));
        assert!(outcome.is_complete());
        assert_eq!(outcome.written.len(), 4);
        assert_eq!(outcome.skipped, vec!["agent charts".to_string()]);
    }

    #[test]
    fn test_failed_step_does_not_stop_the_others() {
        let dir = tempdir().unwrap();
        let emitter = ReportEmitter::new(dir.path())
            .with_charts(false)
            .with_timestamp(fixed_time());

        // occupy the JSON path with a directory so only that step fails
        fs::create_dir_all(emitter.artifact_path("results", "search", "json")).unwrap();

        let outcome = emitter.emit(&result("search", true));
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, "json");
        assert_eq!(outcome.written.len(), 3);
    }

    #[test]
    fn test_emit_comprehensive_writes_combined_files() {
        let dir = tempdir().unwrap();
        let emitter = ReportEmitter::new(dir.path())
            .with_charts(false)
            .with_timestamp(fixed_time());

        let mut combined = ComprehensiveResult::new();
        combined.insert(result("search", true));
        combined.insert(result("agent", false));

        let outcome = emitter.emit_comprehensive(&combined);
        assert!(outcome.is_complete(), "{:?}", outcome.failures);
        // 4 per experiment + combined json + comparison csv
        assert_eq!(outcome.written.len(), 10);
        assert!(emitter.artifact_path("results", "all", "json").exists());
        assert!(emitter.artifact_path("comparison", "all", "csv").exists());
    }

    #[test]
    fn test_emit_renders_charts() {
        let dir = tempdir().unwrap();
        let emitter = ReportEmitter::new(dir.path()).with_timestamp(fixed_time());

        let outcome = emitter.emit(&result("search", true));
        assert!(outcome.is_complete(), "{:?}", outcome.failures);
        assert_eq!(outcome.written.len(), 6);
        for kind in ["latency", "histogram"] {
            let png = emitter.artifact_path(kind, "search", "png");
            assert!(fs::metadata(&png).unwrap().len() > 0, "{} missing", png.display());
        }
    }

    #[test]
    fn test_emit_comprehensive_renders_charts() {
        let dir = tempdir().unwrap();
        let emitter = ReportEmitter::new(dir.path()).with_timestamp(fixed_time());

        let mut combined = ComprehensiveResult::new();
        combined.insert(result("search", true));
        combined.insert(result("concurrent", true));
        combined.insert(result("agent", false));

        let outcome = emitter.emit_comprehensive(&combined);
        assert!(outcome.is_complete(), "{:?}", outcome.failures);
        assert_eq!(outcome.skipped, vec!["agent charts".to_string()]);
        // 6 per charted experiment, 4 for agent, then json, csv and chart
        assert_eq!(outcome.written.len(), 19);
        assert!(emitter.artifact_path("comparison", "all", "png").exists());
        assert!(emitter.artifact_path("latency", "concurrent", "png").exists());
    }

    #[test]
    fn test_panicking_step_is_recorded_as_failure() {
        let dir = tempdir().unwrap();
        let emitter = ReportEmitter::new(dir.path()).with_timestamp(fixed_time());
        let mut outcome = ReportOutcome::default();

        emitter.step(&mut outcome, "latency chart", dir.path().join("a.png"), |_| {
            panic!("unable to draw text")
        });
        emitter.step(&mut outcome, "json", dir.path().join("b.json"), |p| {
            fs::write(p, "{}")?;
            Ok(())
        });

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, "latency chart");
        assert!(outcome.failures[0].1.contains("unable to draw text"));
        assert_eq!(outcome.written, vec![dir.path().join("b.json")]);
    }

    #[test]
    fn test_unusable_output_dir_reported_once() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("taken");
        fs::write(&blocker, "not a directory").unwrap();
        let emitter = ReportEmitter::new(&blocker)
            .with_charts(false)
            .with_timestamp(fixed_time());

        let mut combined = ComprehensiveResult::new();
        combined.insert(result("search", true));
        combined.insert(result("agent", true));

        let outcome = emitter.emit_comprehensive(&combined);
        let dir_failures = outcome
            .failures
            .iter()
            .filter(|(step, _)| step == "output directory")
            .count();
        assert_eq!(dir_failures, 1);
        assert!(outcome.written.is_empty());
    }
}

//! JSON export functionality
//!
//! The JSON report is the lossless record of a run: every raw attempt plus
//! every derived statistic. Loading it back yields an identical result.

use crate::metrics::{ComprehensiveResult, ExperimentResult};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub struct JsonExporter;

impl JsonExporter {
    /// Export one experiment result
    pub fn export(result: &ExperimentResult, path: &Path) -> Result<()> {
        write_pretty(result, path)
    }

    /// Export a combined result of several experiments
    pub fn export_comprehensive(combined: &ComprehensiveResult, path: &Path) -> Result<()> {
        write_pretty(combined, path)
    }

    /// Load an experiment result written by [`JsonExporter::export`]
    pub fn load(path: &Path) -> Result<ExperimentResult> {
        read(path)
    }

    /// Load a combined result written by [`JsonExporter::export_comprehensive`]
    pub fn load_comprehensive(path: &Path) -> Result<ComprehensiveResult> {
        read(path)
    }
}

fn write_pretty<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExperimentConfig;
    use crate::metrics::{PromptResult, SearchAttempt};
    use crate::prompts::Prompt;
    use chrono::Utc;
    use tempfile::tempdir;

    fn sample() -> ExperimentResult {
        let now = Utc::now();
        let p1 = PromptResult::from_attempts(
            Prompt::new(1, "oil prices?").with_category("market_data"),
            vec![
                SearchAttempt::success(1, 1, now, 123.456789).with_response(42, "{\"a\":1}"),
                SearchAttempt::failure(1, 2, now, 3001.5, "API error (429): slow down"),
                SearchAttempt::success(1, 3, now, 98.765432),
            ],
        );
        let p2 = PromptResult::from_attempts(
            Prompt::new(2, "ftse?").with_baseline_secs(7.5),
            vec![SearchAttempt::failure(2, 1, now, 10.0, "empty response")],
        );
        ExperimentResult::from_prompt_results(
            "search",
            "web-search",
            now,
            ExperimentConfig::default(),
            vec![p1, p2],
            9876.5,
        )
    }

    #[test]
    fn test_round_trip_reproduces_attempts_and_statistics() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("search.json");
        let result = sample();

        JsonExporter::export(&result, &path).unwrap();
        let loaded = JsonExporter::load(&path).unwrap();

        assert_eq!(loaded, result);
        assert_eq!(loaded.reaggregate(), result);
    }

    #[test]
    fn test_null_statistics_in_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("search.json");
        JsonExporter::export(&sample(), &path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let prompt2 = &raw["prompts"][1];
        assert!(prompt2["latency"]["mean_ms"].is_null());
        assert!(prompt2["latency"]["stddev_ms"].is_null());
        assert_eq!(prompt2["error_count"], 1);
        assert_eq!(raw["prompts"][0]["attempts"][1]["outcome"], "error");
    }

    #[test]
    fn test_comprehensive_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("all.json");
        let mut combined = ComprehensiveResult::new();
        combined.insert(sample());

        JsonExporter::export_comprehensive(&combined, &path).unwrap();
        let loaded = JsonExporter::load_comprehensive(&path).unwrap();
        assert_eq!(loaded, combined);
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = JsonExporter::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }
}

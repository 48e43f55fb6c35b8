//! Plain-text response log for manual inspection

use crate::metrics::{format_ms, ExperimentResult};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct ResponseLog;

impl ResponseLog {
    /// Write every attempt with its latency and response preview
    pub fn export(result: &ExperimentResult, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        Self::write_to(result, &mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Render the log into any writer
    pub fn write_to<W: Write>(result: &ExperimentResult, out: &mut W) -> Result<()> {
        writeln!(out, "Experiment: {} ({})", result.name, result.client)?;
        writeln!(out, "Started:    {}", result.started_at.to_rfc3339())?;
        writeln!(
            out,
            "Attempts:   {} ({} errors, {:.1}% success)",
            result.total_attempts,
            result.total_errors,
            result.success_rate * 100.0
        )?;

        for p in &result.prompts {
            writeln!(out)?;
            writeln!(out, "{}", "=".repeat(80))?;
            match &p.prompt.category {
                Some(category) => writeln!(out, "Prompt {} [{}]", p.prompt.index, category)?,
                None => writeln!(out, "Prompt {}", p.prompt.index)?,
            }
            writeln!(out, "{}", p.prompt.text)?;
            writeln!(out, "{}", "=".repeat(80))?;

            for attempt in &p.attempts {
                write!(
                    out,
                    "  #{} {} {:.2} ms",
                    attempt.attempt_index,
                    attempt.outcome.as_str(),
                    attempt.latency_ms
                )?;
                if let Some(bytes) = attempt.response_bytes {
                    write!(out, " ({} bytes)", bytes)?;
                }
                writeln!(out)?;
                if let Some(error) = &attempt.error {
                    writeln!(out, "    error: {}", error)?;
                }
                if !attempt.limitations.is_empty() {
                    writeln!(out, "    limitations: {}", attempt.limitation_labels())?;
                }
                if let Some(preview) = &attempt.response_preview {
                    writeln!(out, "    {}", preview)?;
                }
            }

            writeln!(
                out,
                "  mean {} | min {} | max {} | stddev {}",
                format_ms(p.latency.mean_ms),
                format_ms(p.latency.min_ms),
                format_ms(p.latency.max_ms),
                format_ms(p.latency.stddev_ms)
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExperimentConfig;
    use crate::metrics::{PromptResult, SearchAttempt, SearchLimitation};
    use crate::prompts::Prompt;
    use chrono::Utc;

    #[test]
    fn test_log_contents() {
        let now = Utc::now();
        let prompt = PromptResult::from_attempts(
            Prompt::new(1, "What is the price of gold?").with_category("market_data"),
            vec![
                SearchAttempt::success(1, 1, now, 120.0)
                    .with_response(2048, "Gold trades at")
                    .with_limitations(vec![SearchLimitation::TrainingData]),
                SearchAttempt::failure(1, 2, now, 30.0, "API error (500): oops"),
            ],
        );
        let result = ExperimentResult::from_prompt_results(
            "agent",
            "grounded-agent",
            now,
            ExperimentConfig::immediate(2),
            vec![prompt],
            500.0,
        );

        let mut buf = Vec::new();
        ResponseLog::write_to(&result, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("Experiment: agent (grounded-agent)"));
        assert!(text.contains("Attempts:   2 (1 errors, 50.0% success)"));
        assert!(text.contains("Prompt 1 [market_data]"));
        assert!(text.contains("  #1 success 120.00 ms (2048 bytes)"));
        assert!(text.contains("    limitations: training data\n    Gold trades at"));
        assert_eq!(text.matches("limitations:").count(), 1);
        assert!(text.contains("    error: API error (500): oops"));
        assert!(text.contains("mean 120.00 ms | min 120.00 ms"));
    }
}

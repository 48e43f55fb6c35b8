//! Run observers
//!
//! The executor and runner report through a `RunObserver` instead of logging
//! directly, so tests can capture what a run reports.

use crate::metrics::{format_ms, ExperimentResult, PromptResult, SearchAttempt};
use crate::prompts::Prompt;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Receiver of per-attempt and per-run records
pub trait RunObserver: Send + Sync {
    /// A run is about to issue `total_attempts` attempts
    fn run_started(&self, _experiment: &str, _total_attempts: usize) {}

    /// One attempt finished
    fn record_attempt(&self, experiment: &str, prompt: &Prompt, attempt: &SearchAttempt);

    /// All attempts of one prompt finished
    fn record_prompt(&self, _experiment: &str, _result: &PromptResult) {}

    /// The run finished and was aggregated
    fn record_summary(&self, result: &ExperimentResult);
}

/// Observer that logs through `tracing` and optionally drives a progress bar
#[derive(Default)]
pub struct TracingObserver {
    show_progress: bool,
    progress: Mutex<Option<ProgressBar>>,
}

impl TracingObserver {
    /// Log only
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and show a console progress bar per run
    pub fn with_progress() -> Self {
        Self {
            show_progress: true,
            progress: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.progress.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

impl RunObserver for TracingObserver {
    fn run_started(&self, experiment: &str, total_attempts: usize) {
        tracing::info!(experiment, total_attempts, "Starting experiment run");

        if !self.show_progress {
            return;
        }
        let pb = ProgressBar::new(total_attempts as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(experiment.to_string());
        if let Ok(mut guard) = self.progress.lock() {
            *guard = Some(pb);
        }
    }

    fn record_attempt(&self, experiment: &str, prompt: &Prompt, attempt: &SearchAttempt) {
        match attempt.error.as_deref() {
            None => tracing::info!(
                experiment,
                prompt = attempt.prompt_index,
                attempt = attempt.attempt_index,
                latency_ms = attempt.latency_ms,
                outcome = attempt.outcome.as_str(),
                bytes = ?attempt.response_bytes,
                "Search attempt completed"
            ),
            Some(error) => tracing::warn!(
                experiment,
                prompt = attempt.prompt_index,
                attempt = attempt.attempt_index,
                latency_ms = attempt.latency_ms,
                outcome = attempt.outcome.as_str(),
                error,
                query = %prompt.preview(80),
                "Search attempt failed"
            ),
        }
        self.with_bar(|pb| pb.inc(1));
    }

    fn record_prompt(&self, experiment: &str, result: &PromptResult) {
        tracing::info!(
            experiment,
            prompt = result.prompt.index,
            successes = result.success_count,
            errors = result.error_count,
            mean = %format_ms(result.latency.mean_ms),
            "Prompt completed"
        );
    }

    fn record_summary(&self, result: &ExperimentResult) {
        if let Ok(mut guard) = self.progress.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_with_message(format!("{} complete", result.name));
            }
        }

        tracing::info!(
            experiment = %result.name,
            client = %result.client,
            attempts = result.total_attempts,
            errors = result.total_errors,
            success_rate = %format!("{:.1}%", result.success_rate * 100.0),
            mean = %format_ms(result.latency.mean_ms),
            min = %format_ms(result.latency.min_ms),
            max = %format_ms(result.latency.max_ms),
            stddev = %format_ms(result.latency.stddev_ms),
            elapsed_secs = result.total_elapsed_ms / 1000.0,
            "Experiment completed"
        );
    }
}

/// Observer that keeps every record in memory
#[derive(Debug, Default)]
pub struct MemoryObserver {
    attempts: Mutex<Vec<(String, SearchAttempt)>>,
    prompts: Mutex<Vec<(String, usize)>>,
    summaries: Mutex<Vec<ExperimentResult>>,
}

impl MemoryObserver {
    /// Create an empty observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts recorded so far, with their experiment name
    pub fn attempts(&self) -> Vec<(String, SearchAttempt)> {
        self.attempts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// (experiment, prompt index) for every completed prompt
    pub fn prompts(&self) -> Vec<(String, usize)> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Summaries recorded so far
    pub fn summaries(&self) -> Vec<ExperimentResult> {
        self.summaries.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl RunObserver for MemoryObserver {
    fn record_attempt(&self, experiment: &str, _prompt: &Prompt, attempt: &SearchAttempt) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push((experiment.to_string(), attempt.clone()));
        }
    }

    fn record_prompt(&self, experiment: &str, result: &PromptResult) {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((experiment.to_string(), result.prompt.index));
        }
    }

    fn record_summary(&self, result: &ExperimentResult) {
        if let Ok(mut summaries) = self.summaries.lock() {
            summaries.push(result.clone());
        }
    }
}

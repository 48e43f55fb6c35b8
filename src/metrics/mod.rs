//! Attempt records and result aggregation
//!
//! Every measured call is a [`SearchAttempt`]. Attempts are grouped per prompt
//! into a [`PromptResult`], and prompt results into an [`ExperimentResult`].
//! Latency statistics only ever consider successful attempts, and the overall
//! statistics of an experiment are computed over the flattened sample of all
//! successful attempts rather than averaged per prompt.

mod stats;

pub use stats::{format_ms, LatencyStats};

use crate::config::ExperimentConfig;
use crate::prompts::Prompt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Call returned without error and with a non-empty response
    Success,
    /// Call raised an error or returned nothing
    Error,
}

impl Outcome {
    /// Check if this outcome is a success
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Lowercase label used in logs and CSV output
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Error => "error",
        }
    }
}

/// Hint in an answer that it was not grounded in live search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchLimitation {
    /// Mentions trouble searching
    SearchIssues,
    /// Mentions answering from training data
    TrainingData,
    /// Mentions a 2023 / October knowledge cutoff
    KnowledgeCutoff,
}

impl SearchLimitation {
    /// Label used in logs and CSV output
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchLimitation::SearchIssues => "search issues",
            SearchLimitation::TrainingData => "training data",
            SearchLimitation::KnowledgeCutoff => "2023 cutoff",
        }
    }

    /// Scan answer text for limitation hints, case-insensitively
    pub fn detect(text: &str) -> Vec<SearchLimitation> {
        let lower = text.to_lowercase();
        let mut found = Vec::new();
        if lower.contains("search") && (lower.contains("issue") || lower.contains("unable")) {
            found.push(SearchLimitation::SearchIssues);
        }
        if lower.contains("training data") {
            found.push(SearchLimitation::TrainingData);
        }
        if lower.contains("2023") || lower.contains("october") {
            found.push(SearchLimitation::KnowledgeCutoff);
        }
        found
    }
}

/// One timed invocation of the search call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchAttempt {
    /// 1-based prompt index
    pub prompt_index: usize,
    /// 1-based attempt index within the prompt
    pub attempt_index: usize,
    /// Wall-clock time the attempt was issued
    pub started_at: DateTime<Utc>,
    /// Elapsed time until the complete response (or the error) in milliseconds
    pub latency_ms: f64,
    /// Success or error
    pub outcome: Outcome,
    /// Error detail, present only on errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Response payload size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_bytes: Option<usize>,
    /// Bounded preview of the response content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_preview: Option<String>,
    /// Limitation hints found in the answer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limitations: Vec<SearchLimitation>,
}

impl SearchAttempt {
    /// Create a successful attempt
    pub fn success(
        prompt_index: usize,
        attempt_index: usize,
        started_at: DateTime<Utc>,
        latency_ms: f64,
    ) -> Self {
        Self {
            prompt_index,
            attempt_index,
            started_at,
            latency_ms,
            outcome: Outcome::Success,
            error: None,
            response_bytes: None,
            response_preview: None,
            limitations: Vec::new(),
        }
    }

    /// Create a failed attempt
    pub fn failure(
        prompt_index: usize,
        attempt_index: usize,
        started_at: DateTime<Utc>,
        latency_ms: f64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            prompt_index,
            attempt_index,
            started_at,
            latency_ms,
            outcome: Outcome::Error,
            error: Some(error.into()),
            response_bytes: None,
            response_preview: None,
            limitations: Vec::new(),
        }
    }

    /// Attach a response summary
    pub fn with_response(mut self, bytes: usize, preview: impl Into<String>) -> Self {
        self.response_bytes = Some(bytes);
        self.response_preview = Some(preview.into());
        self
    }

    /// Record limitation hints found in the answer
    pub fn with_limitations(mut self, limitations: Vec<SearchLimitation>) -> Self {
        self.limitations = limitations;
        self
    }

    /// Comma separated limitation labels, empty when there are none
    pub fn limitation_labels(&self) -> String {
        self.limitations
            .iter()
            .map(SearchLimitation::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Check if the attempt succeeded
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// All attempts for one prompt plus derived statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptResult {
    /// The prompt these attempts were issued for
    pub prompt: Prompt,
    /// Raw attempts, in issue order
    pub attempts: Vec<SearchAttempt>,
    /// Number of attempts
    pub count: usize,
    /// Number of successful attempts
    pub success_count: usize,
    /// Number of failed attempts
    pub error_count: usize,
    /// Latency statistics over successful attempts
    pub latency: LatencyStats,
    /// Baseline minus mean latency, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvement_secs: Option<f64>,
    /// Improvement relative to the baseline, in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvement_percent: Option<f64>,
}

impl PromptResult {
    /// Aggregate the attempts of one prompt
    pub fn from_attempts(prompt: Prompt, attempts: Vec<SearchAttempt>) -> Self {
        let count = attempts.len();
        let success_count = attempts.iter().filter(|a| a.is_success()).count();
        let error_count = count - success_count;
        let latency = LatencyStats::from_samples(&successful_latencies(&attempts));

        let (improvement_secs, improvement_percent) =
            improvement(prompt.baseline_secs, latency.mean_ms);

        Self {
            prompt,
            attempts,
            count,
            success_count,
            error_count,
            latency,
            improvement_secs,
            improvement_percent,
        }
    }

    /// Success rate in [0, 1]
    pub fn success_rate(&self) -> f64 {
        ratio(self.success_count, self.count)
    }
}

/// Aggregated result of one experiment runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    /// Experiment name (e.g. "search", "agent")
    pub name: String,
    /// Name of the client that served the calls
    pub client: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Configuration the run used
    pub config: ExperimentConfig,
    /// Per-prompt results, in prompt order
    pub prompts: Vec<PromptResult>,
    /// Total attempts across all prompts
    pub total_attempts: usize,
    /// Successful attempts across all prompts
    pub total_successes: usize,
    /// Failed attempts across all prompts
    pub total_errors: usize,
    /// Success rate in [0, 1]
    pub success_rate: f64,
    /// Latency statistics over all successful attempts of all prompts
    pub latency: LatencyStats,
    /// Wall time of the whole run, delays included
    pub total_elapsed_ms: f64,
}

impl ExperimentResult {
    /// Aggregate prompt results into an experiment result
    pub fn from_prompt_results(
        name: impl Into<String>,
        client: impl Into<String>,
        started_at: DateTime<Utc>,
        config: ExperimentConfig,
        prompts: Vec<PromptResult>,
        total_elapsed_ms: f64,
    ) -> Self {
        let total_attempts: usize = prompts.iter().map(|p| p.count).sum();
        let total_successes: usize = prompts.iter().map(|p| p.success_count).sum();
        let total_errors: usize = prompts.iter().map(|p| p.error_count).sum();

        let flattened: Vec<f64> = prompts
            .iter()
            .flat_map(|p| successful_latencies(&p.attempts))
            .collect();

        Self {
            name: name.into(),
            client: client.into(),
            started_at,
            config,
            prompts,
            total_attempts,
            total_successes,
            total_errors,
            success_rate: ratio(total_successes, total_attempts),
            latency: LatencyStats::from_samples(&flattened),
            total_elapsed_ms,
        }
    }

    /// Iterate every raw attempt across prompts
    pub fn attempts(&self) -> impl Iterator<Item = &SearchAttempt> {
        self.prompts.iter().flat_map(|p| p.attempts.iter())
    }

    /// Recompute every derived statistic from the raw attempts
    ///
    /// Used after loading a report so merged or edited attempt sets are
    /// re-aggregated the same way a live run is.
    pub fn reaggregate(&self) -> Self {
        let prompts = self
            .prompts
            .iter()
            .map(|p| PromptResult::from_attempts(p.prompt.clone(), p.attempts.clone()))
            .collect();
        Self::from_prompt_results(
            self.name.clone(),
            self.client.clone(),
            self.started_at,
            self.config.clone(),
            prompts,
            self.total_elapsed_ms,
        )
    }
}

/// Results of several experiments, keyed by experiment name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveResult {
    /// When the combined result was produced
    pub generated_at: DateTime<Utc>,
    /// Experiment name -> result
    pub experiments: BTreeMap<String, ExperimentResult>,
}

impl ComprehensiveResult {
    /// Create an empty combined result stamped now
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            experiments: BTreeMap::new(),
        }
    }

    /// Add an experiment result, replacing any earlier one with the same name
    pub fn insert(&mut self, result: ExperimentResult) {
        self.experiments.insert(result.name.clone(), result);
    }

    /// Get the number of experiments
    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    /// Check if no experiment succeeded
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }
}

impl Default for ComprehensiveResult {
    fn default() -> Self {
        Self::new()
    }
}

fn successful_latencies(attempts: &[SearchAttempt]) -> Vec<f64> {
    attempts
        .iter()
        .filter(|a| a.is_success())
        .map(|a| a.latency_ms)
        .collect()
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

fn improvement(baseline_secs: Option<f64>, mean_ms: Option<f64>) -> (Option<f64>, Option<f64>) {
    match (baseline_secs, mean_ms) {
        (Some(baseline), Some(mean_ms)) => {
            let delta = baseline - mean_ms / 1000.0;
            let percent = if baseline > 0.0 {
                Some(delta / baseline * 100.0)
            } else {
                None
            };
            (Some(delta), percent)
        }
        _ => (None, None),
    }
}

//! Experiment runner
//!
//! The runner drives one experiment variant end to end:
//! - the `QueryExecutor` issues N sequential attempts per prompt with fixed
//!   pacing between attempts and between prompts
//! - attempts are aggregated into prompt and experiment results
//! - every step is reported through the injected `RunObserver`

mod observer;

pub use observer::{MemoryObserver, RunObserver, TracingObserver};

use crate::config::ExperimentConfig;
use crate::error::{BenchError, BenchResult, SearchError};
use crate::metrics::{ExperimentResult, PromptResult, SearchAttempt};
use crate::prompts::{Prompt, PromptSet};
use crate::providers::SearchClient;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Maximum characters of response content kept on an attempt
pub const RESPONSE_PREVIEW_CHARS: usize = 200;

/// Anything the orchestrator can run as one experiment
#[async_trait]
pub trait Experiment: Send + Sync {
    /// Experiment name
    fn name(&self) -> &str;

    /// Run every prompt and return the aggregated result
    async fn run(&self) -> BenchResult<ExperimentResult>;
}

/// Issues timed, paced search attempts
pub struct QueryExecutor<C: SearchClient> {
    client: C,
    config: ExperimentConfig,
    observer: Arc<dyn RunObserver>,
}

impl<C: SearchClient> QueryExecutor<C> {
    /// Create a new executor
    pub fn new(client: C, config: ExperimentConfig, observer: Arc<dyn RunObserver>) -> Self {
        Self {
            client,
            config,
            observer,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Get the client name
    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    /// Run the client's one-time setup, outside any timed attempt
    pub async fn warmup(&self) -> Result<(), SearchError> {
        self.client.warmup().await
    }

    /// Issue one attempt and classify it
    ///
    /// Never fails: client errors and empty responses become `error` attempts.
    pub async fn execute_attempt(&self, prompt: &Prompt, attempt_index: usize) -> SearchAttempt {
        let started_at = Utc::now();
        let start = Instant::now();
        let result = self.client.search(&prompt.text).await;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(response) if !response.is_empty() => {
                SearchAttempt::success(prompt.index, attempt_index, started_at, latency_ms)
                    .with_response(response.bytes, response.preview(RESPONSE_PREVIEW_CHARS))
                    .with_limitations(response.limitations)
            }
            Ok(_) => SearchAttempt::failure(
                prompt.index,
                attempt_index,
                started_at,
                latency_ms,
                "empty response",
            ),
            Err(e) => SearchAttempt::failure(
                prompt.index,
                attempt_index,
                started_at,
                latency_ms,
                e.to_string(),
            ),
        }
    }

    /// Issue `searches_per_prompt` attempts for one prompt, pausing
    /// `request_delay` between consecutive attempts
    pub async fn execute_prompt(&self, experiment: &str, prompt: &Prompt) -> Vec<SearchAttempt> {
        let count = self.config.searches_per_prompt;
        let mut attempts = Vec::with_capacity(count);

        for attempt_index in 1..=count {
            let attempt = self.execute_attempt(prompt, attempt_index).await;
            self.observer.record_attempt(experiment, prompt, &attempt);
            attempts.push(attempt);

            if attempt_index < count {
                pause(self.config.request_delay).await;
            }
        }

        attempts
    }

    /// Run every prompt in order, pausing `prompt_delay` after the last
    /// attempt of a prompt before the next prompt starts
    pub async fn execute_prompts(
        &self,
        experiment: &str,
        prompts: &PromptSet,
    ) -> Vec<(Prompt, Vec<SearchAttempt>)> {
        let mut results = Vec::with_capacity(prompts.len());

        for (idx, prompt) in prompts.iter().enumerate() {
            tracing::debug!(
                experiment,
                prompt = prompt.index,
                total = prompts.len(),
                query = %prompt.preview(100),
                "Processing prompt"
            );
            let attempts = self.execute_prompt(experiment, prompt).await;
            results.push((prompt.clone(), attempts));

            if idx + 1 < prompts.len() {
                pause(self.config.prompt_delay).await;
            }
        }

        results
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        sleep(delay).await;
    }
}

/// Runner for one experiment variant
pub struct ExperimentRunner<C: SearchClient> {
    name: String,
    executor: QueryExecutor<C>,
    prompts: PromptSet,
    observer: Arc<dyn RunObserver>,
}

impl<C: SearchClient> ExperimentRunner<C> {
    /// Create a new runner
    ///
    /// Fails with a configuration error if the config is invalid or the
    /// prompt set is empty.
    pub fn new(
        name: impl Into<String>,
        client: C,
        prompts: PromptSet,
        config: ExperimentConfig,
        observer: Arc<dyn RunObserver>,
    ) -> BenchResult<Self> {
        config.validate()?;
        if prompts.is_empty() {
            return Err(BenchError::prompt("prompt set is empty"));
        }

        Ok(Self {
            name: name.into(),
            executor: QueryExecutor::new(client, config, Arc::clone(&observer)),
            prompts,
            observer,
        })
    }

    /// Get the prompt set
    pub fn prompts(&self) -> &PromptSet {
        &self.prompts
    }

    /// Run the experiment sequentially
    pub async fn run_sequential(&self) -> ExperimentResult {
        let config = self.executor.config().clone();
        let total = self.prompts.len() * config.searches_per_prompt;
        self.observer.run_started(&self.name, total);

        let started_at = Utc::now();
        let start = Instant::now();

        let mut prompt_results = Vec::with_capacity(self.prompts.len());
        for (prompt, attempts) in self.executor.execute_prompts(&self.name, &self.prompts).await {
            let result = PromptResult::from_attempts(prompt, attempts);
            self.observer.record_prompt(&self.name, &result);
            prompt_results.push(result);
        }

        let result = ExperimentResult::from_prompt_results(
            self.name.clone(),
            self.executor.client_name(),
            started_at,
            config,
            prompt_results,
            start.elapsed().as_secs_f64() * 1000.0,
        );
        self.observer.record_summary(&result);
        result
    }
}

#[async_trait]
impl<C: SearchClient> Experiment for ExperimentRunner<C> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> BenchResult<ExperimentResult> {
        self.executor.warmup().await.map_err(|e| {
            tracing::error!(experiment = %self.name, error = %e, "Client setup failed");
            BenchError::runner(&self.name, e.to_string())
        })?;
        Ok(self.run_sequential().await)
    }
}

//! Master orchestrator
//!
//! Runs a fixed, ordered list of experiments one after another. A runner that
//! fails entirely is logged and skipped; the results of every other runner
//! are merged into a [`ComprehensiveResult`].

use crate::error::{panic_message, BenchError, BenchResult};
use crate::metrics::ComprehensiveResult;
use crate::runner::Experiment;
use async_trait::async_trait;
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;


/// Lifecycle of one runner inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerState {
    /// Not run yet
    NotStarted,
    /// Currently running
    Running,
    /// Finished with a result
    Completed,
    /// Failed entirely
    Failed(String),
}

impl RunnerState {
    /// Check if the runner reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunnerState::Completed | RunnerState::Failed(_))
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerState::NotStarted => write!(f, "not started"),
            RunnerState::Running => write!(f, "running"),
            RunnerState::Completed => write!(f, "completed"),
            RunnerState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Result of an orchestrated batch
#[derive(Debug)]
pub struct BatchOutcome {
    /// Results of every runner that completed
    pub comprehensive: ComprehensiveResult,
    /// Final state of every runner, in run order
    pub statuses: Vec<(String, RunnerState)>,
}

impl BatchOutcome {
    /// Runners that failed, with their reasons
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.statuses
            .iter()
            .filter_map(|(name, state)| match state {
                RunnerState::Failed(reason) => Some((name.as_str(), reason.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Check if every runner completed
    pub fn all_completed(&self) -> bool {
        self.statuses
            .iter()
            .all(|(_, state)| *state == RunnerState::Completed)
    }
}

type ExperimentBuilder = Box<dyn Fn() -> BenchResult<Box<dyn Experiment>> + Send + Sync>;

/// Experiment whose runner is built only when it is run
///
/// Construction errors (missing credentials, invalid config) then surface as a
/// failure of that runner instead of aborting the whole batch.
pub struct DeferredExperiment {
    name: String,
    build: ExperimentBuilder,
}

impl DeferredExperiment {
    /// Create a deferred experiment from a builder
    pub fn new<F>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn() -> BenchResult<Box<dyn Experiment>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            build: Box::new(build),
        }
    }
}

#[async_trait]
impl Experiment for DeferredExperiment {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> BenchResult<crate::metrics::ExperimentResult> {
        let experiment = (self.build)()?;
        experiment.run().await
    }
}

/// Sequential multi-experiment orchestrator
#[derive(Default)]
pub struct Orchestrator {
    experiments: Vec<Box<dyn Experiment>>,
}

impl Orchestrator {
    /// Create an empty orchestrator
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an experiment to the run order
    pub fn with_experiment(mut self, experiment: impl Experiment + 'static) -> Self {
        self.push(Box::new(experiment));
        self
    }

    /// Append a boxed experiment to the run order
    pub fn push(&mut self, experiment: Box<dyn Experiment>) {
        self.experiments.push(experiment);
    }

    /// Experiment names, in run order
    pub fn names(&self) -> Vec<&str> {
        self.experiments.iter().map(|e| e.name()).collect()
    }

    /// Get the number of experiments
    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    /// Check if no experiment is registered
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    /// Run every experiment in order, continuing past failures
    pub async fn run_all(&self) -> BatchOutcome {
        let mut statuses: Vec<(String, RunnerState)> = self
            .experiments
            .iter()
            .map(|e| (e.name().to_string(), RunnerState::NotStarted))
            .collect();
        let mut comprehensive = ComprehensiveResult::new();

        for (idx, experiment) in self.experiments.iter().enumerate() {
            let name = experiment.name().to_string();
            statuses[idx].1 = RunnerState::Running;
            tracing::info!(
                experiment = %name,
                position = idx + 1,
                total = self.experiments.len(),
                "Running experiment"
            );

            let state = match AssertUnwindSafe(experiment.run()).catch_unwind().await {
                Ok(Ok(result)) => {
                    comprehensive.insert(result);
                    RunnerState::Completed
                }
                Ok(Err(e)) => {
                    let reason = match e {
                        BenchError::Runner { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    tracing::error!(experiment = %name, error = %reason, "Experiment failed");
                    RunnerState::Failed(reason)
                }
                Err(payload) => {
                    let reason = format!("panicked: {}", panic_message(&*payload));
                    tracing::error!(experiment = %name, error = %reason, "Experiment panicked");
                    RunnerState::Failed(reason)
                }
            };
            statuses[idx].1 = state;
        }

        let failed = statuses
            .iter()
            .filter(|(_, s)| matches!(s, RunnerState::Failed(_)))
            .count();
        tracing::info!(
            completed = comprehensive.len(),
            failed,
            "All experiments finished"
        );

        BatchOutcome {
            comprehensive,
            statuses,
        }
    }
}

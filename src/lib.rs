//! Search Latency Bench - latency harness for hosted search APIs
//!
//! Measures the round-trip latency of a standard web-search API, a fan-out
//! variant of it and a hosted agent answering with a web-grounding tool, over
//! a small fixed set of prompts.
//!
//! # Architecture
//!
//! - **Prompts**: ordered prompt sets from files or the built-in set
//! - **Providers**: HTTP clients for each search approach
//! - **Runner**: sequential, paced execution of attempts per prompt
//! - **Metrics**: attempt records and statistical aggregation
//! - **Orchestrator**: runs several experiments and merges their results
//! - **Output / Visualization**: JSON, CSV, text logs and charts
//!
//! # Example
//!
//! ```rust,no_run
//! use search_latency_bench::config::{ExperimentConfig, SearchCredentials};
//! use search_latency_bench::prompts::PromptSet;
//! use search_latency_bench::providers::WebSearchClient;
//! use search_latency_bench::runner::{Experiment, ExperimentRunner, TracingObserver};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = WebSearchClient::new(SearchCredentials::from_env()?, None)?;
//!     let runner = ExperimentRunner::new(
//!         "search",
//!         client,
//!         PromptSet::builtin(),
//!         ExperimentConfig::default(),
//!         Arc::new(TracingObserver::new()),
//!     )?;
//!
//!     let result = runner.run().await?;
//!     println!("mean latency: {:?} ms", result.latency.mean_ms);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod output;
pub mod prompts;
pub mod providers;
pub mod runner;
pub mod visualization;

// Re-export commonly used types
pub use config::ExperimentConfig;
pub use error::{BenchError, BenchResult, ConfigError, SearchError};
pub use metrics::{
    ComprehensiveResult, ExperimentResult, PromptResult, SearchAttempt, SearchLimitation,
};
pub use orchestrator::{Orchestrator, RunnerState};
pub use output::{CsvExporter, JsonExporter, ReportEmitter};
pub use prompts::{Prompt, PromptSet};
pub use providers::SearchClient;
pub use runner::{Experiment, ExperimentRunner, QueryExecutor};

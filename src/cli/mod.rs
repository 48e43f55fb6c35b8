//! CLI argument parsing and command handling

use crate::config::{AgentCredentials, ExperimentConfig, SearchCredentials};
use crate::error::{BenchError, BenchResult};
use crate::metrics::{format_ms, ComprehensiveResult, ExperimentResult};
use crate::orchestrator::{DeferredExperiment, Orchestrator};
use crate::output::{JsonExporter, ReportEmitter, ReportOutcome};
use crate::prompts::PromptSet;
use crate::providers::{AgentClient, ConcurrentSearchClient, WebSearchClient};
use crate::runner::{Experiment, ExperimentRunner, RunObserver, TracingObserver};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Search latency bench - round-trip latency of hosted search and agent APIs
#[derive(Parser, Debug)]
#[command(name = "search-latency-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one experiment variant
    Run {
        /// Variant to run
        #[arg(value_enum, default_value_t = Variant::Search)]
        variant: Variant,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Run every variant in sequence and write a combined report
    All {
        #[command(flatten)]
        options: RunOptions,
    },

    /// List the available prompt sets
    Prompts {
        /// Directory of markdown prompt files
        #[arg(long, default_value = "prompts")]
        dir: PathBuf,
    },

    /// Re-emit CSV, text and chart reports from a saved JSON report
    Report {
        /// JSON report written by an earlier run
        #[arg(long)]
        input: PathBuf,

        /// Output directory for the regenerated reports
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Skip chart rendering
        #[arg(long)]
        no_charts: bool,
    },
}

/// Experiment variant
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variant {
    /// Standard web search
    Search,
    /// Web search fanned out across verticals
    Concurrent,
    /// Hosted agent with web grounding
    Agent,
}

impl Variant {
    /// Every variant, in orchestrator order
    pub const ALL: [Variant; 3] = [Variant::Search, Variant::Concurrent, Variant::Agent];

    /// Experiment name used in results and filenames
    pub fn name(&self) -> &'static str {
        match self {
            Variant::Search => "search",
            Variant::Concurrent => "concurrent",
            Variant::Agent => "agent",
        }
    }
}

/// Options shared by `run` and `all`
#[derive(Args, Debug, Clone)]
pub struct RunOptions {
    /// Number of sequential searches per prompt
    #[arg(short = 'n', long, env = "SEARCHES_PER_PROMPT", default_value = "5")]
    pub searches: usize,

    /// Delay between attempts of the same prompt (ms)
    #[arg(long, default_value = "1000")]
    pub request_delay_ms: u64,

    /// Delay between prompts (ms)
    #[arg(long, default_value = "2000")]
    pub prompt_delay_ms: u64,

    /// HTTP request timeout (seconds); the agent run as a whole is bounded too
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Prompt file (.txt, .md or .csv); the built-in set is used otherwise
    #[arg(short, long)]
    pub prompt_file: Option<PathBuf>,

    /// Send the whole prompt file as a single prompt
    #[arg(long, requires = "prompt_file")]
    pub whole_file: bool,

    /// Output directory for results
    #[arg(short, long, default_value = "results")]
    pub output_dir: PathBuf,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            searches: crate::config::DEFAULT_SEARCHES_PER_PROMPT,
            request_delay_ms: 1000,
            prompt_delay_ms: 2000,
            timeout_secs: None,
            prompt_file: None,
            whole_file: false,
            output_dir: PathBuf::from("results"),
            no_charts: false,
        }
    }
}

impl RunOptions {
    /// Build and validate the experiment configuration
    pub fn experiment_config(&self) -> BenchResult<ExperimentConfig> {
        let mut config = ExperimentConfig::new(self.searches)
            .with_request_delay(Duration::from_millis(self.request_delay_ms))
            .with_prompt_delay(Duration::from_millis(self.prompt_delay_ms));
        if let Some(secs) = self.timeout_secs {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }
        config.validate()?;
        Ok(config)
    }

    /// Load the prompt set
    pub fn prompt_set(&self) -> Result<PromptSet> {
        match &self.prompt_file {
            Some(path) if self.whole_file => PromptSet::from_whole_file(path),
            Some(path) => PromptSet::from_file(path),
            None => Ok(PromptSet::builtin()),
        }
    }

    fn emitter(&self) -> ReportEmitter {
        ReportEmitter::new(&self.output_dir).with_charts(!self.no_charts)
    }
}

/// Build the runner for one variant, loading its credentials from the environment
pub fn build_experiment(
    variant: Variant,
    prompts: PromptSet,
    config: ExperimentConfig,
    observer: Arc<dyn RunObserver>,
) -> BenchResult<Box<dyn Experiment>> {
    let name = variant.name();
    let timeout = config.request_timeout;
    let client_error = |e: crate::error::SearchError| BenchError::runner(name, e.to_string());

    let experiment: Box<dyn Experiment> = match variant {
        Variant::Search => {
            let client =
                WebSearchClient::new(SearchCredentials::from_env()?, timeout).map_err(client_error)?;
            Box::new(ExperimentRunner::new(name, client, prompts, config, observer)?)
        }
        Variant::Concurrent => {
            let inner =
                WebSearchClient::new(SearchCredentials::from_env()?, timeout).map_err(client_error)?;
            let client = ConcurrentSearchClient::new(inner);
            Box::new(ExperimentRunner::new(name, client, prompts, config, observer)?)
        }
        Variant::Agent => {
            let client =
                AgentClient::new(AgentCredentials::from_env()?, timeout).map_err(client_error)?;
            Box::new(ExperimentRunner::new(name, client, prompts, config, observer)?)
        }
    };
    Ok(experiment)
}

impl Cli {
    /// Run the selected command; `run search` with defaults when none is given
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            None => run_single(Variant::Search, &RunOptions::default()).await,
            Some(Command::Run { variant, options }) => run_single(*variant, options).await,
            Some(Command::All { options }) => run_all(options).await,
            Some(Command::Prompts { dir }) => list_prompts(dir),
            Some(Command::Report {
                input,
                output_dir,
                no_charts,
            }) => regenerate_report(input, output_dir, *no_charts),
        }
    }
}

async fn run_single(variant: Variant, options: &RunOptions) -> Result<()> {
    let config = options.experiment_config()?;
    let prompts = options.prompt_set().context("Failed to load prompts")?;
    print_banner(variant.name(), &prompts, &config);

    let observer: Arc<dyn RunObserver> = Arc::new(TracingObserver::with_progress());
    let experiment = build_experiment(variant, prompts, config, observer)
        .with_context(|| format!("Failed to start the {} experiment", variant.name()))?;

    let result = experiment.run().await?;
    print_summary(&result);

    let outcome = options.emitter().emit(&result);
    print_outcome(&outcome);
    Ok(())
}

async fn run_all(options: &RunOptions) -> Result<()> {
    let config = options.experiment_config()?;
    let prompts = options.prompt_set().context("Failed to load prompts")?;
    print_banner("all", &prompts, &config);

    let observer: Arc<dyn RunObserver> = Arc::new(TracingObserver::with_progress());
    let mut orchestrator = Orchestrator::new();
    for variant in Variant::ALL {
        let prompts = prompts.clone();
        let config = config.clone();
        let observer = Arc::clone(&observer);
        orchestrator.push(Box::new(DeferredExperiment::new(variant.name(), move || {
            build_experiment(variant, prompts.clone(), config.clone(), Arc::clone(&observer))
        })));
    }

    let batch = orchestrator.run_all().await;

    println!("{}", "=".repeat(70));
    println!("   Runner Status");
    println!("{}", "=".repeat(70));
    for (name, state) in &batch.statuses {
        println!("  {:<12} {}", name, state);
    }
    println!();

    for result in batch.comprehensive.experiments.values() {
        print_summary(result);
    }
    print_comparison(&batch.comprehensive);

    if batch.comprehensive.is_empty() {
        anyhow::bail!("every experiment failed; no report written");
    }

    let outcome = options.emitter().emit_comprehensive(&batch.comprehensive);
    print_outcome(&outcome);
    Ok(())
}

fn list_prompts(dir: &Path) -> Result<()> {
    let mut sets = vec![PromptSet::builtin()];
    if dir.is_dir() {
        sets.extend(
            PromptSet::discover(dir)
                .with_context(|| format!("Failed to read prompt directory: {}", dir.display()))?,
        );
    } else {
        tracing::info!(dir = %dir.display(), "Prompt directory not found, listing built-in set only");
    }

    for set in &sets {
        println!("{} ({} prompts)", set.name, set.len());
        for prompt in set.iter() {
            match &prompt.category {
                Some(category) => {
                    println!("  {:>2}. [{}] {}", prompt.index, category, prompt.preview(100))
                }
                None => println!("  {:>2}. {}", prompt.index, prompt.preview(100)),
            }
        }
        println!();
    }
    Ok(())
}

fn regenerate_report(input: &Path, output_dir: &Path, no_charts: bool) -> Result<()> {
    let emitter = ReportEmitter::new(output_dir).with_charts(!no_charts);

    let outcome = match JsonExporter::load(input) {
        Ok(result) => {
            let result = result.reaggregate();
            print_summary(&result);
            emitter.emit(&result)
        }
        Err(single_err) => {
            let mut combined = JsonExporter::load_comprehensive(input).with_context(|| {
                format!(
                    "{} is neither an experiment nor a combined report ({single_err:#})",
                    input.display()
                )
            })?;
            for result in combined.experiments.values_mut() {
                *result = result.reaggregate();
                print_summary(result);
            }
            print_comparison(&combined);
            emitter.emit_comprehensive(&combined)
        }
    };

    print_outcome(&outcome);
    Ok(())
}

fn print_banner(experiment: &str, prompts: &PromptSet, config: &ExperimentConfig) {
    println!("\n{}", "=".repeat(70));
    println!("   Search Latency Bench");
    println!("{}", "=".repeat(70));
    println!();
    println!("Configuration:");
    println!("  Experiment:      {}", experiment);
    println!("  Prompt set:      {} ({} prompts)", prompts.name, prompts.len());
    println!("  Searches/prompt: {}", config.searches_per_prompt);
    println!("  Request delay:   {:?}", config.request_delay);
    println!("  Prompt delay:    {:?}", config.prompt_delay);
    match config.request_timeout {
        Some(timeout) => println!("  Timeout:         {:?}", timeout),
        None => println!("  Timeout:         client default"),
    }
    println!("{}", "=".repeat(70));
    println!();
}

/// Print one experiment summary; errors and success rate are always shown
fn print_summary(result: &ExperimentResult) {
    println!("{}", "=".repeat(70));
    println!("   Results: {} ({})", result.name, result.client);
    println!("{}", "=".repeat(70));
    println!();

    for p in &result.prompts {
        println!("Prompt {}: {}", p.prompt.index, p.prompt.preview(60));
        println!(
            "  ok {}/{}  errors {}  mean {}  min {}  max {}  stddev {}",
            p.success_count,
            p.count,
            p.error_count,
            format_ms(p.latency.mean_ms),
            format_ms(p.latency.min_ms),
            format_ms(p.latency.max_ms),
            format_ms(p.latency.stddev_ms)
        );
        if let (Some(baseline), Some(delta), Some(percent)) = (
            p.prompt.baseline_secs,
            p.improvement_secs,
            p.improvement_percent,
        ) {
            println!(
                "  baseline {:.2} s  improvement {:.2} s ({:.1}%)",
                baseline, delta, percent
            );
        }
    }
    println!();

    println!("Overall:");
    println!("  Total attempts:   {}", result.total_attempts);
    println!(
        "  Successful:       {} ({:.1}%)",
        result.total_successes,
        result.success_rate * 100.0
    );
    println!("  Errors:           {}", result.total_errors);
    println!("  Mean latency:     {}", format_ms(result.latency.mean_ms));
    println!("  Min latency:      {}", format_ms(result.latency.min_ms));
    println!("  Max latency:      {}", format_ms(result.latency.max_ms));
    println!("  Std deviation:    {}", format_ms(result.latency.stddev_ms));
    println!("  Wall time:        {:.1} s", result.total_elapsed_ms / 1000.0);
    println!();
}

fn print_comparison(combined: &ComprehensiveResult) {
    if combined.len() < 2 {
        return;
    }

    println!("{}", "=".repeat(70));
    println!("   Comparison");
    println!("{}", "=".repeat(70));
    println!(
        "  {:<12} {:>14} {:>10} {:>8}",
        "experiment", "mean", "success", "errors"
    );
    for (name, result) in &combined.experiments {
        println!(
            "  {:<12} {:>14} {:>9.1}% {:>8}",
            name,
            format_ms(result.latency.mean_ms),
            result.success_rate * 100.0,
            result.total_errors
        );
    }
    println!();
}

fn print_outcome(outcome: &ReportOutcome) {
    for path in &outcome.written {
        println!("✓ {}", path.display());
    }
    for step in &outcome.skipped {
        println!("- skipped {}", step);
    }
    for (step, error) in &outcome.failures {
        println!("✗ {}: {}", step, error);
    }
}

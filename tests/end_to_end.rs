use async_trait::async_trait;
use search_latency_bench::config::ExperimentConfig;
use search_latency_bench::error::{BenchError, BenchResult, SearchError};
use search_latency_bench::metrics::ExperimentResult;
use search_latency_bench::orchestrator::{Orchestrator, RunnerState};
use search_latency_bench::output::{JsonExporter, ReportEmitter};
use search_latency_bench::prompts::PromptSet;
use search_latency_bench::providers::{SearchClient, SearchResponse};
use search_latency_bench::runner::{Experiment, ExperimentRunner, MemoryObserver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Fails every third call, answers with the query otherwise
struct FlakyClient {
    calls: AtomicUsize,
}

impl FlakyClient {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SearchClient for FlakyClient {
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n % 3 == 0 {
            Err(SearchError::status(429, "Too Many Requests"))
        } else {
            Ok(SearchResponse::new(format!("results for {query}"), 200))
        }
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

struct Unavailable;

#[async_trait]
impl Experiment for Unavailable {
    fn name(&self) -> &str {
        "agent"
    }

    async fn run(&self) -> BenchResult<ExperimentResult> {
        Err(BenchError::runner("agent", "missing environment variable AGENT_API_TOKEN"))
    }
}

fn runner(name: &str, observer: Arc<MemoryObserver>) -> ExperimentRunner<FlakyClient> {
    ExperimentRunner::new(
        name,
        FlakyClient::new(),
        PromptSet::builtin(),
        ExperimentConfig::immediate(3),
        observer,
    )
    .unwrap()
}

#[tokio::test]
async fn test_batch_report_round_trip() {
    let observer = Arc::new(MemoryObserver::new());
    let orchestrator = Orchestrator::new()
        .with_experiment(runner("search", observer.clone()))
        .with_experiment(Unavailable)
        .with_experiment(runner("concurrent", observer.clone()));

    let batch = orchestrator.run_all().await;

    assert_eq!(batch.statuses.len(), 3);
    assert_eq!(batch.statuses[0].1, RunnerState::Completed);
    assert!(matches!(batch.statuses[1].1, RunnerState::Failed(ref r) if r.contains("AGENT_API_TOKEN")));
    assert_eq!(batch.statuses[2].1, RunnerState::Completed);
    assert_eq!(batch.comprehensive.len(), 2);

    // 4 built-in prompts x 3 attempts, every third attempt fails
    let search = &batch.comprehensive.experiments["search"];
    assert_eq!(search.total_attempts, 12);
    assert_eq!(search.total_errors, 4);
    assert_eq!(search.success_rate, 8.0 / 12.0);
    assert!(search
        .prompts
        .iter()
        .all(|p| p.count == 3 && p.error_count == 1));
    assert_eq!(observer.attempts().len(), 24);
    assert_eq!(observer.summaries().len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let emitter = ReportEmitter::new(dir.path());
    let outcome = emitter.emit_comprehensive(&batch.comprehensive);
    assert!(outcome.is_complete(), "{:?}", outcome.failures);
    for (kind, name) in [("latency", "search"), ("histogram", "concurrent"), ("comparison", "all")] {
        assert!(emitter.artifact_path(kind, name, "png").exists(), "{kind} chart for {name}");
    }

    let combined = JsonExporter::load_comprehensive(&emitter.artifact_path("results", "all", "json"))
        .unwrap();
    assert_eq!(combined, batch.comprehensive);

    let single = JsonExporter::load(&emitter.artifact_path("results", "search", "json")).unwrap();
    assert_eq!(&single, search);
    assert_eq!(single.reaggregate(), single);
    assert_eq!(single.attempts().count(), 12);
}

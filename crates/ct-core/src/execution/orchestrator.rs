//! Sequential execution of admitted test cases

use super::{related, ItemStatus, Run, RunEvent};
use crate::aggregator::{RunSummary, TestResult};
use crate::api::{ClaimStatusSource, ClaimSubmitter, ResourceRegistry, ResultStore};
use crate::classifier::{Classifier, Evaluation, UNKNOWN_CLAIM_ID};
use crate::corpus::TestCase;
use crate::resolver::OutcomeResolver;
use crate::{CoreError, CoreResult, HarnessConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Callback receiving run progress
pub type ProgressSink = Arc<dyn Fn(&RunEvent) + Send + Sync>;

/// Drives test cases one at a time against the submission API.
///
/// Items never run in parallel, which keeps load on the service bounded and
/// result order equal to admission order.
pub struct Orchestrator {
    submitter: Option<Arc<dyn ClaimSubmitter>>,
    classifier: Classifier,
    registry: Option<Arc<dyn ResourceRegistry>>,
    pacing: Duration,
    progress: Option<ProgressSink>,
}

impl Orchestrator {
    pub fn builder(status_source: Arc<dyn ClaimStatusSource>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(status_source)
    }

    pub fn resolver(&self) -> &OutcomeResolver {
        self.classifier.resolver()
    }

    fn submitter(&self) -> CoreResult<&Arc<dyn ClaimSubmitter>> {
        self.submitter
            .as_ref()
            .ok_or_else(|| CoreError::Precondition("no claim submitter configured".to_string()))
    }

    fn emit(&self, event: RunEvent) {
        if let Some(sink) = &self.progress {
            sink(&event);
        }
    }

    /// Execute every admitted item in order.
    ///
    /// Refused up front, without touching the run, when there is no submitter
    /// or nothing was admitted. Individual failures never stop the batch.
    pub async fn run_batch(&self, run: &mut Run) -> CoreResult<RunSummary> {
        let submitter = self.submitter()?.clone();
        if run.is_empty() {
            return Err(CoreError::Precondition("no test cases admitted".to_string()));
        }

        run.reset();
        let total = run.len();
        tracing::info!("Starting run {} with {} test cases", run.id, total);

        for index in 0..total {
            run.cursor = Some(index);
            run.items[index].advance(ItemStatus::Running);
            let case = run.items[index].test_case.clone();
            self.emit(RunEvent::ItemStarted {
                index,
                total,
                test_case_id: case.id.clone(),
            });

            let evaluation = self.execute(submitter.as_ref(), &case).await;
            let status = item_status(&evaluation);
            let verdict = evaluation.result.status;
            run.items[index].advance(status);
            run.results.push(evaluation.result);

            tracing::info!("[{}/{}] {} -> {} ({})", index + 1, total, case.id, verdict, status);
            self.emit(RunEvent::ItemFinished {
                index,
                total,
                test_case_id: case.id,
                status,
                verdict,
            });

            if index + 1 < total && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }

        run.cursor = None;
        let summary = run.summary();
        tracing::info!(
            "Run {} finished: {}/{} passed ({}%), {} pending",
            run.id,
            summary.passed,
            summary.total,
            summary.pass_rate,
            summary.pending
        );
        self.emit(RunEvent::BatchCompleted { summary });

        Ok(summary)
    }

    /// Execute a single admitted item.
    ///
    /// The cursor and the other items are left alone. Re-running an item
    /// re-admits it and replaces its previous result.
    pub async fn run_single(&self, run: &mut Run, test_case_id: &str) -> CoreResult<TestResult> {
        let submitter = self.submitter()?.clone();
        let index = run
            .position(test_case_id)
            .ok_or_else(|| CoreError::NotFound(format!("test case {}", test_case_id)))?;

        let item = &mut run.items[index];
        item.status = ItemStatus::Pending;
        item.advance(ItemStatus::Running);
        let case = item.test_case.clone();

        let evaluation = self.execute(submitter.as_ref(), &case).await;
        let status = item_status(&evaluation);
        run.items[index].advance(status);
        run.results.upsert(evaluation.result.clone());

        tracing::info!("{} -> {} ({})", case.id, evaluation.result.status, status);
        Ok(evaluation.result)
    }

    /// Re-resolve a recorded claim and update its result in place
    pub async fn refresh_result(&self, run: &mut Run, claim_id: &str) -> CoreResult<TestResult> {
        if claim_id == UNKNOWN_CLAIM_ID {
            return Err(CoreError::NotFound("cannot refresh a result without a claim id".to_string()));
        }

        let intent = run
            .results
            .find_by_claim(claim_id)
            .map(|r| r.test_polarity)
            .ok_or_else(|| CoreError::NotFound(format!("claim {}", claim_id)))?;

        let refreshed = self.resolver().refresh(claim_id, intent).await?;
        run.results.apply_refresh(claim_id, &refreshed);
        tracing::info!("Claim {} refreshed: {}", claim_id, refreshed.outcome);

        run.results
            .find_by_claim(claim_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("claim {}", claim_id)))
    }

    async fn execute(&self, submitter: &dyn ClaimSubmitter, case: &TestCase) -> Evaluation {
        if let Some(registry) = &self.registry {
            related::ensure_related(registry.as_ref(), &case.payload).await;
        }

        let started = Instant::now();
        let submission = submitter.submit_claim(&case.payload).await;
        self.classifier.evaluate(case, submission, started).await
    }
}

fn item_status(evaluation: &Evaluation) -> ItemStatus {
    if evaluation.clean {
        ItemStatus::Completed
    } else {
        ItemStatus::Failed
    }
}

/// Builder for [`Orchestrator`]
pub struct OrchestratorBuilder {
    status_source: Arc<dyn ClaimStatusSource>,
    submitter: Option<Arc<dyn ClaimSubmitter>>,
    store: Option<Arc<dyn ResultStore>>,
    registry: Option<Arc<dyn ResourceRegistry>>,
    user_id: Option<String>,
    resolve_delay: Duration,
    pacing: Duration,
    progress: Option<ProgressSink>,
}

impl OrchestratorBuilder {
    pub fn new(status_source: Arc<dyn ClaimStatusSource>) -> Self {
        let defaults = HarnessConfig::default();
        Self {
            status_source,
            submitter: None,
            store: None,
            registry: None,
            user_id: None,
            resolve_delay: defaults.resolve_delay(),
            pacing: defaults.pacing_delay(),
            progress: None,
        }
    }

    /// Take delays and caller identity from a harness configuration
    pub fn config(mut self, config: &HarnessConfig) -> Self {
        self.resolve_delay = config.resolve_delay();
        self.pacing = config.pacing_delay();
        self.user_id = config.user_id.clone();
        self
    }

    pub fn submitter(mut self, submitter: Arc<dyn ClaimSubmitter>) -> Self {
        self.submitter = Some(submitter);
        self
    }

    pub fn result_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn resource_registry(mut self, registry: Arc<dyn ResourceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn resolve_delay(mut self, delay: Duration) -> Self {
        self.resolve_delay = delay;
        self
    }

    pub fn pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing = delay;
        self
    }

    pub fn on_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn build(self) -> Orchestrator {
        let resolver = OutcomeResolver::new(self.status_source, self.resolve_delay);
        let mut classifier = Classifier::new(resolver).with_user(self.user_id);
        if let Some(store) = self.store {
            classifier = classifier.with_store(store);
        }

        Orchestrator {
            submitter: self.submitter,
            classifier,
            registry: self.registry,
            pacing: self.pacing,
            progress: self.progress,
        }
    }
}

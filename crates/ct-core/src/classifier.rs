//! Verdict classification and result building

use crate::aggregator::TestResult;
use crate::api::{ApiError, ResultRecord, ResultStore, SubmitEnvelope};
use crate::corpus::TestCase;
use crate::outcome::{classify, classify_rejected_submission, ClaimOutcome, Verdict};
use crate::resolver::{extract_outcome, OutcomeResolver};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Claim id recorded when the submission response names no claim
pub const UNKNOWN_CLAIM_ID: &str = "unknown";

/// Outcome recorded when the submission itself was refused
pub const SUBMISSION_ERROR_OUTCOME: &str = "Error";

/// Classified result plus whether every network step behind it succeeded
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub result: TestResult,
    /// False when submission or outcome resolution failed
    pub clean: bool,
}

/// Turns submission responses into classified results
#[derive(Clone)]
pub struct Classifier {
    resolver: OutcomeResolver,
    store: Option<Arc<dyn ResultStore>>,
    user_id: Option<String>,
}

impl Classifier {
    pub fn new(resolver: OutcomeResolver) -> Self {
        Self {
            resolver,
            store: None,
            user_id: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn resolver(&self) -> &OutcomeResolver {
        &self.resolver
    }

    /// Classify one submission and persist the result when the case has a
    /// stored identity.
    pub async fn evaluate(
        &self,
        case: &TestCase,
        submission: Result<SubmitEnvelope, ApiError>,
        started: Instant,
    ) -> Evaluation {
        let evaluation = match submission.and_then(accepted_envelope) {
            Ok(envelope) => self.accepted(case, &envelope, started).await,
            Err(err) => rejected(case, &err, started),
        };

        if let Some(testcase_id) = case.persisted_id {
            self.persist(testcase_id, &evaluation.result).await;
        }

        evaluation
    }

    async fn accepted(&self, case: &TestCase, envelope: &SubmitEnvelope, started: Instant) -> Evaluation {
        let intent = case.intent();
        let claim = find_claim(envelope.bundle());
        let claim_id = claim
            .and_then(|c| c.get("id"))
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_CLAIM_ID)
            .to_string();

        let mut clean = true;
        let mut outcome = claim.map(extract_outcome).unwrap_or_default();

        if claim_id == UNKNOWN_CLAIM_ID {
            tracing::warn!("Submission for {} returned no claim resource", case.id);
        } else {
            // Nothing reported inline means the first lookup is the initial
            // resolution; a Pending answer gets exactly one more lookup.
            if outcome.is_empty() {
                outcome = self.resolve_or_sentinel(&claim_id, &mut clean).await;
            }
            if outcome.is_pending() {
                outcome = self.resolve_or_sentinel(&claim_id, &mut clean).await;
            }
        }

        let status = classify(intent, true, &outcome);
        let message = envelope
            .data
            .message
            .clone()
            .unwrap_or_else(|| format!("Claim {} adjudicated: {}", claim_id, outcome));

        let details = json!({
            "status_code": envelope.data.status,
            "response": envelope.bundle(),
        });

        Evaluation {
            result: build_result(case, claim_id, status, outcome, message, details, started),
            clean,
        }
    }

    async fn resolve_or_sentinel(&self, claim_id: &str, clean: &mut bool) -> ClaimOutcome {
        match self.resolver.resolve_outcome(claim_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Could not resolve outcome for claim {}: {}", claim_id, e);
                *clean = false;
                ClaimOutcome::resolution_error()
            }
        }
    }

    async fn persist(&self, testcase_id: u64, result: &TestResult) {
        let Some(store) = &self.store else {
            return;
        };

        let record = ResultRecord {
            testcase_id,
            result_status: result.status.as_flag(),
            message: result.message.clone(),
            detail: result.details.to_string(),
            status_code: result
                .details
                .get("status_code")
                .and_then(Value::as_u64)
                .and_then(|code| u16::try_from(code).ok())
                .unwrap_or(0),
            claim_id: result.claim_id.clone(),
            user_id: self.user_id.clone(),
        };

        if let Err(e) = store.create_result(&record).await {
            tracing::warn!("Failed to persist result for test case {}: {}", testcase_id, e);
        }
    }
}

/// A response that arrived but reports failure is handled like a refusal.
fn accepted_envelope(envelope: SubmitEnvelope) -> Result<SubmitEnvelope, ApiError> {
    if envelope.succeeded() {
        return Ok(envelope);
    }

    let message = envelope
        .data
        .message
        .clone()
        .unwrap_or_else(|| "Submission was not accepted".to_string());
    Err(ApiError::Status {
        status: envelope.data.status,
        body: Some(json!({ "message": message })),
        message,
    })
}

fn rejected(case: &TestCase, err: &ApiError, started: Instant) -> Evaluation {
    let intent = case.intent();
    let status = classify_rejected_submission(intent);
    let message = err.describe();
    tracing::info!("Submission for {} refused ({}): {}", case.id, intent, message);

    let details = json!({
        "status_code": err.status_code(),
        "error": err.body().cloned().unwrap_or_else(|| json!(err.to_string())),
    });

    Evaluation {
        result: build_result(
            case,
            UNKNOWN_CLAIM_ID.to_string(),
            status,
            ClaimOutcome::new(SUBMISSION_ERROR_OUTCOME),
            message,
            details,
            started,
        ),
        clean: false,
    }
}

/// The claim resource inside a submission bundle
fn find_claim(bundle: &Value) -> Option<&Value> {
    bundle
        .get("entry")?
        .as_array()?
        .iter()
        .filter_map(|entry| entry.get("resource"))
        .find(|resource| resource.get("resourceType").and_then(Value::as_str) == Some("Claim"))
}

fn build_result(
    case: &TestCase,
    claim_id: String,
    status: Verdict,
    outcome: ClaimOutcome,
    message: String,
    details: Value,
    started: Instant,
) -> TestResult {
    TestResult {
        id: Uuid::new_v4(),
        test_case_id: case.id.clone(),
        claim_id,
        test_polarity: case.intent(),
        name: case.display_name().to_string(),
        status,
        outcome,
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        timestamp: Utc::now(),
        message,
        details,
    }
}

//! Outcome resolution for submitted claims

use crate::api::{ApiError, ClaimStatusSource};
use crate::corpus::TestIntent;
use crate::outcome::{classify, ClaimOutcome, Verdict};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const STATE_EXTENSION_SUFFIX: &str = "claim-state-extension";
const STATE_SYSTEM_SUFFIX: &str = "claim-state";

/// Re-derived outcome for an already recorded claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refreshed {
    pub outcome: ClaimOutcome,
    pub status: Verdict,
    pub message: String,
}

/// Looks up a claim's adjudication state.
///
/// Every fetch is preceded by a fixed delay so the service can settle an
/// in-flight decision. Failures propagate; retry policy belongs to callers.
#[derive(Clone)]
pub struct OutcomeResolver {
    source: Arc<dyn ClaimStatusSource>,
    delay: Duration,
}

impl OutcomeResolver {
    pub fn new(source: Arc<dyn ClaimStatusSource>, delay: Duration) -> Self {
        Self { source, delay }
    }

    pub async fn resolve_outcome(&self, claim_id: &str) -> Result<ClaimOutcome, ApiError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let claim = self.source.fetch_claim(claim_id).await?;
        let outcome = extract_outcome(&claim);
        tracing::debug!("Claim {} resolved to '{}'", claim_id, outcome);
        Ok(outcome)
    }

    /// Re-evaluate a recorded claim without resubmitting it
    pub async fn refresh(&self, claim_id: &str, intent: TestIntent) -> Result<Refreshed, ApiError> {
        let outcome = self.resolve_outcome(claim_id).await?;
        let status = classify(intent, true, &outcome);
        let message = format!("Refreshed: {}", outcome);

        Ok(Refreshed {
            outcome,
            status,
            message,
        })
    }
}

/// Read the claim-state display text from a claim resource.
///
/// Returns an empty outcome when the extension or coding is missing.
pub fn extract_outcome(claim: &Value) -> ClaimOutcome {
    let display = claim
        .get("extension")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|ext| {
            ext.get("url")
                .and_then(Value::as_str)
                .is_some_and(|url| url.ends_with(STATE_EXTENSION_SUFFIX))
        })
        .filter_map(|ext| ext.pointer("/valueCodeableConcept/coding").and_then(Value::as_array))
        .flatten()
        .find(|coding| {
            coding
                .get("system")
                .and_then(Value::as_str)
                .is_some_and(|system| system.ends_with(STATE_SYSTEM_SUFFIX))
        })
        .and_then(|coding| coding.get("display"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    ClaimOutcome::new(display)
}

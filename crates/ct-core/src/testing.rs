//! Scripted in-memory collaborator for unit tests

use crate::api::{
    ApiError, ClaimStatusSource, ClaimSubmitter, ResourceKind, ResourceRegistry, ResultRecord,
    ResultStore, SubmitEnvelope, SubmitPayload,
};
use crate::corpus::{Polarity, TestCase};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

pub fn claim_with_state(display: &str) -> Value {
    json!({
        "resourceType": "Claim",
        "extension": [{
            "url": "https://adjudicator.test/StructureDefinition/claim-state-extension",
            "valueCodeableConcept": {
                "coding": [{"system": "https://adjudicator.test/CodeSystem/claim-state", "display": display}]
            }
        }]
    })
}

/// Claim bundle as returned by a successful submission
pub fn bundle(claim_id: &str, state: Option<&str>) -> Value {
    let mut claim = match state {
        Some(display) => claim_with_state(display),
        None => json!({"resourceType": "Claim"}),
    };
    claim["id"] = json!(claim_id);

    json!({
        "resourceType": "Bundle",
        "entry": [
            {"resource": {"resourceType": "Patient", "id": "P1"}},
            {"resource": claim}
        ]
    })
}

pub fn accepted(claim_id: &str, state: Option<&str>) -> Result<SubmitEnvelope, ApiError> {
    Ok(SubmitEnvelope {
        success: true,
        data: SubmitPayload {
            success: true,
            status: 201,
            data: bundle(claim_id, state),
            message: None,
        },
    })
}

pub fn rejected(status: u16, body: Value) -> Result<SubmitEnvelope, ApiError> {
    Err(ApiError::Status {
        status,
        body: Some(body),
        message: "Unprocessable Entity".to_string(),
    })
}

pub fn test_case(id: &str, polarity: Polarity) -> TestCase {
    TestCase {
        id: id.to_string(),
        intervention_id: Some("IV-1".to_string()),
        polarity: Some(polarity),
        intent: None,
        title: format!("case {}", id),
        description: None,
        payload: json!({
            "case": id,
            "patient": {"id": format!("pat-{}", id)},
            "provider": {"id": "org-1"},
            "total": 120.5
        }),
        persisted_id: None,
    }
}

#[derive(Default)]
struct State {
    submissions: VecDeque<Result<SubmitEnvelope, ApiError>>,
    submitted: Vec<Value>,
    outcomes: HashMap<String, VecDeque<String>>,
    fetches: HashMap<String, usize>,
    records: Vec<ResultRecord>,
    fail_results: bool,
    resources: Vec<(ResourceKind, Value)>,
    failing_kinds: HashSet<ResourceKind>,
}

/// Collaborator that replays scripted answers and records every call
#[derive(Default)]
pub struct ScriptedApi {
    state: Mutex<State>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn push_submission(&self, response: Result<SubmitEnvelope, ApiError>) {
        self.state().submissions.push_back(response);
    }

    /// Successive fetches walk the list; the last entry repeats.
    pub fn set_outcomes(&self, claim_id: &str, outcomes: &[&str]) {
        self.state()
            .outcomes
            .insert(claim_id.to_string(), outcomes.iter().map(|s| s.to_string()).collect());
    }

    pub fn fail_results(&self) {
        self.state().fail_results = true;
    }

    pub fn fail_resource(&self, kind: ResourceKind) {
        self.state().failing_kinds.insert(kind);
    }

    pub fn submitted(&self) -> Vec<Value> {
        self.state().submitted.clone()
    }

    pub fn fetch_count(&self, claim_id: &str) -> usize {
        self.state().fetches.get(claim_id).copied().unwrap_or(0)
    }

    pub fn records(&self) -> Vec<ResultRecord> {
        self.state().records.clone()
    }

    pub fn resources(&self) -> Vec<(ResourceKind, Value)> {
        self.state().resources.clone()
    }
}

#[async_trait]
impl ClaimSubmitter for ScriptedApi {
    async fn submit_claim(&self, payload: &Value) -> Result<SubmitEnvelope, ApiError> {
        let mut state = self.state();
        state.submitted.push(payload.clone());
        state
            .submissions
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no scripted submission".to_string())))
    }
}

#[async_trait]
impl ClaimStatusSource for ScriptedApi {
    async fn fetch_claim(&self, claim_id: &str) -> Result<Value, ApiError> {
        let mut state = self.state();
        *state.fetches.entry(claim_id.to_string()).or_default() += 1;

        let Some(queue) = state.outcomes.get_mut(claim_id) else {
            return Err(ApiError::Status {
                status: 404,
                body: None,
                message: format!("claim {} not found", claim_id),
            });
        };
        let display = if queue.len() > 1 {
            queue.pop_front().unwrap_or_default()
        } else {
            queue.front().cloned().unwrap_or_default()
        };
        Ok(claim_with_state(&display))
    }
}

#[async_trait]
impl ResultStore for ScriptedApi {
    async fn create_result(&self, record: &ResultRecord) -> Result<(), ApiError> {
        let mut state = self.state();
        if state.fail_results {
            return Err(ApiError::Transport("result store unavailable".to_string()));
        }
        state.records.push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl ResourceRegistry for ScriptedApi {
    async fn ensure_resource(&self, kind: ResourceKind, resource: &Value) -> Result<(), ApiError> {
        let mut state = self.state();
        if state.failing_kinds.contains(&kind) {
            return Err(ApiError::Status {
                status: 500,
                body: None,
                message: format!("{} store down", kind),
            });
        }
        state.resources.push((kind, resource.clone()));
        Ok(())
    }
}

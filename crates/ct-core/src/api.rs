//! Collaborator seams: claim submission, claim status, result store and
//! related-resource registry, plus their wire types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Failure reported by an external collaborator
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        /// Structured error body, when the service sent one
        body: Option<Value>,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            ApiError::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Human readable description of a failed call.
    ///
    /// Tries, in order: a string body, `error.message`, `message`, `error`,
    /// the serialized body, the error's own message, then a generic fallback.
    pub fn describe(&self) -> String {
        if let Some(body) = self.body() {
            if let Some(text) = body.as_str() {
                return text.to_string();
            }
            if let Some(text) = body.pointer("/error/message").and_then(Value::as_str) {
                return text.to_string();
            }
            if let Some(text) = body.get("message").and_then(Value::as_str) {
                return text.to_string();
            }
            if let Some(text) = body.get("error").and_then(Value::as_str) {
                return text.to_string();
            }
            if !body.is_null() {
                return body.to_string();
            }
        }

        let own = match self {
            ApiError::Status { message, .. } => message.clone(),
            ApiError::Transport(message) | ApiError::Decode(message) => message.clone(),
        };
        if own.trim().is_empty() {
            "Unknown error occurred".to_string()
        } else {
            own
        }
    }
}

/// Response of `POST /claims/submit`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: SubmitPayload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitPayload {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub status: u16,
    /// Claim bundle returned by the adjudication service
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub message: Option<String>,
}

impl SubmitEnvelope {
    pub fn succeeded(&self) -> bool {
        self.success && self.data.success
    }

    pub fn bundle(&self) -> &Value {
        &self.data.data
    }
}

/// Body of `POST /results`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub testcase_id: u64,
    /// 1 = passed, 0 = failed
    pub result_status: u8,
    pub message: String,
    pub detail: String,
    pub status_code: u16,
    pub claim_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Supporting records referenced by a claim payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Patient,
    Organization,
    Practitioner,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Patient, ResourceKind::Organization, ResourceKind::Practitioner];

    pub fn path(&self) -> &'static str {
        match self {
            ResourceKind::Patient => "patient",
            ResourceKind::Organization => "organization",
            ResourceKind::Practitioner => "practitioner",
        }
    }

    /// Key under which the payload carries this resource
    pub fn payload_key(&self) -> &'static str {
        match self {
            ResourceKind::Patient => "patient",
            ResourceKind::Organization => "provider",
            ResourceKind::Practitioner => "practitioner",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Submits a claim document
#[async_trait]
pub trait ClaimSubmitter: Send + Sync {
    async fn submit_claim(&self, payload: &Value) -> Result<SubmitEnvelope, ApiError>;
}

/// Fetches the current claim resource
#[async_trait]
pub trait ClaimStatusSource: Send + Sync {
    async fn fetch_claim(&self, claim_id: &str) -> Result<Value, ApiError>;
}

/// Persists classified results
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn create_result(&self, record: &ResultRecord) -> Result<(), ApiError>;
}

/// Creates supporting records a claim refers to
#[async_trait]
pub trait ResourceRegistry: Send + Sync {
    async fn ensure_resource(&self, kind: ResourceKind, resource: &Value) -> Result<(), ApiError>;
}

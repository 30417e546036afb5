//! Claim Test Core Engine
//!
//! This crate drives scripted test cases against an external claims
//! adjudication service, resolves each claim's asynchronous outcome,
//! classifies the run against a policy table keyed by test intent, and
//! aggregates the results for reporting.

pub mod aggregator;
pub mod api;
pub mod classifier;
pub mod corpus;
pub mod execution;
pub mod outcome;
pub mod report;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub use aggregator::{ResultAggregator, RunSummary, TestResult};
pub use api::{
    ApiError, ClaimStatusSource, ClaimSubmitter, ResourceKind, ResourceRegistry, ResultRecord,
    ResultStore, SubmitEnvelope, SubmitPayload,
};
pub use classifier::Classifier;
pub use corpus::{InterventionGroup, Polarity, PolarityClass, TestCase, TestIntent};
pub use execution::{ItemStatus, Orchestrator, OrchestratorBuilder, Run, RunEvent, RunItem};
pub use outcome::{classify, ClaimOutcome, Verdict};
pub use resolver::{OutcomeResolver, Refreshed};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Run refused: {0}")]
    Precondition(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Base URL of the adjudication API
    pub base_url: String,

    /// Bearer token identifying the caller
    pub api_token: Option<String>,

    /// User id attached to persisted results
    pub user_id: Option<String>,

    /// User agent string
    pub user_agent: String,

    /// Request timeout (seconds)
    pub timeout_secs: u64,

    /// Delay before every outcome fetch (milliseconds)
    pub resolve_delay_ms: u64,

    /// Delay between consecutive test cases of a batch (milliseconds)
    pub pacing_delay_ms: u64,

    /// Maximum cases sampled per polarity per intervention
    pub cap_per_polarity: usize,

    /// Create patient/provider/practitioner records before submitting
    pub ensure_related_resources: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/".to_string(),
            api_token: None,
            user_id: None,
            user_agent: "claimtest/0.1".to_string(),
            timeout_secs: 60,
            resolve_delay_ms: 2000,
            pacing_delay_ms: 1000,
            cap_per_polarity: 2,
            ensure_related_resources: false,
        }
    }
}

impl HarnessConfig {
    /// Parse a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Apply `CLAIMTEST_*` environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("CLAIMTEST_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(token) = std::env::var("CLAIMTEST_API_TOKEN") {
            self.api_token = Some(token);
        }
        if let Ok(user) = std::env::var("CLAIMTEST_USER_ID") {
            self.user_id = Some(user);
        }
        self
    }

    pub fn resolve_delay(&self) -> Duration {
        Duration::from_millis(self.resolve_delay_ms)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.cap_per_polarity, 2);
        assert_eq!(config.resolve_delay(), Duration::from_secs(2));
        assert_eq!(config.pacing_delay(), Duration::from_secs(1));
        assert!(!config.ensure_related_resources);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = HarnessConfig::from_toml_str(
            r#"
            base_url = "https://adjudicator.test/api/"
            pacing_delay_ms = 0
            cap_per_polarity = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://adjudicator.test/api/");
        assert_eq!(config.pacing_delay_ms, 0);
        assert_eq!(config.cap_per_polarity, 5);
        assert_eq!(config.resolve_delay_ms, 2000);
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = HarnessConfig::from_toml_str("cap_per_polarity = \"lots\"").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }
}

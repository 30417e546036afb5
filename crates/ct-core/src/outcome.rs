//! Claim outcome vocabulary and the verdict policy table

use crate::corpus::TestIntent;
use serde::{Deserialize, Serialize};

/// Outcomes that prove an accepting test passed
pub const POSITIVE_OUTCOMES: [&str; 4] = ["Approved", "SentForPayment", "ClinicalReview", "ManualReview"];

/// Outcomes that prove a rejecting test passed
pub const NEGATIVE_OUTCOMES: [&str; 4] = ["Declined", "Rejected", "SentBack", "Decline"];

/// Non-terminal state reported while adjudication is still in flight
pub const PENDING: &str = "Pending";

/// Substituted when the outcome fetch itself fails
pub const OUTCOME_ERROR_SENTINEL: &str = "Error determining outcome";

/// Adjudication state reported by the claims service.
///
/// The literal set belongs to the service, so this is an open string that is
/// only ever matched against the two allow-lists above.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimOutcome(String);

impl ClaimOutcome {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn pending() -> Self {
        Self::new(PENDING)
    }

    pub fn resolution_error() -> Self {
        Self::new(OUTCOME_ERROR_SENTINEL)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_pending(&self) -> bool {
        self.0 == PENDING
    }

    pub fn is_positive(&self) -> bool {
        POSITIVE_OUTCOMES.contains(&self.0.as_str())
    }

    pub fn is_negative(&self) -> bool {
        NEGATIVE_OUTCOMES.contains(&self.0.as_str())
    }
}

impl std::fmt::Display for ClaimOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClaimOutcome {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ClaimOutcome {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Derived pass/fail status of a test result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Passed,
    Failed,
}

impl Verdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, Verdict::Passed)
    }

    /// Wire value used by the result store (1 = passed)
    pub fn as_flag(&self) -> u8 {
        match self {
            Verdict::Passed => 1,
            Verdict::Failed => 0,
        }
    }

    fn from_bool(passed: bool) -> Self {
        if passed {
            Verdict::Passed
        } else {
            Verdict::Failed
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Passed => write!(f, "passed"),
            Verdict::Failed => write!(f, "failed"),
        }
    }
}

/// Classify a run against the policy table.
///
/// Accepting intents pass only on a successful submission that reached a
/// positive outcome. Negative intent passes on any negative outcome, whether
/// or not the submission itself succeeded. Unknown outcomes never error; they
/// simply fail.
pub fn classify(intent: TestIntent, submission_succeeded: bool, outcome: &ClaimOutcome) -> Verdict {
    match intent {
        TestIntent::Negative => Verdict::from_bool(outcome.is_negative()),
        TestIntent::Positive | TestIntent::Build | TestIntent::Complex => {
            Verdict::from_bool(submission_succeeded && outcome.is_positive())
        }
    }
}

/// Verdict for a submission the service refused outright (transport or
/// validation error). The refusal is exactly what a negative test expects.
pub fn classify_rejected_submission(intent: TestIntent) -> Verdict {
    Verdict::from_bool(intent == TestIntent::Negative)
}

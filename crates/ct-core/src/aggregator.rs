//! Result aggregation and run summary statistics

use crate::corpus::TestIntent;
use crate::outcome::{ClaimOutcome, Verdict};
use crate::resolver::Refreshed;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classified result of one executed test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: Uuid,
    pub test_case_id: String,
    pub claim_id: String,
    pub test_polarity: TestIntent,
    pub name: String,
    pub status: Verdict,
    pub outcome: ClaimOutcome,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub details: serde_json::Value,
}

/// Run level statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Results whose outcome is still `Pending`
    pub pending: usize,
    /// Percentage of passed results, rounded
    pub pass_rate: u32,
}

/// Ordered results of the active run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultAggregator {
    results: Vec<TestResult>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: TestResult) {
        self.results.push(result);
    }

    /// Replace the result already recorded for the same test case, or append
    pub fn upsert(&mut self, result: TestResult) {
        match self.results.iter_mut().find(|r| r.test_case_id == result.test_case_id) {
            Some(existing) => *existing = result,
            None => self.results.push(result),
        }
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn find_by_claim(&self, claim_id: &str) -> Option<&TestResult> {
        self.results.iter().find(|r| r.claim_id == claim_id)
    }

    /// Apply a refreshed outcome in place. Returns false if no result carries
    /// the claim id.
    pub fn apply_refresh(&mut self, claim_id: &str, refreshed: &Refreshed) -> bool {
        let Some(result) = self.results.iter_mut().find(|r| r.claim_id == claim_id) else {
            return false;
        };

        result.outcome = refreshed.outcome.clone();
        result.status = refreshed.status;
        result.message = refreshed.message.clone();
        result.timestamp = Utc::now();
        true
    }

    pub fn summary(&self) -> RunSummary {
        let total = self.results.len();
        let passed = self.results.iter().filter(|r| r.status.is_passed()).count();
        let pending = self.results.iter().filter(|r| r.outcome.is_pending()).count();
        let pass_rate = if total == 0 {
            0
        } else {
            (100.0 * passed as f64 / total as f64).round() as u32
        };

        RunSummary {
            total,
            passed,
            failed: total - passed,
            pending,
            pass_rate,
        }
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(claim_id: &str, status: Verdict, outcome: &str) -> TestResult {
        TestResult {
            id: Uuid::new_v4(),
            test_case_id: format!("tc-{}", claim_id),
            claim_id: claim_id.to_string(),
            test_polarity: TestIntent::Positive,
            name: claim_id.to_string(),
            status,
            outcome: outcome.into(),
            duration_ms: 10,
            timestamp: Utc::now(),
            message: String::new(),
            details: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_summary() {
        let mut agg = ResultAggregator::new();
        assert_eq!(agg.summary(), RunSummary::default());

        agg.push(result("A", Verdict::Passed, "Approved"));
        agg.push(result("B", Verdict::Failed, "Pending"));
        agg.push(result("C", Verdict::Passed, "Declined"));

        let summary = agg.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.pass_rate, 67);
    }

    #[test]
    fn test_apply_refresh_in_place() {
        let mut agg = ResultAggregator::new();
        agg.push(result("A", Verdict::Failed, "Pending"));
        agg.push(result("B", Verdict::Failed, "Pending"));
        agg.push(result("C", Verdict::Passed, "Approved"));
        let before = agg.results().to_vec();

        let refreshed = Refreshed {
            outcome: "Approved".into(),
            status: Verdict::Passed,
            message: "Refreshed: Approved".to_string(),
        };
        assert!(agg.apply_refresh("B", &refreshed));
        assert!(!agg.apply_refresh("Z", &refreshed));

        let after = agg.results();
        assert_eq!(after[0], before[0]);
        assert_eq!(after[2], before[2]);
        assert_eq!(after[1].id, before[1].id);
        assert_eq!(after[1].status, Verdict::Passed);
        assert_eq!(after[1].outcome.as_str(), "Approved");
        assert_eq!(after[1].message, "Refreshed: Approved");
        assert!(after[1].timestamp >= before[1].timestamp);
        assert_eq!(agg.summary().pending, 1);
    }
}

//! Run state and sequential execution

pub mod orchestrator;
pub mod related;

pub use orchestrator::{Orchestrator, OrchestratorBuilder, ProgressSink};

use crate::aggregator::{ResultAggregator, RunSummary};
use crate::corpus::TestCase;
use crate::outcome::Verdict;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an admitted test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Failed)
    }

    /// Transitions only move forward: pending -> running -> completed|failed
    pub fn can_transition_to(&self, next: ItemStatus) -> bool {
        matches!(
            (self, next),
            (ItemStatus::Pending, ItemStatus::Running)
                | (ItemStatus::Running, ItemStatus::Completed)
                | (ItemStatus::Running, ItemStatus::Failed)
        )
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Pending => write!(f, "pending"),
            ItemStatus::Running => write!(f, "running"),
            ItemStatus::Completed => write!(f, "completed"),
            ItemStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A test case admitted into a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunItem {
    pub test_case: TestCase,
    status: ItemStatus,
}

impl RunItem {
    pub fn new(test_case: TestCase) -> Self {
        Self {
            test_case,
            status: ItemStatus::Pending,
        }
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    fn advance(&mut self, next: ItemStatus) -> bool {
        if !self.status.can_transition_to(next) {
            tracing::warn!(
                "Ignoring illegal transition {} -> {} for {}",
                self.status,
                next,
                self.test_case.id
            );
            return false;
        }
        self.status = next;
        true
    }
}

/// Progress notifications emitted while a run executes
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    ItemStarted {
        index: usize,
        total: usize,
        test_case_id: String,
    },
    ItemFinished {
        index: usize,
        total: usize,
        test_case_id: String,
        status: ItemStatus,
        verdict: Verdict,
    },
    /// Fires once after the last item, whatever the individual outcomes
    BatchCompleted { summary: RunSummary },
}

/// Owned state of one run: admitted items, progress cursor and results.
///
/// Passed explicitly into the orchestrator so concurrent or stale runs can
/// never share state. Abandoning a run means dropping it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    items: Vec<RunItem>,
    cursor: Option<usize>,
    results: ResultAggregator,
}

impl Run {
    /// Admit cases in corpus order
    pub fn admit<'a, I>(cases: I) -> Self
    where
        I: IntoIterator<Item = &'a TestCase>,
    {
        Self {
            id: Uuid::new_v4(),
            items: cases.into_iter().cloned().map(RunItem::new).collect(),
            cursor: None,
            results: ResultAggregator::new(),
        }
    }

    pub fn items(&self) -> &[RunItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index of the item a batch is working on; `None` while idle
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn results(&self) -> &ResultAggregator {
        &self.results
    }

    pub fn summary(&self) -> RunSummary {
        self.results.summary()
    }

    pub fn position(&self, test_case_id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.test_case.id == test_case_id)
    }

    /// Start a fresh pass: every item back to pending, results dropped
    fn reset(&mut self) {
        for item in &mut self.items {
            item.status = ItemStatus::Pending;
        }
        self.results.clear();
        self.cursor = None;
    }
}

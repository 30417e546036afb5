//! Run report generation

pub mod json;
pub mod markdown;

use crate::aggregator::{RunSummary, TestResult};
use crate::execution::Run;
use crate::CoreResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Markdown,
}

/// Snapshot of a run for reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub summary: RunSummary,
    pub results: Vec<TestResult>,
}

impl RunReport {
    pub fn from_run(run: &Run) -> Self {
        Self {
            run_id: run.id,
            generated_at: Utc::now(),
            summary: run.summary(),
            results: run.results().results().to_vec(),
        }
    }
}

/// Generate report in specified format
pub fn generate_report(report: &RunReport, format: ReportFormat) -> CoreResult<String> {
    match format {
        ReportFormat::Json => json::generate(report),
        ReportFormat::Markdown => Ok(markdown::generate(report)),
    }
}

//! JSON report generation

use super::RunReport;
use crate::{CoreError, CoreResult};

pub fn generate(report: &RunReport) -> CoreResult<String> {
    serde_json::to_string_pretty(report)
        .map_err(|e| CoreError::Parse(format!("JSON serialization failed: {}", e)))
}

//! Markdown report generation

use super::RunReport;
use std::fmt::Write;

pub fn generate(report: &RunReport) -> String {
    let mut out = String::new();
    let s = &report.summary;

    let _ = writeln!(out, "# Claim Test Run {}\n", report.run_id);
    let _ = writeln!(out, "Generated: {}\n", report.generated_at.to_rfc3339());
    let _ = writeln!(out, "| Total | Passed | Failed | Pending | Pass rate |");
    let _ = writeln!(out, "|------:|-------:|-------:|--------:|----------:|");
    let _ = writeln!(
        out,
        "| {} | {} | {} | {} | {}% |\n",
        s.total, s.passed, s.failed, s.pending, s.pass_rate
    );

    if report.results.is_empty() {
        out.push_str("No results recorded.\n");
        return out;
    }

    let _ = writeln!(out, "## Results\n");
    let _ = writeln!(out, "| Test | Intent | Claim | Outcome | Status | Duration | Message |");
    let _ = writeln!(out, "|------|--------|-------|---------|--------|---------:|---------|");
    for r in &report.results {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} ms | {} |",
            escape(&r.name),
            r.test_polarity,
            escape(&r.claim_id),
            escape(r.outcome.as_str()),
            if r.status.is_passed() { "PASS" } else { "FAIL" },
            r.duration_ms,
            escape(&r.message)
        );
    }

    out
}

fn escape(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{ResultAggregator, TestResult};
    use crate::corpus::TestIntent;
    use crate::outcome::Verdict;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_markdown_report() {
        let mut agg = ResultAggregator::new();
        agg.push(TestResult {
            id: Uuid::new_v4(),
            test_case_id: "n1".into(),
            claim_id: "unknown".into(),
            test_polarity: TestIntent::Negative,
            name: "Reject | bad NPI".into(),
            status: Verdict::Passed,
            outcome: "Error".into(),
            duration_ms: 42,
            timestamp: Utc::now(),
            message: "invalid\nnpi".into(),
            details: serde_json::Value::Null,
        });

        let report = RunReport {
            run_id: Uuid::nil(),
            generated_at: Utc::now(),
            summary: agg.summary(),
            results: agg.results().to_vec(),
        };
        let md = generate(&report);

        assert!(md.contains("| 1 | 1 | 0 | 0 | 100% |"));
        assert!(md.contains("Reject \\| bad NPI"));
        assert!(md.contains("| negative |"));
        assert!(md.contains("PASS"));
        assert!(md.contains("invalid npi"));
    }

    #[test]
    fn test_empty_report() {
        let report = RunReport {
            run_id: Uuid::nil(),
            generated_at: Utc::now(),
            summary: Default::default(),
            results: Vec::new(),
        };
        assert!(generate(&report).contains("No results recorded."));
        assert!(crate::report::json::generate(&report).unwrap().contains("\"pass_rate\": 0"));
    }
}

//! The verdict report: one record per evaluated check plus roll-up metrics.

use super::check::{CheckOutcome, CheckStatus};
use super::severity::Severity;
use serde::Serialize;
use std::fmt;

/// Overall run verdict. Passing means no critical check failed; advisory
/// failures never block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Passed,
    Failed,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Passed => write!(f, "PASSED"),
            Verdict::Failed => write!(f, "FAILED"),
        }
    }
}

/// The evaluation of one check, in battery order.
#[derive(Debug, Clone, Serialize)]
pub struct CheckRecord {
    pub id: String,
    pub table: String,
    pub severity: Severity,
    pub status: CheckStatus,
    pub affected_rows: u64,
    pub samples: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckRecord {
    pub fn new(id: &str, table: &str, severity: Severity, outcome: CheckOutcome) -> Self {
        Self {
            id: id.to_string(),
            table: table.to_string(),
            severity,
            status: outcome.status,
            affected_rows: outcome.affected_rows,
            samples: outcome.samples,
            message: outcome.message,
        }
    }

    pub fn is_critical_failure(&self) -> bool {
        self.status == CheckStatus::Failed && self.severity.is_critical()
    }
}

/// Roll-up counters over a battery run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReportMetrics {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub critical_failures: usize,
    pub advisory_failures: usize,
}

/// Complete result of a validation run.
#[derive(Debug, Clone, Serialize)]
pub struct VerdictReport {
    pub verdict: Verdict,
    pub metrics: ReportMetrics,
    pub records: Vec<CheckRecord>,
}

impl VerdictReport {
    /// Builds the report from the per-check records, deriving the verdict.
    pub fn from_records(records: Vec<CheckRecord>) -> Self {
        let mut metrics = ReportMetrics {
            total: records.len(),
            ..Default::default()
        };
        for record in &records {
            match record.status {
                CheckStatus::Passed => metrics.passed += 1,
                CheckStatus::Skipped => metrics.skipped += 1,
                CheckStatus::Failed => {
                    metrics.failed += 1;
                    if record.severity.is_critical() {
                        metrics.critical_failures += 1;
                    } else {
                        metrics.advisory_failures += 1;
                    }
                }
            }
        }
        let verdict = if metrics.critical_failures == 0 {
            Verdict::Passed
        } else {
            Verdict::Failed
        };
        Self {
            verdict,
            metrics,
            records,
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Passed
    }

    /// Failed records only, critical first in battery order.
    pub fn failures(&self) -> impl Iterator<Item = &CheckRecord> {
        let critical = self
            .records
            .iter()
            .filter(|r| r.status == CheckStatus::Failed && r.severity.is_critical());
        let advisory = self
            .records
            .iter()
            .filter(|r| r.status == CheckStatus::Failed && !r.severity.is_critical());
        critical.chain(advisory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, severity: Severity, status: CheckStatus) -> CheckRecord {
        let outcome = match status {
            CheckStatus::Passed => CheckOutcome::passed(),
            CheckStatus::Failed => CheckOutcome::failed(2, vec![], "2 violations"),
            CheckStatus::Skipped => CheckOutcome::skipped("n/a"),
        };
        CheckRecord::new(id, "fact_sales", severity, outcome)
    }

    #[test]
    fn test_advisory_failure_still_passes() {
        let report = VerdictReport::from_records(vec![
            record("a", Severity::Critical, CheckStatus::Passed),
            record("b", Severity::Advisory, CheckStatus::Failed),
        ]);
        assert!(report.passed());
        assert_eq!(report.metrics.failed, 1);
        assert_eq!(report.metrics.advisory_failures, 1);
        assert_eq!(report.metrics.critical_failures, 0);
    }

    #[test]
    fn test_critical_failure_fails_verdict() {
        let report = VerdictReport::from_records(vec![
            record("a", Severity::Critical, CheckStatus::Failed),
            record("b", Severity::Advisory, CheckStatus::Passed),
        ]);
        assert!(!report.passed());
        assert_eq!(report.verdict, Verdict::Failed);
        assert_eq!(report.metrics.critical_failures, 1);
    }

    #[test]
    fn test_skips_never_affect_verdict() {
        let report = VerdictReport::from_records(vec![record(
            "a",
            Severity::Critical,
            CheckStatus::Skipped,
        )]);
        assert!(report.passed());
        assert_eq!(report.metrics.skipped, 1);
    }

    #[test]
    fn test_failures_lists_critical_first() {
        let report = VerdictReport::from_records(vec![
            record("adv", Severity::Advisory, CheckStatus::Failed),
            record("crit", Severity::Critical, CheckStatus::Failed),
        ]);
        let ids: Vec<_> = report.failures().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["crit", "adv"]);
    }
}

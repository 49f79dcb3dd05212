//! The validation engine.
//!
//! A fixed, ordered battery of checks runs against the processed tables
//! registered in a DataFusion context and produces a [`VerdictReport`]. Only
//! failing CRITICAL checks veto the commit.

pub mod battery;
pub mod check;
pub mod checks;
pub mod report;
pub mod severity;

pub use check::{Check, CheckOutcome, CheckStatus};
pub use report::{CheckRecord, ReportMetrics, Verdict, VerdictReport};
pub use severity::Severity;

use crate::config::ValidationConfig;
use crate::error::Result;
use crate::schema::SchemaRegistry;
use datafusion::prelude::SessionContext;
use tracing::{debug, info, instrument, warn};

/// Runs a check battery and assembles the verdict.
pub struct ValidationEngine {
    checks: Vec<Box<dyn Check>>,
}

impl std::fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationEngine")
            .field("checks", &self.checks.len())
            .finish()
    }
}

impl ValidationEngine {
    /// The standard battery for the sales star schema.
    pub fn battery(config: &ValidationConfig) -> Self {
        Self {
            checks: battery::build_battery(SchemaRegistry::star_schema(), config),
        }
    }

    /// A custom check list, in evaluation order.
    pub fn with_checks(checks: Vec<Box<dyn Check>>) -> Self {
        Self { checks }
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Evaluates every check in order against the registered tables.
    ///
    /// Check failures are data findings and land in the report; an `Err`
    /// here means a check itself could not run and the battery aborts.
    #[instrument(skip(self, ctx), fields(checks = self.checks.len()))]
    pub async fn run(&self, ctx: &SessionContext) -> Result<VerdictReport> {
        let mut records = Vec::with_capacity(self.checks.len());
        for check in &self.checks {
            let outcome = check.evaluate(ctx).await?;
            match outcome.status {
                CheckStatus::Failed => warn!(
                    check.id = %check.id(),
                    check.severity = %check.severity(),
                    affected_rows = outcome.affected_rows,
                    "Check failed"
                ),
                _ => debug!(check.id = %check.id(), status = %outcome.status, "Check evaluated"),
            }
            records.push(CheckRecord::new(
                check.id(),
                check.table(),
                check.severity(),
                outcome,
            ));
        }

        let report = VerdictReport::from_records(records);
        info!(
            verdict = %report.verdict,
            passed = report.metrics.passed,
            failed = report.metrics.failed,
            skipped = report.metrics.skipped,
            critical_failures = report.metrics.critical_failures,
            "Validation battery complete"
        );
        Ok(report)
    }
}

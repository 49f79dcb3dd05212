//! Numeric range check over a column.
//!
//! Nulls are out of scope: completeness owns null detection, so a range
//! check only inspects present values.

use super::count_violations;
use crate::error::Result;
use crate::validate::check::{Check, CheckOutcome};
use crate::validate::severity::Severity;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;

#[derive(Debug)]
pub struct RangeCheck {
    id: String,
    table: String,
    column: String,
    min: Option<f64>,
    max: Option<f64>,
    sample_key: String,
    sample_limit: usize,
    severity: Severity,
}

impl RangeCheck {
    pub fn between(
        table: &str,
        column: &str,
        min: f64,
        max: f64,
        sample_key: &str,
        sample_limit: usize,
        severity: Severity,
    ) -> Self {
        Self::build(table, column, Some(min), Some(max), sample_key, sample_limit, severity)
    }

    pub fn at_least(
        table: &str,
        column: &str,
        min: f64,
        sample_key: &str,
        sample_limit: usize,
        severity: Severity,
    ) -> Self {
        Self::build(table, column, Some(min), None, sample_key, sample_limit, severity)
    }

    pub fn at_most(
        table: &str,
        column: &str,
        max: f64,
        sample_key: &str,
        sample_limit: usize,
        severity: Severity,
    ) -> Self {
        Self::build(table, column, None, Some(max), sample_key, sample_limit, severity)
    }

    /// An upper bound registered under a `threshold.` id, so a tunable
    /// ceiling can coexist with a hard range check on the same column.
    pub fn threshold_at_most(
        table: &str,
        column: &str,
        max: f64,
        sample_key: &str,
        sample_limit: usize,
        severity: Severity,
    ) -> Self {
        let mut check =
            Self::build(table, column, None, Some(max), sample_key, sample_limit, severity);
        check.id = format!("threshold.{table}.{column}");
        check
    }

    fn build(
        table: &str,
        column: &str,
        min: Option<f64>,
        max: Option<f64>,
        sample_key: &str,
        sample_limit: usize,
        severity: Severity,
    ) -> Self {
        debug_assert!(min.is_some() || max.is_some());
        Self {
            id: format!("range.{table}.{column}"),
            table: table.to_string(),
            column: column.to_string(),
            min,
            max,
            sample_key: sample_key.to_string(),
            sample_limit,
            severity,
        }
    }

    fn violation_predicate(&self) -> String {
        let mut bounds = Vec::new();
        if let Some(min) = self.min {
            bounds.push(format!("{} < {min}", self.column));
        }
        if let Some(max) = self.max {
            bounds.push(format!("{} > {max}", self.column));
        }
        format!(
            "{} IS NOT NULL AND ({})",
            self.column,
            bounds.join(" OR ")
        )
    }

    fn bounds_label(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("[{min}, {max}]"),
            (Some(min), None) => format!(">= {min}"),
            (None, Some(max)) => format!("<= {max}"),
            (None, None) => String::new(),
        }
    }
}

#[async_trait]
impl Check for RangeCheck {
    fn id(&self) -> &str {
        &self.id
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    async fn evaluate(&self, ctx: &SessionContext) -> Result<CheckOutcome> {
        let predicate = self.violation_predicate();
        let count_sql = format!("SELECT COUNT(*) FROM {} WHERE {predicate}", self.table);
        let sample_sql = format!(
            "SELECT CAST({} AS VARCHAR) FROM {} WHERE {predicate} LIMIT {}",
            self.sample_key, self.table, self.sample_limit
        );
        count_violations(
            &self.id,
            ctx,
            &count_sql,
            &sample_sql,
            &format!(
                "values of {}.{} outside {}",
                self.table,
                self.column,
                self.bounds_label()
            ),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::check::CheckStatus;
    use crate::validate::checks::tests::region_context_keys;

    #[tokio::test]
    async fn test_in_range_passes_and_ignores_nulls() {
        let ctx = SessionContext::new();
        region_context_keys(&[Some(1), Some(5), None]).register(&ctx).unwrap();

        let check = RangeCheck::between(
            "dim_region", "region_key", 1.0, 10.0, "region_key", 5, Severity::Critical,
        );
        let outcome = check.evaluate(&ctx).await.unwrap();
        assert_eq!(outcome.status, CheckStatus::Passed);
    }

    #[tokio::test]
    async fn test_out_of_range_fails() {
        let ctx = SessionContext::new();
        region_context_keys(&[Some(0), Some(5), Some(42)]).register(&ctx).unwrap();

        let check = RangeCheck::between(
            "dim_region", "region_key", 1.0, 10.0, "region_key", 5, Severity::Critical,
        );
        let outcome = check.evaluate(&ctx).await.unwrap();
        assert_eq!(outcome.status, CheckStatus::Failed);
        assert_eq!(outcome.affected_rows, 2);
        let message = outcome.message.unwrap();
        assert!(message.contains("[1, 10]"), "{message}");
    }

    #[tokio::test]
    async fn test_one_sided_bound() {
        let ctx = SessionContext::new();
        region_context_keys(&[Some(-3), Some(5)]).register(&ctx).unwrap();

        let check = RangeCheck::at_least(
            "dim_region", "region_key", 1.0, "region_key", 5, Severity::Critical,
        );
        let outcome = check.evaluate(&ctx).await.unwrap();
        assert_eq!(outcome.status, CheckStatus::Failed);
        assert_eq!(outcome.affected_rows, 1);
        assert_eq!(outcome.samples, vec!["-3"]);
    }
}

//! Free-form rule check: fails for every row matching a violation
//! predicate.
//!
//! The battery uses this for cross-column business rules and for recomputing
//! derived measures in SQL to confirm the transform's arithmetic.

use super::count_violations;
use crate::error::Result;
use crate::validate::check::{Check, CheckOutcome};
use crate::validate::severity::Severity;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;

#[derive(Debug)]
pub struct ExpressionCheck {
    id: String,
    table: String,
    /// SQL predicate matching VIOLATING rows.
    violation_predicate: String,
    description: String,
    sample_key: String,
    sample_limit: usize,
    severity: Severity,
}

impl ExpressionCheck {
    pub fn new(
        id: impl Into<String>,
        table: &str,
        violation_predicate: impl Into<String>,
        description: impl Into<String>,
        sample_key: &str,
        sample_limit: usize,
        severity: Severity,
    ) -> Self {
        Self {
            id: id.into(),
            table: table.to_string(),
            violation_predicate: violation_predicate.into(),
            description: description.into(),
            sample_key: sample_key.to_string(),
            sample_limit,
            severity,
        }
    }
}

#[async_trait]
impl Check for ExpressionCheck {
    fn id(&self) -> &str {
        &self.id
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn description(&self) -> Option<&str> {
        Some(&self.description)
    }

    async fn evaluate(&self, ctx: &SessionContext) -> Result<CheckOutcome> {
        let count_sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            self.table, self.violation_predicate
        );
        let sample_sql = format!(
            "SELECT CAST({} AS VARCHAR) FROM {} WHERE {} LIMIT {}",
            self.sample_key, self.table, self.violation_predicate, self.sample_limit
        );
        count_violations(
            &self.id,
            ctx,
            &count_sql,
            &sample_sql,
            &format!("rows violating: {}", self.description),
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
    async fn test_predicate_counts_violations() {
        let ctx = SessionContext::new();
        region_context_keys(&[Some(1), Some(2), Some(50)])
            .register(&ctx)
            .unwrap();

        let check = ExpressionCheck::new(
            "rule.dim_region.key_under_10",
            "dim_region",
            "region_key >= 10",
            "region keys stay below 10",
            "region_key",
            5,
            Severity::Advisory,
        );
        let outcome = check.evaluate(&ctx).await.unwrap();
        assert_eq!(outcome.status, CheckStatus::Failed);
        assert_eq!(outcome.affected_rows, 1);
        assert_eq!(outcome.samples, vec!["50"]);
        assert_eq!(check.description(), Some("region keys stay below 10"));
    }

    #[tokio::test]
    async fn test_no_violations_pass() {
        let ctx = SessionContext::new();
        region_context_keys(&[Some(1), Some(2)]).register(&ctx).unwrap();

        let check = ExpressionCheck::new(
            "rule.dim_region.key_under_10",
            "dim_region",
            "region_key >= 10",
            "region keys stay below 10",
            "region_key",
            5,
            Severity::Advisory,
        );
        let outcome = check.evaluate(&ctx).await.unwrap();
        assert_eq!(outcome.status, CheckStatus::Passed);
    }
}

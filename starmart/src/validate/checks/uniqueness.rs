//! Key uniqueness check: no value may appear more than once.

use super::{collect_samples, scalar_count};
use crate::error::Result;
use crate::validate::check::{Check, CheckOutcome};
use crate::validate::severity::Severity;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;

/// Fails when any non-null value of the column is duplicated. Nulls are the
/// completeness check's concern, not this one's.
#[derive(Debug)]
pub struct UniquenessCheck {
    id: String,
    table: String,
    column: String,
    sample_limit: usize,
    severity: Severity,
}

impl UniquenessCheck {
    pub fn new(table: &str, column: &str, sample_limit: usize, severity: Severity) -> Self {
        Self {
            id: format!("uniqueness.{table}.{column}"),
            table: table.to_string(),
            column: column.to_string(),
            sample_limit,
            severity,
        }
    }
}

#[async_trait]
impl Check for UniquenessCheck {
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
        // Counts the surplus rows, not the distinct duplicated values.
        let count_sql = format!(
            "SELECT COALESCE(SUM(n - 1), 0) FROM (\
               SELECT COUNT(*) AS n FROM {table} \
               WHERE {col} IS NOT NULL GROUP BY {col} HAVING COUNT(*) > 1) AS dup",
            table = self.table,
            col = self.column,
        );
        let duplicates = scalar_count(&self.id, ctx, &count_sql).await?;
        if duplicates == 0 {
            return Ok(CheckOutcome::passed());
        }
        let sample_sql = format!(
            "SELECT CAST({col} AS VARCHAR) FROM {table} \
             WHERE {col} IS NOT NULL GROUP BY {col} HAVING COUNT(*) > 1 \
             ORDER BY 1 LIMIT {limit}",
            table = self.table,
            col = self.column,
            limit = self.sample_limit,
        );
        let samples = collect_samples(&self.id, ctx, &sample_sql).await?;
        Ok(CheckOutcome::failed(
            duplicates,
            samples,
            format!(
                "{duplicates} duplicate rows on {}.{}",
                self.table, self.column
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::check::CheckStatus;
    use crate::validate::checks::tests::region_context_keys;

    #[tokio::test]
    async fn test_unique_keys_pass() {
        let ctx = SessionContext::new();
        region_context_keys(&[Some(1), Some(2), None, None])
            .register(&ctx)
            .unwrap();

        let check = UniquenessCheck::new("dim_region", "region_key", 5, Severity::Critical);
        let outcome = check.evaluate(&ctx).await.unwrap();
        // Null keys are not duplicates here.
        assert_eq!(outcome.status, CheckStatus::Passed);
    }

    #[tokio::test]
    async fn test_duplicate_keys_fail_with_surplus_count() {
        let ctx = SessionContext::new();
        region_context_keys(&[Some(1), Some(1), Some(1), Some(2)])
            .register(&ctx)
            .unwrap();

        let check = UniquenessCheck::new("dim_region", "region_key", 5, Severity::Critical);
        let outcome = check.evaluate(&ctx).await.unwrap();
        assert_eq!(outcome.status, CheckStatus::Failed);
        // Three rows share key 1; two of them are surplus.
        assert_eq!(outcome.affected_rows, 2);
        assert_eq!(outcome.samples, vec!["1"]);
    }
}

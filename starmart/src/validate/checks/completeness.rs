//! Null-rate check: a required column may contain no nulls.

use super::count_violations;
use crate::error::Result;
use crate::validate::check::{Check, CheckOutcome};
use crate::validate::severity::Severity;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;

#[derive(Debug)]
pub struct CompletenessCheck {
    id: String,
    table: String,
    column: String,
    sample_key: String,
    sample_limit: usize,
    severity: Severity,
}

impl CompletenessCheck {
    pub fn new(
        table: &str,
        column: &str,
        sample_key: &str,
        sample_limit: usize,
        severity: Severity,
    ) -> Self {
        Self {
            id: format!("completeness.{table}.{column}"),
            table: table.to_string(),
            column: column.to_string(),
            sample_key: sample_key.to_string(),
            sample_limit,
            severity,
        }
    }
}

#[async_trait]
impl Check for CompletenessCheck {
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
        let count_sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} IS NULL",
            self.table, self.column
        );
        let sample_sql = format!(
            "SELECT CAST({} AS VARCHAR) FROM {} WHERE {} IS NULL LIMIT {}",
            self.sample_key, self.table, self.column, self.sample_limit
        );
        count_violations(
            &self.id,
            ctx,
            &count_sql,
            &sample_sql,
            &format!("null values in {}.{}", self.table, self.column),
        )
        .await
    }
}

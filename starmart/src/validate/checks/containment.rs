//! Domain containment check: every present value must come from a fixed
//! allow list.

use super::{count_violations, sql_string_literal};
use crate::error::Result;
use crate::validate::check::{Check, CheckOutcome};
use crate::validate::severity::Severity;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;

#[derive(Debug)]
pub struct ContainmentCheck {
    id: String,
    table: String,
    column: String,
    allowed: Vec<String>,
    sample_limit: usize,
    severity: Severity,
}

impl ContainmentCheck {
    pub fn new<I, S>(
        table: &str,
        column: &str,
        allowed: I,
        sample_limit: usize,
        severity: Severity,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: format!("containment.{table}.{column}"),
            table: table.to_string(),
            column: column.to_string(),
            allowed: allowed.into_iter().map(Into::into).collect(),
            sample_limit,
            severity,
        }
    }

    fn in_list(&self) -> String {
        self.allowed
            .iter()
            .map(|v| sql_string_literal(v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[async_trait]
impl Check for ContainmentCheck {
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
        let predicate = format!(
            "{col} IS NOT NULL AND {col} NOT IN ({list})",
            col = self.column,
            list = self.in_list(),
        );
        let count_sql = format!("SELECT COUNT(*) FROM {} WHERE {predicate}", self.table);
        // Samples are the offending values themselves, deduplicated.
        let sample_sql = format!(
            "SELECT DISTINCT CAST({} AS VARCHAR) FROM {} WHERE {predicate} ORDER BY 1 LIMIT {}",
            self.column, self.table, self.sample_limit
        );
        count_violations(
            &self.id,
            ctx,
            &count_sql,
            &sample_sql,
            &format!(
                "values of {}.{} outside the allowed set",
                self.table, self.column
            ),
        )
        .await
    }
}

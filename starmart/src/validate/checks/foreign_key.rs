//! Referential integrity check: every fact key must resolve to a dimension
//! row. A null key fails too; an unattributable fact row cannot be served.

use super::count_violations;
use crate::error::Result;
use crate::validate::check::{Check, CheckOutcome};
use crate::validate::severity::Severity;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;

#[derive(Debug)]
pub struct ForeignKeyCheck {
    id: String,
    table: String,
    column: String,
    referenced_table: String,
    referenced_column: String,
    sample_key: String,
    sample_limit: usize,
    severity: Severity,
}

impl ForeignKeyCheck {
    pub fn new(
        table: &str,
        column: &str,
        referenced_table: &str,
        referenced_column: &str,
        sample_key: &str,
        sample_limit: usize,
        severity: Severity,
    ) -> Self {
        Self {
            id: format!("fk.{table}.{column}"),
            table: table.to_string(),
            column: column.to_string(),
            referenced_table: referenced_table.to_string(),
            referenced_column: referenced_column.to_string(),
            sample_key: sample_key.to_string(),
            sample_limit,
            severity,
        }
    }
}

#[async_trait]
impl Check for ForeignKeyCheck {
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
        // A LEFT JOIN leaves the dimension side null for both orphaned and
        // null fact keys, so one predicate covers both violation shapes.
        let join = format!(
            "FROM {fact} f LEFT JOIN {dim} d ON f.{fk} = d.{pk} WHERE d.{pk} IS NULL",
            fact = self.table,
            dim = self.referenced_table,
            fk = self.column,
            pk = self.referenced_column,
        );
        let count_sql = format!("SELECT COUNT(*) {join}");
        let sample_sql = format!(
            "SELECT CAST(f.{key} AS VARCHAR) {join} LIMIT {limit}",
            key = self.sample_key,
            limit = self.sample_limit,
        );
        count_violations(
            &self.id,
            ctx,
            &count_sql,
            &sample_sql,
            &format!(
                "rows in {} with unresolved {} against {}",
                self.table, self.column, self.referenced_table
            ),
        )
        .await
    }
}

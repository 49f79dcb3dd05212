//! Dataset freshness check: the newest timestamp in a column must fall
//! within a staleness window ending at the run's reference date.

use super::{collect_samples, scalar_count};
use crate::error::Result;
use crate::validate::check::{Check, CheckOutcome};
use crate::validate::severity::Severity;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use datafusion::prelude::SessionContext;

#[derive(Debug)]
pub struct FreshnessCheck {
    id: String,
    table: String,
    column: String,
    max_age_days: u32,
    as_of: NaiveDate,
    severity: Severity,
}

impl FreshnessCheck {
    pub fn new(
        table: &str,
        column: &str,
        max_age_days: u32,
        as_of: NaiveDate,
        severity: Severity,
    ) -> Self {
        Self {
            id: format!("freshness.{table}.{column}"),
            table: table.to_string(),
            column: column.to_string(),
            max_age_days,
            as_of,
            severity,
        }
    }
}

#[async_trait]
impl Check for FreshnessCheck {
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
        let present = scalar_count(
            &self.id,
            ctx,
            &format!(
                "SELECT COUNT({}) FROM {}",
                self.column, self.table
            ),
        )
        .await?;
        if present == 0 {
            return Ok(CheckOutcome::skipped(format!(
                "no {} values to assess",
                self.column
            )));
        }

        let cutoff = self.as_of - Duration::days(self.max_age_days as i64);
        let fresh = scalar_count(
            &self.id,
            ctx,
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} >= TIMESTAMP '{} 00:00:00'",
                self.table, self.column, cutoff
            ),
        )
        .await?;
        if fresh > 0 {
            return Ok(CheckOutcome::passed());
        }

        let latest = collect_samples(
            &self.id,
            ctx,
            &format!(
                "SELECT CAST(MAX({}) AS VARCHAR) FROM {}",
                self.column, self.table
            ),
        )
        .await?;
        // Zero fresh rows means every present timestamp is stale.
        Ok(CheckOutcome::failed(
            present,
            latest.clone(),
            format!(
                "newest {}.{} is {} which is older than {cutoff}",
                self.table,
                self.column,
                latest.first().map(String::as_str).unwrap_or("NULL"),
            ),
        ))
    }
}

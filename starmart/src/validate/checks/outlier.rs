//! Statistical outlier check on a numeric column.
//!
//! Flags values more than `sigmas` standard deviations from the column
//! mean. Skips when the column has no spread to measure.

use super::{count_violations, scalar_f64};
use crate::error::Result;
use crate::validate::check::{Check, CheckOutcome};
use crate::validate::severity::Severity;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;

#[derive(Debug)]
pub struct ZScoreOutlierCheck {
    id: String,
    table: String,
    column: String,
    sigmas: f64,
    sample_key: String,
    sample_limit: usize,
    severity: Severity,
}

impl ZScoreOutlierCheck {
    pub fn new(
        table: &str,
        column: &str,
        sigmas: f64,
        sample_key: &str,
        sample_limit: usize,
        severity: Severity,
    ) -> Self {
        Self {
            id: format!("outlier.{table}.{column}"),
            table: table.to_string(),
            column: column.to_string(),
            sigmas,
            sample_key: sample_key.to_string(),
            sample_limit,
            severity,
        }
    }
}

#[async_trait]
impl Check for ZScoreOutlierCheck {
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
        let stddev = scalar_f64(
            &self.id,
            ctx,
            &format!("SELECT STDDEV({}) FROM {}", self.column, self.table),
        )
        .await?;
        let stddev = match stddev {
            Some(s) if s > 0.0 => s,
            Some(_) => {
                return Ok(CheckOutcome::skipped(format!(
                    "{}.{} has no spread",
                    self.table, self.column
                )))
            }
            None => {
                return Ok(CheckOutcome::skipped(format!(
                    "too few {}.{} values for a deviation",
                    self.table, self.column
                )))
            }
        };
        let mean = scalar_f64(
            &self.id,
            ctx,
            &format!("SELECT AVG({}) FROM {}", self.column, self.table),
        )
        .await?
        .unwrap_or(0.0);

        let lo = mean - self.sigmas * stddev;
        let hi = mean + self.sigmas * stddev;
        let predicate = format!(
            "{col} IS NOT NULL AND ({col} < {lo} OR {col} > {hi})",
            col = self.column,
        );
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
                "values of {}.{} beyond {} standard deviations of the mean",
                self.table, self.column, self.sigmas
            ),
        )
        .await
    }
}

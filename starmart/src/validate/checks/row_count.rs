//! Table-level row count check.

use super::scalar_count;
use crate::error::Result;
use crate::validate::check::{Check, CheckOutcome};
use crate::validate::severity::Severity;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use std::fmt;

/// Predicate over a row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assertion {
    AtLeast(u64),
    AtMost(u64),
    Between(u64, u64),
    Exactly(u64),
}

impl Assertion {
    pub fn holds(&self, count: u64) -> bool {
        match self {
            Assertion::AtLeast(min) => count >= *min,
            Assertion::AtMost(max) => count <= *max,
            Assertion::Between(min, max) => count >= *min && count <= *max,
            Assertion::Exactly(expected) => count == *expected,
        }
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assertion::AtLeast(min) => write!(f, ">= {min}"),
            Assertion::AtMost(max) => write!(f, "<= {max}"),
            Assertion::Between(min, max) => write!(f, "in [{min}, {max}]"),
            Assertion::Exactly(expected) => write!(f, "== {expected}"),
        }
    }
}

#[derive(Debug)]
pub struct RowCountCheck {
    id: String,
    table: String,
    assertion: Assertion,
    severity: Severity,
}

impl RowCountCheck {
    pub fn new(table: &str, assertion: Assertion, severity: Severity) -> Self {
        Self {
            id: format!("row_count.{table}"),
            table: table.to_string(),
            assertion,
            severity,
        }
    }
}

#[async_trait]
impl Check for RowCountCheck {
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
        let count = scalar_count(
            &self.id,
            ctx,
            &format!("SELECT COUNT(*) FROM {}", self.table),
        )
        .await?;
        if self.assertion.holds(count) {
            Ok(CheckOutcome::passed())
        } else {
            Ok(CheckOutcome::failed(
                count,
                Vec::new(),
                format!(
                    "{} has {count} rows, expected {}",
                    self.table, self.assertion
                ),
            ))
        }
    }
}

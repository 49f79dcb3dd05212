//! The check abstraction every battery member implements.

use super::severity::Severity;
use crate::error::Result;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use serde::Serialize;
use std::fmt;

/// Terminal state of a single check evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Failed,
    /// The check could not be meaningfully evaluated, e.g. a statistic over
    /// too few rows. Skips never affect the verdict.
    Skipped,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Passed => write!(f, "passed"),
            CheckStatus::Failed => write!(f, "failed"),
            CheckStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// What a check found: status, how many rows offended and a bounded set of
/// offending key samples for the report.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub status: CheckStatus,
    pub affected_rows: u64,
    pub samples: Vec<String>,
    pub message: Option<String>,
}

impl CheckOutcome {
    pub fn passed() -> Self {
        Self {
            status: CheckStatus::Passed,
            affected_rows: 0,
            samples: Vec::new(),
            message: None,
        }
    }

    pub fn failed(affected_rows: u64, samples: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Failed,
            affected_rows,
            samples,
            message: Some(message.into()),
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Skipped,
            affected_rows: 0,
            samples: Vec::new(),
            message: Some(message.into()),
        }
    }
}

/// A single data-quality check evaluated against the registered tables.
///
/// Checks are pure readers: they query the session context and report, they
/// never mutate data. An `Err` from [`Check::evaluate`] means the check
/// itself broke (bad SQL, missing table) and aborts the battery; a data
/// defect is a `Failed` outcome, not an error.
#[async_trait]
pub trait Check: fmt::Debug + Send + Sync {
    /// Stable identifier, e.g. `completeness.dim_date.date_key`.
    fn id(&self) -> &str;

    /// Table the check reads.
    fn table(&self) -> &str;

    fn severity(&self) -> Severity;

    fn description(&self) -> Option<&str> {
        None
    }

    async fn evaluate(&self, ctx: &SessionContext) -> Result<CheckOutcome>;
}

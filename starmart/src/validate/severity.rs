use serde::{Deserialize, Serialize};
use std::fmt;

/// How a check failure affects the run verdict.
///
/// A failing critical check vetoes the commit; a failing advisory check is
/// reported and otherwise ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Advisory,
}

impl Severity {
    pub fn is_critical(&self) -> bool {
        matches!(self, Severity::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::Advisory => write!(f, "advisory"),
        }
    }
}

//! Convenience re-exports for pipeline embedders.
//!
//! ```rust,no_run
//! use starmart::prelude::*;
//!
//! # async fn run() -> Result<()> {
//! let config = PipelineConfig::new("data/raw", "data/processed");
//! let outcome = Pipeline::new(config).run().await?;
//! println!("committed: {}", outcome.committed);
//! # Ok(())
//! # }
//! ```

pub use crate::config::{PipelineConfig, ValidationConfig};
pub use crate::error::{EtlError, Result};
pub use crate::formatters::{HumanFormatter, JsonFormatter, ReportFormatter};
pub use crate::pipeline::{Pipeline, PipelineOutcome};
pub use crate::schema::{ColumnDef, SchemaRegistry, SemanticType, TableDef};
pub use crate::sources::{load_raw_tables, RawTable, RawTables};
pub use crate::table::{ProcessedTables, Table, Value};
pub use crate::transform::{IssueKind, TransformEngine, TransformIssue, TransformOutput};
pub use crate::validate::{
    Check, CheckOutcome, CheckRecord, CheckStatus, Severity, ValidationEngine, Verdict,
    VerdictReport,
};

//! # Starmart - Validated Star-Schema ETL
//!
//! Starmart turns raw CSV extracts of a sales domain into a typed star
//! schema and refuses to publish anything that fails its data-quality
//! battery. It leverages DataFusion for the SQL-based validation checks and
//! Arrow for the processed dataset representation.
//!
//! ## Overview
//!
//! A pipeline run has four stages:
//!
//! 1. **Load**: one raw CSV per table declared in the schema registry.
//! 2. **Transform**: per-cell type coercion, dimension enrichment, derived
//!    fact measures and foreign key resolution. Bad cells become logged
//!    issues, never panics.
//! 3. **Validate**: an ordered battery of checks (structure, completeness,
//!    uniqueness, referential integrity, ranges, business rules, freshness)
//!    runs over the candidate dataset and produces a verdict report.
//! 4. **Commit**: only a passing verdict publishes the dataset, via an
//!    atomic directory swap. A failing run leaves the previously published
//!    dataset untouched.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use starmart::prelude::*;
//! use starmart::formatters::{HumanFormatter, ReportFormatter};
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::new("data/raw", "data/processed");
//! let outcome = Pipeline::new(config).run().await?;
//!
//! let formatter = HumanFormatter::new();
//! println!("{}", formatter.format(&outcome.report)?);
//!
//! if !outcome.committed {
//!     for record in outcome.report.failures() {
//!         eprintln!("{}: {:?}", record.id, record.message);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The pieces compose individually as well: [`transform::TransformEngine`]
//! without validation, or [`validate::ValidationEngine`] against any
//! [`datafusion::prelude::SessionContext`] with the star tables registered.

pub mod config;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod pipeline;
pub mod prelude;
pub mod schema;
pub mod sources;
pub mod table;
pub mod transform;
pub mod validate;

pub use config::{PipelineConfig, ValidationConfig};
pub use error::{EtlError, Result};
pub use pipeline::{Pipeline, PipelineOutcome};
pub use validate::VerdictReport;

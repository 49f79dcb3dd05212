//! The pipeline orchestrator: load, transform, validate, commit.
//!
//! A run either commits a fully validated dataset or leaves the previously
//! published dataset untouched. The commit itself is a directory swap: the
//! new dataset is staged beside the target and renamed into place only
//! after every file is written.

use crate::config::PipelineConfig;
use crate::error::{EtlError, Result};
use crate::schema::SchemaRegistry;
use crate::sources::load_raw_tables;
use crate::table::ProcessedTables;
use crate::transform::{TransformEngine, TransformIssue};
use crate::validate::{ValidationEngine, VerdictReport};
use datafusion::prelude::SessionContext;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// What a pipeline run produced. The report is always present, even when
/// the verdict blocked the commit.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub report: VerdictReport,
    pub transform_issues: Vec<TransformIssue>,
    pub committed: bool,
}

#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Executes one full run.
    ///
    /// Validation always runs to completion so the report covers the whole
    /// battery; the verdict then decides whether the dataset is published.
    #[instrument(skip(self), fields(raw_dir = %self.config.raw_dir.display()))]
    pub async fn run(&self) -> Result<PipelineOutcome> {
        let registry = SchemaRegistry::star_schema();

        let raw = load_raw_tables(&self.config.raw_dir, registry)?;
        let engine = TransformEngine::new(registry);
        let output = engine.transform(raw)?;

        let ctx = SessionContext::new();
        output.tables.register(&ctx)?;

        let validator = ValidationEngine::battery(&self.config.validation);
        let report = validator.run(&ctx).await?;

        let committed = if report.passed() {
            commit(&output.tables, &self.config.processed_dir)?;
            info!(
                processed_dir = %self.config.processed_dir.display(),
                "Dataset committed"
            );
            true
        } else {
            warn!(
                critical_failures = report.metrics.critical_failures,
                "Verdict failed; leaving published dataset untouched"
            );
            false
        };

        Ok(PipelineOutcome {
            report,
            transform_issues: output.issues,
            committed,
        })
    }
}

fn staging_path(target: &Path) -> Result<PathBuf> {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| EtlError::Commit(format!("bad target directory {}", target.display())))?;
    Ok(target.with_file_name(format!("{name}.staging")))
}

/// Publishes the dataset by writing to a staging directory and swapping it
/// into place. Readers of the target directory never observe a half-written
/// dataset.
fn commit(tables: &ProcessedTables, target: &Path) -> Result<()> {
    let staging = staging_path(target)?;
    let retired = staging.with_extension("old");

    // Leftovers from a crashed run.
    if staging.exists() {
        std::fs::remove_dir_all(&staging)?;
    }
    if retired.exists() {
        std::fs::remove_dir_all(&retired)?;
    }

    if let Err(e) = tables.write_csv_dir(&staging) {
        let _ = std::fs::remove_dir_all(&staging);
        return Err(EtlError::Commit(format!("staging write failed: {e}")));
    }

    if target.exists() {
        if let Err(e) = std::fs::rename(target, &retired) {
            let _ = std::fs::remove_dir_all(&staging);
            return Err(EtlError::Commit(format!("could not retire old dataset: {e}")));
        }
    }
    if let Err(e) = std::fs::rename(&staging, target) {
        // Put the old dataset back before bailing.
        if retired.exists() {
            let _ = std::fs::rename(&retired, target);
        }
        let _ = std::fs::remove_dir_all(&staging);
        return Err(EtlError::Commit(format!("swap failed: {e}")));
    }
    if retired.exists() {
        std::fs::remove_dir_all(&retired)?;
    }
    Ok(())
}

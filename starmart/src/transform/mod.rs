//! The transform engine: raw extracts in, star-schema tables out.
//!
//! Per table, in dependency order (dimensions before the fact table):
//!
//! 1. **Type coercion** against the schema registry. A bad cell becomes a
//!    row-scoped issue, never an abort; only a missing required column or a
//!    wholly malformed surrogate key column is fatal.
//! 2. **Enrichment** of derived dimension attributes (margin bands, calendar
//!    labels, name normalization).
//! 3. **Fact derivation**: every derived measure is recomputed from raw
//!    inputs; raw-supplied values are overwritten, never trusted.
//! 4. **FK resolution**: unresolved lookups are recorded and the row is
//!    retained; the validation engine rejects, the transform only surfaces.

pub mod coerce;
mod dimensions;
mod fact;

use crate::error::{EtlError, Result};
use crate::schema::{SchemaRegistry, TableDef};
use crate::sources::{RawTable, RawTables};
use crate::table::{ProcessedTables, Row, Table};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Classification of a row-scoped transform issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A raw value could not be cast to its declared type.
    Coercion,
    /// A required measure was null; the row was excluded from output.
    NullMeasure,
    /// A duplicate primary key; the later row was excluded.
    Duplicate,
    /// A foreign key did not resolve; the row was retained for validation
    /// to reject.
    ForeignKey,
}

/// One row-scoped issue recorded during transformation.
#[derive(Debug, Clone, Serialize)]
pub struct TransformIssue {
    pub table: String,
    /// Index of the offending row within its table at the time of detection.
    pub row: usize,
    pub column: Option<String>,
    pub kind: IssueKind,
    pub detail: String,
}

impl TransformIssue {
    fn new(
        table: &str,
        row: usize,
        column: Option<&str>,
        kind: IssueKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            table: table.to_string(),
            row,
            column: column.map(str::to_string),
            kind,
            detail: detail.into(),
        }
    }
}

/// Result of a transform run: the candidate processed dataset plus the log
/// of row-scoped issues encountered while building it.
#[derive(Debug)]
pub struct TransformOutput {
    pub tables: ProcessedTables,
    pub issues: Vec<TransformIssue>,
}

impl TransformOutput {
    /// Issues of a given kind, for reporting and tests.
    pub fn issues_of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &TransformIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }
}

/// Transforms raw tables into the processed star schema.
#[derive(Debug)]
pub struct TransformEngine<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> TransformEngine<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Runs the full transform over every registry table.
    ///
    /// Raw tables must be present for every declared table; a missing table
    /// is fatal. Row-scoped defects land in the issue log instead.
    #[instrument(skip(self, raw), fields(tables = self.registry.tables().len()))]
    pub fn transform(&self, raw: RawTables) -> Result<TransformOutput> {
        let mut processed = ProcessedTables::new();
        let mut issues = Vec::new();

        for def in self.registry.tables() {
            let raw_table = raw.get(&def.name).ok_or_else(|| {
                EtlError::schema(&def.name, "table missing from raw input")
            })?;

            let mut table = coerce_table(def, raw_table, &mut issues)?;

            match def.name.as_str() {
                "dim_date" => dimensions::enrich_dim_date(&mut table, &mut issues)?,
                "dim_product" => dimensions::enrich_dim_product(&mut table, &mut issues)?,
                "dim_customer" => dimensions::enrich_dim_customer(&mut table)?,
                "fact_sales" => fact::derive_fact_sales(&mut table, &processed, &mut issues)?,
                _ => {}
            }

            info!(
                table = %def.name,
                rows_in = raw_table.len(),
                rows_out = table.len(),
                "Transformed table"
            );
            processed.insert(table);
        }

        if !issues.is_empty() {
            warn!(issue_count = issues.len(), "Transform completed with row-scoped issues");
        }

        Ok(TransformOutput {
            tables: processed,
            issues,
        })
    }
}

/// Coerces a raw table into a typed one, recording per-cell failures.
///
/// Rows whose primary key fails coercion are excluded but counted. A primary
/// key column in which every value fails to coerce is a fatal schema error.
fn coerce_table(
    def: &TableDef,
    raw: &RawTable,
    issues: &mut Vec<TransformIssue>,
) -> Result<Table> {
    // Every non-derived column must be present in the extract.
    for col in &def.columns {
        if !col.derived && raw.header_index(&col.name).is_none() {
            return Err(EtlError::schema(
                &def.name,
                format!("required column '{}' missing from raw extract", col.name),
            ));
        }
    }

    let header_indexes: Vec<Option<usize>> = def
        .columns
        .iter()
        .map(|c| raw.header_index(&c.name))
        .collect();
    let pk_index = def.primary_key.as_deref().and_then(|pk| def.column_index(pk));

    let mut table = Table::new(def.clone());
    let mut pk_failures = 0usize;

    for (row_idx, record) in raw.records.iter().enumerate() {
        let mut row: Row = Vec::with_capacity(def.columns.len());
        let mut drop_row = false;

        for (col_idx, col) in def.columns.iter().enumerate() {
            let cell = match header_indexes[col_idx] {
                Some(h) => record.get(h).map(String::as_str).unwrap_or(""),
                None => "",
            };

            match coerce::coerce(cell, col.semantic_type) {
                Ok(value) => row.push(value),
                Err(reason) => {
                    issues.push(TransformIssue::new(
                        &def.name,
                        row_idx,
                        Some(&col.name),
                        IssueKind::Coercion,
                        reason,
                    ));
                    if Some(col_idx) == pk_index {
                        pk_failures += 1;
                        drop_row = true;
                    }
                    row.push(None);
                }
            }
        }

        if !drop_row {
            table.push_row(row);
        }
    }

    if !raw.is_empty() && pk_failures == raw.len() {
        return Err(EtlError::schema(
            &def.name,
            "surrogate key column is wholly malformed",
        ));
    }

    Ok(table)
}

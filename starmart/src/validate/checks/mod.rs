//! The concrete check implementations and shared SQL plumbing.
//!
//! All row-level checks follow the same shape: one aggregate query counts
//! violating rows, and on failure a second bounded query collects sample
//! keys for the report. Sample values are rendered to text whatever the
//! column type, so every check shares a single result path.

pub mod completeness;
pub mod containment;
pub mod expression;
pub mod foreign_key;
pub mod freshness;
pub mod outlier;
pub mod range;
pub mod row_count;
pub mod schema_conformance;
pub mod uniqueness;

use crate::error::{EtlError, Result};
use crate::validate::check::CheckOutcome;
use arrow::array::{Array, Float64Array, Int64Array};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use datafusion::prelude::SessionContext;

async fn run_sql(check: &str, ctx: &SessionContext, sql: &str) -> Result<Vec<RecordBatch>> {
    let df = ctx
        .sql(sql)
        .await
        .map_err(|e| EtlError::check_evaluation(check, format!("query failed: {e}")))?;
    df.collect()
        .await
        .map_err(|e| EtlError::check_evaluation(check, format!("collect failed: {e}")))
}

/// Runs a single-value COUNT query.
pub(crate) async fn scalar_count(check: &str, ctx: &SessionContext, sql: &str) -> Result<u64> {
    let batches = run_sql(check, ctx, sql).await?;
    let batch = batches
        .first()
        .ok_or_else(|| EtlError::check_evaluation(check, "count query returned no batches"))?;
    let counts = batch
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| EtlError::check_evaluation(check, "count column is not Int64"))?;
    Ok(counts.value(0) as u64)
}

/// Runs a single-value aggregate query yielding a nullable float, e.g.
/// STDDEV over a possibly-empty table.
pub(crate) async fn scalar_f64(
    check: &str,
    ctx: &SessionContext,
    sql: &str,
) -> Result<Option<f64>> {
    let batches = run_sql(check, ctx, sql).await?;
    let batch = batches
        .first()
        .ok_or_else(|| EtlError::check_evaluation(check, "aggregate query returned no batches"))?;
    let values = batch
        .column(0)
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| EtlError::check_evaluation(check, "aggregate column is not Float64"))?;
    if values.is_empty() || values.is_null(0) {
        Ok(None)
    } else {
        Ok(Some(values.value(0)))
    }
}

/// Collects sample key values from a bounded query, rendering the first
/// column to text. Casts to VARCHAR may surface as plain or view-backed
/// string arrays depending on the plan, so decoding goes through the
/// generic display path rather than a concrete array downcast.
pub(crate) async fn collect_samples(
    check: &str,
    ctx: &SessionContext,
    sql: &str,
) -> Result<Vec<String>> {
    let batches = run_sql(check, ctx, sql).await?;
    let mut samples = Vec::new();
    for batch in &batches {
        let column = batch.column(0);
        for i in 0..column.len() {
            if column.is_null(i) {
                samples.push("NULL".to_string());
            } else {
                let rendered = array_value_to_string(column, i).map_err(|e| {
                    EtlError::check_evaluation(check, format!("sample render failed: {e}"))
                })?;
                samples.push(rendered);
            }
        }
    }
    Ok(samples)
}

/// Shared evaluation path for row-level checks: count violations and, on
/// failure, collect sample keys.
pub(crate) async fn count_violations(
    check: &str,
    ctx: &SessionContext,
    count_sql: &str,
    sample_sql: &str,
    describe: &str,
) -> Result<CheckOutcome> {
    let violations = scalar_count(check, ctx, count_sql).await?;
    if violations == 0 {
        return Ok(CheckOutcome::passed());
    }
    let samples = collect_samples(check, ctx, sample_sql).await?;
    Ok(CheckOutcome::failed(
        violations,
        samples,
        format!("{violations} {describe}"),
    ))
}

/// Escapes a string literal for inclusion in a SQL IN list.
pub(crate) fn sql_string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

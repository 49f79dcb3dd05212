//! Dimension enrichment rules.
//!
//! Each function mutates a coerced table in place: derived attributes are
//! recomputed from their source columns, noisy text is normalized, and rows
//! the star schema cannot serve (duplicate keys, unpriced products) are
//! excluded with an issue-log entry.

use super::{IssueKind, TransformIssue};
use crate::error::{EtlError, Result};
use crate::table::{Table, Value};
use std::collections::HashSet;
use tracing::warn;

/// Margin band label for a product margin percentage.
///
/// Bands are half-open on the left: (0, 20] is Low, (20, 40] Medium,
/// (40, 60] High, (60, 100] Premium. Non-positive or >100% margins get no
/// band and are left for validation to flag.
fn margin_band(margin_pct: f64) -> Option<&'static str> {
    if margin_pct <= 0.0 || margin_pct > 100.0 {
        None
    } else if margin_pct <= 20.0 {
        Some("Low (<20%)")
    } else if margin_pct <= 40.0 {
        Some("Medium (20-40%)")
    } else if margin_pct <= 60.0 {
        Some("High (40-60%)")
    } else {
        Some("Premium (>60%)")
    }
}

/// Canonical spelling of a customer segment for the variants upstream
/// systems emit. Unknown values pass through for the containment check.
fn standardize_segment(raw: &str) -> String {
    match raw.trim().to_ascii_lowercase().as_str() {
        "enterprise" | "ent" => "Enterprise".to_string(),
        "mid-market" | "midmarket" | "mid market" => "Mid-Market".to_string(),
        "smb" | "small business" | "small-business" => "SMB".to_string(),
        "startup" | "start-up" => "Startup".to_string(),
        _ => raw.trim().to_string(),
    }
}

/// Title-cases each whitespace-separated word.
fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Deduplicates on `date_key` (first occurrence wins) and recomputes the
/// calendar labels from `full_date`.
pub(super) fn enrich_dim_date(table: &mut Table, issues: &mut Vec<TransformIssue>) -> Result<()> {
    let def = table.def().clone();
    let col = |name: &str| {
        def.column_index(name)
            .ok_or_else(|| EtlError::schema("dim_date", format!("no column '{name}'")))
    };
    let key_idx = col("date_key")?;
    let date_idx = col("full_date")?;
    let dow_idx = col("day_of_week")?;
    let month_name_idx = col("month_name")?;
    let fiscal_idx = col("fiscal_period")?;

    let mut seen: HashSet<i64> = HashSet::new();
    let mut row_idx = 0usize;
    let mut dropped = 0usize;
    table.rows_mut().retain_mut(|row| {
        let idx = row_idx;
        row_idx += 1;

        if let Some(key) = row[key_idx].as_ref().and_then(Value::as_i64) {
            if !seen.insert(key) {
                issues.push(TransformIssue::new(
                    "dim_date",
                    idx,
                    Some("date_key"),
                    IssueKind::Duplicate,
                    format!("duplicate date_key {key}"),
                ));
                dropped += 1;
                return false;
            }
        }

        if let Some(date) = row[date_idx].as_ref().and_then(Value::as_date) {
            row[dow_idx] = Some(Value::Str(date.format("%A").to_string()));
            row[month_name_idx] = Some(Value::Str(date.format("%B").to_string()));
            row[fiscal_idx] = Some(Value::Str(date.format("FY%Y-P%m").to_string()));
        }
        true
    });

    if dropped > 0 {
        warn!(table = "dim_date", dropped, "Dropped duplicate calendar rows");
    }
    Ok(())
}

/// Drops unpriced products and derives the margin band from cost and list
/// price.
pub(super) fn enrich_dim_product(
    table: &mut Table,
    issues: &mut Vec<TransformIssue>,
) -> Result<()> {
    let def = table.def().clone();
    let col = |name: &str| {
        def.column_index(name)
            .ok_or_else(|| EtlError::schema("dim_product", format!("no column '{name}'")))
    };
    let cost_idx = col("unit_cost")?;
    let price_idx = col("list_price")?;
    let band_idx = col("margin_band")?;

    let mut row_idx = 0usize;
    let mut dropped = 0usize;
    table.rows_mut().retain_mut(|row| {
        let idx = row_idx;
        row_idx += 1;

        let cost = row[cost_idx].as_ref().and_then(Value::as_f64);
        let price = row[price_idx].as_ref().and_then(Value::as_f64);
        let (cost, price) = match (cost, price) {
            (Some(c), Some(p)) => (c, p),
            _ => {
                issues.push(TransformIssue::new(
                    "dim_product",
                    idx,
                    None,
                    IssueKind::NullMeasure,
                    "missing unit_cost or list_price",
                ));
                dropped += 1;
                return false;
            }
        };

        row[band_idx] = if price > 0.0 {
            margin_band((price - cost) / price * 100.0)
                .map(|b| Value::Str(b.to_string()))
        } else {
            None
        };
        true
    });

    if dropped > 0 {
        warn!(table = "dim_product", dropped, "Dropped products with missing prices");
    }
    Ok(())
}

/// Normalizes customer names and segment spellings.
pub(super) fn enrich_dim_customer(table: &mut Table) -> Result<()> {
    let def = table.def().clone();
    let col = |name: &str| {
        def.column_index(name)
            .ok_or_else(|| EtlError::schema("dim_customer", format!("no column '{name}'")))
    };
    let name_idx = col("customer_name")?;
    let segment_idx = col("segment")?;

    for row in table.rows_mut() {
        if let Some(Value::Str(name)) = &row[name_idx] {
            let normalized = title_case(name);
            row[name_idx] = Some(Value::Str(normalized));
        }
        if let Some(Value::Str(segment)) = &row[segment_idx] {
            let canonical = standardize_segment(segment);
            row[segment_idx] = Some(Value::Str(canonical));
        }
    }
    Ok(())
}

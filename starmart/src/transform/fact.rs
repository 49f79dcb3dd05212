//! Fact derivation and foreign key resolution.
//!
//! Derived measures are always recomputed from the raw inputs; any value the
//! extract supplied for a derived column was overwritten by the coercion
//! step mapping and is rebuilt here. Rows missing a core measure are
//! excluded. Rows with unresolved foreign keys are kept so the validation
//! engine can reject the dataset with evidence.

use super::{IssueKind, TransformIssue};
use crate::error::{EtlError, Result};
use crate::table::{ProcessedTables, Table, Value};
use std::collections::HashSet;
use tracing::warn;

/// Rounds to two decimal places, away from zero on ties.
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Set of surrogate keys present in a dimension.
fn key_set(dims: &ProcessedTables, table: &str, key: &str) -> Result<HashSet<i64>> {
    let dim = dims
        .get(table)
        .ok_or_else(|| EtlError::schema(table, "dimension not yet transformed"))?;
    let idx = dim
        .def()
        .column_index(key)
        .ok_or_else(|| EtlError::schema(table, format!("no column '{key}'")))?;
    Ok(dim
        .rows()
        .iter()
        .filter_map(|r| r[idx].as_ref().and_then(Value::as_i64))
        .collect())
}

/// Foreign key columns of the fact table and the dimension each resolves
/// against.
const FACT_FOREIGN_KEYS: &[(&str, &str)] = &[
    ("date_key", "dim_date"),
    ("product_key", "dim_product"),
    ("customer_key", "dim_customer"),
    ("region_key", "dim_region"),
    ("employee_key", "dim_employee"),
];

pub(super) fn derive_fact_sales(
    table: &mut Table,
    dims: &ProcessedTables,
    issues: &mut Vec<TransformIssue>,
) -> Result<()> {
    let def = table.def().clone();
    let col = |name: &str| {
        def.column_index(name)
            .ok_or_else(|| EtlError::schema("fact_sales", format!("no column '{name}'")))
    };

    let qty_idx = col("quantity")?;
    let price_idx = col("unit_price")?;
    let disc_idx = col("discount_pct")?;
    let cogs_idx = col("cogs")?;
    let target_idx = col("target_amount")?;
    let status_idx = col("order_status")?;
    let sales_idx = col("sales_amount")?;
    let gm_idx = col("gross_margin")?;
    let gm_pct_idx = col("gross_margin_pct")?;
    let attain_idx = col("target_attainment_pct")?;
    let impact_idx = col("discount_impact")?;
    let eligible_idx = col("is_revenue_eligible")?;

    let fk_sets: Vec<(usize, &str, HashSet<i64>)> = FACT_FOREIGN_KEYS
        .iter()
        .map(|(fk, dim)| Ok((col(fk)?, *dim, key_set(dims, dim, fk)?)))
        .collect::<Result<_>>()?;

    let mut row_idx = 0usize;
    let mut dropped = 0usize;
    table.rows_mut().retain_mut(|row| {
        let idx = row_idx;
        row_idx += 1;

        let qty = row[qty_idx].as_ref().and_then(Value::as_f64);
        let price = row[price_idx].as_ref().and_then(Value::as_f64);
        let disc = row[disc_idx].as_ref().and_then(Value::as_f64);
        let cogs = row[cogs_idx].as_ref().and_then(Value::as_f64);
        let (qty, price, disc, cogs) = match (qty, price, disc, cogs) {
            (Some(q), Some(p), Some(d), Some(c)) => (q, p, d, c),
            _ => {
                issues.push(TransformIssue::new(
                    "fact_sales",
                    idx,
                    None,
                    IssueKind::NullMeasure,
                    "missing quantity, unit_price, discount_pct or cogs",
                ));
                dropped += 1;
                return false;
            }
        };

        let sales_amount = round2(qty * price * (1.0 - disc));
        let gross_margin = round2(sales_amount - cogs);
        row[sales_idx] = Some(Value::Float(sales_amount));
        row[gm_idx] = Some(Value::Float(gross_margin));

        // A zero-value sale has no meaningful margin percentage.
        row[gm_pct_idx] = if sales_amount == 0.0 {
            None
        } else {
            Some(Value::Float(round2(gross_margin / sales_amount * 100.0)))
        };

        row[attain_idx] = match row[target_idx].as_ref().and_then(Value::as_f64) {
            Some(target) if target != 0.0 => {
                Some(Value::Float(round2(sales_amount / target * 100.0)))
            }
            _ => None,
        };

        row[impact_idx] = Some(Value::Float(round2(qty * price * disc)));

        let cancelled = row[status_idx]
            .as_ref()
            .and_then(Value::as_str)
            .map(|s| s == "Cancelled")
            .unwrap_or(false);
        row[eligible_idx] = Some(Value::Bool(!cancelled));

        for (fk_idx, dim, keys) in &fk_sets {
            if let Some(key) = row[*fk_idx].as_ref().and_then(Value::as_i64) {
                if !keys.contains(&key) {
                    issues.push(TransformIssue::new(
                        "fact_sales",
                        idx,
                        Some(def.columns[*fk_idx].name.as_str()),
                        IssueKind::ForeignKey,
                        format!("key {key} not found in {dim}"),
                    ));
                }
            }
        }
        true
    });

    if dropped > 0 {
        warn!(
            table = "fact_sales",
            dropped, "Dropped fact rows with missing core measures"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;
    use crate::table::Row;

    fn table_for(name: &str) -> Table {
        let def = SchemaRegistry::star_schema().table(name).unwrap().clone();
        Table::new(def)
    }

    fn dim_with_keys(name: &str, key: &str, keys: &[i64]) -> Table {
        let mut table = table_for(name);
        let def = table.def().clone();
        let idx = def.column_index(key).unwrap();
        for k in keys {
            let mut row: Row = vec![None; def.columns.len()];
            row[idx] = Some(Value::Int(*k));
            table.push_row(row);
        }
        table
    }

    fn dims() -> ProcessedTables {
        let mut dims = ProcessedTables::new();
        dims.insert(dim_with_keys("dim_date", "date_key", &[20240105]));
        dims.insert(dim_with_keys("dim_product", "product_key", &[7]));
        dims.insert(dim_with_keys("dim_customer", "customer_key", &[3]));
        dims.insert(dim_with_keys("dim_region", "region_key", &[2]));
        dims.insert(dim_with_keys("dim_employee", "employee_key", &[11]));
        dims
    }

    fn fact_row(table: &Table, cells: &[(&str, Value)]) -> Row {
        let def = table.def();
        let mut row: Row = vec![None; def.columns.len()];
        for (name, value) in cells {
            row[def.column_index(name).unwrap()] = Some(value.clone());
        }
        row
    }

    fn base_cells() -> Vec<(&'static str, Value)> {
        vec![
            ("sales_key", Value::Int(1)),
            ("order_id", Value::Str("ORD-1001".to_string())),
            ("date_key", Value::Int(20240105)),
            ("product_key", Value::Int(7)),
            ("customer_key", Value::Int(3)),
            ("region_key", Value::Int(2)),
            ("employee_key", Value::Int(11)),
            ("quantity", Value::Int(5)),
            ("unit_price", Value::Float(1350.0)),
            ("discount_pct", Value::Float(0.10)),
            ("cogs", Value::Float(4250.0)),
            ("target_amount", Value::Float(6000.0)),
            ("order_status", Value::Str("Delivered".to_string())),
        ]
    }

    #[test]
    fn test_derived_measures_worked_example() {
        let mut table = table_for("fact_sales");
        let row = fact_row(&table, &base_cells());
        table.push_row(row);

        let mut issues = Vec::new();
        derive_fact_sales(&mut table, &dims(), &mut issues).unwrap();

        assert!(issues.is_empty());
        let read = |c: &str| table.value(0, c).and_then(Value::as_f64).unwrap();
        assert_eq!(read("sales_amount"), 6075.00);
        assert_eq!(read("gross_margin"), 1825.00);
        assert_eq!(read("gross_margin_pct"), 30.04);
        assert_eq!(read("target_attainment_pct"), 101.25);
        assert_eq!(read("discount_impact"), 675.00);
        assert_eq!(
            table.value(0, "is_revenue_eligible"),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn test_cancelled_order_not_revenue_eligible() {
        let mut table = table_for("fact_sales");
        let mut cells = base_cells();
        for cell in cells.iter_mut() {
            if cell.0 == "order_status" {
                cell.1 = Value::Str("Cancelled".to_string());
            }
        }
        table.push_row(fact_row(&table, &cells));

        let mut issues = Vec::new();
        derive_fact_sales(&mut table, &dims(), &mut issues).unwrap();
        assert_eq!(
            table.value(0, "is_revenue_eligible"),
            Some(&Value::Bool(false))
        );
    }

    #[test]
    fn test_zero_sale_has_null_margin_pct() {
        let mut table = table_for("fact_sales");
        let mut cells = base_cells();
        for cell in cells.iter_mut() {
            if cell.0 == "quantity" {
                cell.1 = Value::Int(0);
            }
        }
        table.push_row(fact_row(&table, &cells));

        let mut issues = Vec::new();
        derive_fact_sales(&mut table, &dims(), &mut issues).unwrap();
        assert_eq!(
            table.value(0, "sales_amount"),
            Some(&Value::Float(0.0))
        );
        assert!(table.value(0, "gross_margin_pct").is_none());
    }

    #[test]
    fn test_zero_target_has_null_attainment() {
        let mut table = table_for("fact_sales");
        let mut cells = base_cells();
        for cell in cells.iter_mut() {
            if cell.0 == "target_amount" {
                cell.1 = Value::Float(0.0);
            }
        }
        table.push_row(fact_row(&table, &cells));

        let mut issues = Vec::new();
        derive_fact_sales(&mut table, &dims(), &mut issues).unwrap();
        assert!(table.value(0, "target_attainment_pct").is_none());
    }

    #[test]
    fn test_null_measure_row_dropped() {
        let mut table = table_for("fact_sales");
        let cells: Vec<_> = base_cells()
            .into_iter()
            .filter(|(name, _)| *name != "cogs")
            .collect();
        table.push_row(fact_row(&table, &cells));

        let mut issues = Vec::new();
        derive_fact_sales(&mut table, &dims(), &mut issues).unwrap();
        assert!(table.is_empty());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::NullMeasure);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn derive_one(qty: i64, price: f64, disc: f64, cogs: f64) -> Table {
            let mut table = table_for("fact_sales");
            let mut cells = base_cells();
            for cell in cells.iter_mut() {
                match cell.0 {
                    "quantity" => cell.1 = Value::Int(qty),
                    "unit_price" => cell.1 = Value::Float(price),
                    "discount_pct" => cell.1 = Value::Float(disc),
                    "cogs" => cell.1 = Value::Float(cogs),
                    _ => {}
                }
            }
            table.push_row(fact_row(&table, &cells));
            let mut issues = Vec::new();
            derive_fact_sales(&mut table, &dims(), &mut issues).unwrap();
            table
        }

        proptest! {
            #[test]
            fn derived_measures_are_consistent(
                qty in 0i64..1000,
                price in 0.01f64..10_000.0,
                disc in 0.0f64..1.0,
                cogs in 0.0f64..100_000.0,
            ) {
                let table = derive_one(qty, price, disc, cogs);
                let get = |c: &str| table.value(0, c).and_then(Value::as_f64);

                let sales = get("sales_amount").unwrap();
                let margin = get("gross_margin").unwrap();
                let impact = get("discount_impact").unwrap();

                prop_assert!(sales >= 0.0);
                prop_assert_eq!(margin, round2(sales - cogs));
                // Discounted and retained revenue add back to list revenue,
                // up to the two independent roundings.
                prop_assert!((sales + impact - qty as f64 * price).abs() <= 0.021);
            }

            #[test]
            fn margin_pct_is_null_exactly_on_zero_sales(
                qty in 0i64..10,
                price in 0.01f64..100.0,
                cogs in 0.0f64..1000.0,
            ) {
                // Full discount or zero quantity produce a zero-value sale.
                let table = derive_one(qty, price, 1.0, cogs);
                prop_assert!(table.value(0, "gross_margin_pct").is_none());

                let table = derive_one(qty, price, 0.0, cogs);
                let sales = table.value(0, "sales_amount").and_then(Value::as_f64).unwrap();
                prop_assert_eq!(
                    table.value(0, "gross_margin_pct").is_none(),
                    sales == 0.0
                );
            }
        }
    }

    #[test]
    fn test_orphan_foreign_key_retained_and_tagged() {
        let mut table = table_for("fact_sales");
        let mut cells = base_cells();
        for cell in cells.iter_mut() {
            if cell.0 == "product_key" {
                cell.1 = Value::Int(999);
            }
        }
        table.push_row(fact_row(&table, &cells));

        let mut issues = Vec::new();
        derive_fact_sales(&mut table, &dims(), &mut issues).unwrap();

        // Row stays; the orphan is evidence for the validation engine.
        assert_eq!(table.len(), 1);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::ForeignKey);
        assert_eq!(issues[0].column.as_deref(), Some("product_key"));
    }
}

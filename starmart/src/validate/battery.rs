//! Assembly of the ordered check battery.
//!
//! Structural checks come first, then registry-driven row checks per table
//! in dependency order, then the fact-specific business rules, and finally
//! the advisory dataset-level checks. Evaluation order is the report order.

use super::check::Check;
use super::checks::completeness::CompletenessCheck;
use super::checks::containment::ContainmentCheck;
use super::checks::expression::ExpressionCheck;
use super::checks::foreign_key::ForeignKeyCheck;
use super::checks::freshness::FreshnessCheck;
use super::checks::outlier::ZScoreOutlierCheck;
use super::checks::range::RangeCheck;
use super::checks::row_count::{Assertion, RowCountCheck};
use super::checks::schema_conformance::SchemaConformanceCheck;
use super::checks::uniqueness::UniquenessCheck;
use super::severity::Severity;
use crate::config::ValidationConfig;
use crate::schema::{SchemaRegistry, TableDef};

/// Tolerance when re-deriving monetary measures in SQL.
const DERIVED_TOLERANCE: f64 = 0.01;

/// Fact foreign keys and the dimension each must resolve against.
const FACT_FOREIGN_KEYS: &[(&str, &str)] = &[
    ("date_key", "dim_date"),
    ("product_key", "dim_product"),
    ("customer_key", "dim_customer"),
    ("region_key", "dim_region"),
    ("employee_key", "dim_employee"),
];

/// Builds the full battery for the star schema.
pub fn build_battery(registry: &SchemaRegistry, config: &ValidationConfig) -> Vec<Box<dyn Check>> {
    let n = config.sample_limit;
    let mut checks: Vec<Box<dyn Check>> = Vec::new();

    for def in registry.tables() {
        checks.push(Box::new(SchemaConformanceCheck::new(
            &def.name,
            def.arrow_schema(),
        )));
    }

    for def in registry.tables() {
        push_registry_checks(&mut checks, def, n);
        match def.name.as_str() {
            "dim_date" => push_dim_date_checks(&mut checks, n),
            "dim_product" => push_dim_product_checks(&mut checks, n),
            "fact_sales" => push_fact_checks(&mut checks, config),
            _ => {}
        }
    }

    checks
}

/// Completeness for every required column, uniqueness for the primary key,
/// containment for every enumerated column. All driven by the registry.
fn push_registry_checks(checks: &mut Vec<Box<dyn Check>>, def: &TableDef, n: usize) {
    let sample_key = def.primary_key.as_deref().unwrap_or(&def.columns[0].name);

    for col in &def.columns {
        if !col.nullable {
            checks.push(Box::new(CompletenessCheck::new(
                &def.name,
                &col.name,
                sample_key,
                n,
                Severity::Critical,
            )));
        }
    }

    if let Some(pk) = def.primary_key.as_deref() {
        checks.push(Box::new(UniquenessCheck::new(
            &def.name,
            pk,
            n,
            Severity::Critical,
        )));
    }

    for col in &def.columns {
        if let Some(allowed) = &col.allowed_values {
            checks.push(Box::new(ContainmentCheck::new(
                &def.name,
                &col.name,
                allowed.iter().cloned(),
                n,
                Severity::Critical,
            )));
        }
    }
}

fn push_dim_date_checks(checks: &mut Vec<Box<dyn Check>>, n: usize) {
    checks.push(Box::new(RangeCheck::between(
        "dim_date", "month_number", 1.0, 12.0, "date_key", n, Severity::Critical,
    )));
    checks.push(Box::new(RangeCheck::between(
        "dim_date", "day_of_month", 1.0, 31.0, "date_key", n, Severity::Critical,
    )));
    checks.push(Box::new(RangeCheck::between(
        "dim_date", "year", 2000.0, 2030.0, "date_key", n, Severity::Critical,
    )));
}

fn push_dim_product_checks(checks: &mut Vec<Box<dyn Check>>, n: usize) {
    checks.push(Box::new(RangeCheck::at_least(
        "dim_product", "unit_cost", 0.0, "product_key", n, Severity::Critical,
    )));
    checks.push(Box::new(RangeCheck::at_least(
        "dim_product", "list_price", 0.0, "product_key", n, Severity::Critical,
    )));
    checks.push(Box::new(ExpressionCheck::new(
        "rule.dim_product.price_below_cost",
        "dim_product",
        "list_price IS NOT NULL AND unit_cost IS NOT NULL AND list_price < unit_cost",
        "list price covers unit cost",
        "product_key",
        n,
        Severity::Advisory,
    )));
}

fn push_fact_checks(checks: &mut Vec<Box<dyn Check>>, config: &ValidationConfig) {
    let n = config.sample_limit;

    for (fk, dim) in FACT_FOREIGN_KEYS {
        checks.push(Box::new(ForeignKeyCheck::new(
            "fact_sales",
            fk,
            dim,
            fk,
            "sales_key",
            n,
            Severity::Critical,
        )));
    }

    checks.push(Box::new(RangeCheck::at_least(
        "fact_sales", "quantity", 1.0, "sales_key", n, Severity::Critical,
    )));
    checks.push(Box::new(RangeCheck::at_least(
        "fact_sales", "unit_price", 0.01, "sales_key", n, Severity::Critical,
    )));
    checks.push(Box::new(RangeCheck::between(
        "fact_sales", "discount_pct", 0.0, 1.0, "sales_key", n, Severity::Critical,
    )));
    checks.push(Box::new(RangeCheck::at_least(
        "fact_sales", "sales_amount", 0.0, "sales_key", n, Severity::Critical,
    )));
    checks.push(Box::new(RangeCheck::at_least(
        "fact_sales", "cogs", 0.0, "sales_key", n, Severity::Critical,
    )));

    checks.push(Box::new(ExpressionCheck::new(
        "derived.fact_sales.sales_amount",
        "fact_sales",
        format!(
            "sales_amount IS NOT NULL AND quantity IS NOT NULL AND \
             unit_price IS NOT NULL AND discount_pct IS NOT NULL AND \
             ABS(sales_amount - quantity * unit_price * (1 - discount_pct)) > {DERIVED_TOLERANCE}"
        ),
        "sales_amount equals quantity * unit_price * (1 - discount_pct)",
        "sales_key",
        n,
        Severity::Critical,
    )));
    checks.push(Box::new(ExpressionCheck::new(
        "derived.fact_sales.gross_margin",
        "fact_sales",
        format!(
            "gross_margin IS NOT NULL AND sales_amount IS NOT NULL AND cogs IS NOT NULL AND \
             ABS(gross_margin - (sales_amount - cogs)) > {DERIVED_TOLERANCE}"
        ),
        "gross_margin equals sales_amount - cogs",
        "sales_key",
        n,
        Severity::Critical,
    )));
    checks.push(Box::new(ExpressionCheck::new(
        "derived.fact_sales.discount_impact",
        "fact_sales",
        format!(
            "discount_impact IS NOT NULL AND quantity IS NOT NULL AND \
             unit_price IS NOT NULL AND discount_pct IS NOT NULL AND \
             ABS(discount_impact - quantity * unit_price * discount_pct) > {DERIVED_TOLERANCE}"
        ),
        "discount_impact equals quantity * unit_price * discount_pct",
        "sales_key",
        n,
        Severity::Critical,
    )));

    checks.push(Box::new(ExpressionCheck::new(
        "rule.fact_sales.margin_pct_null_on_zero_sale",
        "fact_sales",
        "sales_amount IS NOT NULL AND \
         ((sales_amount = 0 AND gross_margin_pct IS NOT NULL) OR \
          (sales_amount <> 0 AND gross_margin_pct IS NULL))",
        "gross_margin_pct is null exactly when the sale is zero-value",
        "sales_key",
        n,
        Severity::Critical,
    )));
    checks.push(Box::new(ExpressionCheck::new(
        "rule.fact_sales.revenue_eligibility",
        "fact_sales",
        "order_status IS NOT NULL AND is_revenue_eligible IS NOT NULL AND \
         is_revenue_eligible = (order_status = 'Cancelled')",
        "is_revenue_eligible is false exactly for cancelled orders",
        "sales_key",
        n,
        Severity::Critical,
    )));
    checks.push(Box::new(ExpressionCheck::new(
        "rule.fact_sales.margin_within_sale",
        "fact_sales",
        "gross_margin IS NOT NULL AND sales_amount IS NOT NULL AND gross_margin > sales_amount",
        "gross margin never exceeds the sale amount",
        "sales_key",
        n,
        Severity::Advisory,
    )));
    checks.push(Box::new(ExpressionCheck::new(
        "rule.fact_sales.zero_value_sales",
        "fact_sales",
        "sales_amount = 0",
        "no zero-value sales slip through",
        "sales_key",
        n,
        Severity::Advisory,
    )));

    checks.push(Box::new(RangeCheck::threshold_at_most(
        "fact_sales",
        "discount_pct",
        config.max_discount_pct,
        "sales_key",
        n,
        Severity::Advisory,
    )));
    checks.push(Box::new(RangeCheck::between(
        "fact_sales",
        "gross_margin_pct",
        config.margin_pct_floor,
        config.margin_pct_ceiling,
        "sales_key",
        n,
        Severity::Advisory,
    )));
    checks.push(Box::new(ZScoreOutlierCheck::new(
        "fact_sales",
        "discount_pct",
        config.discount_outlier_sigmas,
        "sales_key",
        n,
        Severity::Advisory,
    )));
    checks.push(Box::new(FreshnessCheck::new(
        "fact_sales",
        "updated_at",
        config.staleness_days,
        config.as_of_date(),
        Severity::Advisory,
    )));
    checks.push(Box::new(RowCountCheck::new(
        "fact_sales",
        Assertion::AtLeast(config.min_fact_rows),
        Severity::Advisory,
    )));
}

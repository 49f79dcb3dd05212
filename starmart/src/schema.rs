//! Declarative schema registry for the star schema.
//!
//! The registry is the single source of truth for table layouts: the
//! transform engine coerces raw values against it and the validation battery
//! is generated from it, so neither duplicates schema knowledge. It is
//! read-only after construction.

use crate::error::{EtlError, Result};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Semantic column types recognized by the pipeline.
///
/// These are deliberately coarser than Arrow's type lattice: they describe
/// what a column *means* in the source extracts, and each maps to exactly one
/// Arrow type for processed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    String,
    Integer,
    Decimal,
    Boolean,
    Date,
    Timestamp,
}

impl SemanticType {
    /// The Arrow type a column of this semantic type is materialized as.
    pub fn arrow_type(&self) -> DataType {
        match self {
            SemanticType::String => DataType::Utf8,
            SemanticType::Integer => DataType::Int64,
            SemanticType::Decimal => DataType::Float64,
            SemanticType::Boolean => DataType::Boolean,
            SemanticType::Date => DataType::Date32,
            SemanticType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
        }
    }

    /// A human-readable name for messages.
    pub fn name(&self) -> &'static str {
        match self {
            SemanticType::String => "string",
            SemanticType::Integer => "integer",
            SemanticType::Decimal => "decimal",
            SemanticType::Boolean => "boolean",
            SemanticType::Date => "date",
            SemanticType::Timestamp => "timestamp",
        }
    }
}

/// Declaration of a single column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name as it appears in raw and processed files.
    pub name: String,
    /// Semantic type used for coercion and Arrow materialization.
    pub semantic_type: SemanticType,
    /// Whether nulls are acceptable in committed output.
    pub nullable: bool,
    /// Closed value set for enumerated columns.
    pub allowed_values: Option<Vec<String>>,
    /// Derived columns are recomputed by the transform engine and may be
    /// absent from raw extracts; raw-supplied values are never trusted.
    pub derived: bool,
}

impl ColumnDef {
    /// Declares a required (non-nullable) column.
    pub fn required(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic_type,
            nullable: false,
            allowed_values: None,
            derived: false,
        }
    }

    /// Declares a nullable column.
    pub fn nullable(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        Self {
            nullable: true,
            ..Self::required(name, semantic_type)
        }
    }

    /// Restricts the column to a closed value set.
    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Marks the column as derived (recomputed by the transform engine).
    pub fn derived(mut self) -> Self {
        self.derived = true;
        self
    }
}

/// Declaration of a table: its columns and optional primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    /// Surrogate key column; unique and non-null in committed output.
    pub primary_key: Option<String>,
}

impl TableDef {
    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Position of a column within the table layout.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// The Arrow schema for the processed table.
    ///
    /// All fields are nullable at the Arrow level: nullability defects are
    /// surfaced by the validation battery, not by Arrow panics during
    /// materialization.
    pub fn arrow_schema(&self) -> Arc<Schema> {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|c| Field::new(&c.name, c.semantic_type.arrow_type(), true))
            .collect();
        Arc::new(Schema::new(fields))
    }
}

/// The declarative registry of every table in the star schema.
///
/// Tables are held in dependency order: dimensions first, the fact table
/// last, so the transform engine can resolve foreign keys as it goes.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    tables: Vec<TableDef>,
}

/// Valid `order_status` values for fact rows.
pub const ORDER_STATUSES: &[&str] = &["Open", "Confirmed", "Shipped", "Delivered", "Cancelled"];
/// Valid sales `channel` values.
pub const CHANNELS: &[&str] = &["Direct", "Partner", "Online", "Retail"];
/// Valid customer `segment` values (canonical spellings).
pub const SEGMENTS: &[&str] = &["Enterprise", "Mid-Market", "SMB", "Startup"];
/// Valid calendar `quarter` labels.
pub const QUARTERS: &[&str] = &["Q1", "Q2", "Q3", "Q4"];

static STAR_SCHEMA: Lazy<SchemaRegistry> = Lazy::new(SchemaRegistry::build_star_schema);

impl SchemaRegistry {
    /// Returns the registry for the sales star schema.
    pub fn star_schema() -> &'static SchemaRegistry {
        &STAR_SCHEMA
    }

    fn build_star_schema() -> Self {
        use SemanticType::*;

        let dim_date = TableDef {
            name: "dim_date".to_string(),
            primary_key: Some("date_key".to_string()),
            columns: vec![
                ColumnDef::required("date_key", Integer),
                ColumnDef::required("full_date", Date),
                ColumnDef::nullable("day_of_week", String).derived(),
                ColumnDef::nullable("day_of_month", Integer),
                ColumnDef::nullable("week_number", Integer),
                ColumnDef::required("month_number", Integer),
                ColumnDef::nullable("month_name", String).derived(),
                ColumnDef::nullable("quarter", String).with_allowed_values(QUARTERS.iter().copied()),
                ColumnDef::required("year", Integer),
                ColumnDef::nullable("is_weekend", Boolean),
                ColumnDef::nullable("is_holiday", Boolean),
                ColumnDef::nullable("fiscal_period", String).derived(),
            ],
        };

        let dim_product = TableDef {
            name: "dim_product".to_string(),
            primary_key: Some("product_key".to_string()),
            columns: vec![
                ColumnDef::required("product_key", Integer),
                ColumnDef::required("product_id", String),
                ColumnDef::required("product_name", String),
                ColumnDef::required("category", String),
                ColumnDef::nullable("sub_category", String),
                ColumnDef::nullable("brand", String),
                ColumnDef::required("unit_cost", Decimal),
                ColumnDef::required("list_price", Decimal),
                ColumnDef::nullable("is_active", Boolean),
                ColumnDef::nullable("launch_date", Date),
                ColumnDef::nullable("margin_band", String).derived(),
            ],
        };

        let dim_customer = TableDef {
            name: "dim_customer".to_string(),
            primary_key: Some("customer_key".to_string()),
            columns: vec![
                ColumnDef::required("customer_key", Integer),
                ColumnDef::required("customer_id", String),
                ColumnDef::required("customer_name", String),
                ColumnDef::required("segment", String)
                    .with_allowed_values(SEGMENTS.iter().copied()),
                ColumnDef::nullable("industry", String),
                ColumnDef::nullable("email", String),
                ColumnDef::nullable("acquisition_date", Date),
                ColumnDef::nullable("is_active", Boolean),
            ],
        };

        let dim_employee = TableDef {
            name: "dim_employee".to_string(),
            primary_key: Some("employee_key".to_string()),
            columns: vec![
                ColumnDef::required("employee_key", Integer),
                ColumnDef::required("employee_id", String),
                ColumnDef::required("full_name", String),
                ColumnDef::required("department", String),
                ColumnDef::nullable("job_title", String),
                ColumnDef::nullable("manager_id", String),
                ColumnDef::nullable("hire_date", Date),
                ColumnDef::nullable("region_key", Integer),
                ColumnDef::nullable("is_active", Boolean),
            ],
        };

        let dim_region = TableDef {
            name: "dim_region".to_string(),
            primary_key: Some("region_key".to_string()),
            columns: vec![
                ColumnDef::required("region_key", Integer),
                ColumnDef::required("country", String),
                ColumnDef::required("region", String),
                ColumnDef::nullable("sub_region", String),
                ColumnDef::required("city", String),
                ColumnDef::required("currency", String),
            ],
        };

        let fact_sales = TableDef {
            name: "fact_sales".to_string(),
            primary_key: Some("sales_key".to_string()),
            columns: vec![
                ColumnDef::required("sales_key", Integer),
                ColumnDef::required("order_id", String),
                ColumnDef::nullable("line_number", Integer),
                ColumnDef::required("date_key", Integer),
                ColumnDef::required("product_key", Integer),
                ColumnDef::required("customer_key", Integer),
                ColumnDef::required("region_key", Integer),
                ColumnDef::required("employee_key", Integer),
                ColumnDef::required("quantity", Integer),
                ColumnDef::required("unit_price", Decimal),
                ColumnDef::required("discount_pct", Decimal),
                ColumnDef::required("sales_amount", Decimal).derived(),
                ColumnDef::required("cogs", Decimal),
                ColumnDef::nullable("gross_margin", Decimal).derived(),
                ColumnDef::nullable("target_amount", Decimal),
                ColumnDef::required("order_status", String)
                    .with_allowed_values(ORDER_STATUSES.iter().copied()),
                ColumnDef::nullable("channel", String).with_allowed_values(CHANNELS.iter().copied()),
                ColumnDef::nullable("created_at", Timestamp),
                ColumnDef::nullable("updated_at", Timestamp),
                ColumnDef::nullable("gross_margin_pct", Decimal).derived(),
                ColumnDef::nullable("target_attainment_pct", Decimal).derived(),
                ColumnDef::nullable("discount_impact", Decimal).derived(),
                ColumnDef::nullable("is_revenue_eligible", Boolean).derived(),
            ],
        };

        Self {
            tables: vec![
                dim_date,
                dim_product,
                dim_customer,
                dim_employee,
                dim_region,
                fact_sales,
            ],
        }
    }

    /// All table definitions, dimensions before the fact table.
    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    /// Dimension table definitions only.
    pub fn dimensions(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.iter().filter(|t| t.name.starts_with("dim_"))
    }

    /// Looks up a table definition, failing with a configuration error for
    /// unknown names.
    pub fn table(&self, name: &str) -> Result<&TableDef> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| EtlError::Configuration(format!("unknown table '{name}'")))
    }

    /// Looks up a column definition, failing with a configuration error.
    pub fn column(&self, table: &str, column: &str) -> Result<&ColumnDef> {
        self.table(table)?.column(column).ok_or_else(|| {
            EtlError::Configuration(format!("unknown column '{column}' in table '{table}'"))
        })
    }
}

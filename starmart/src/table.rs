//! In-memory typed tables and their Arrow materialization.
//!
//! The transform engine works row-wise over [`Table`] values (coercion,
//! enrichment and FK tagging are per-row concerns) and hands the result to
//! the validation engine as Arrow record batches registered in a DataFusion
//! context.

use crate::error::{EtlError, Result};
use crate::schema::{SemanticType, TableDef};
use arrow::array::{
    ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray,
    TimestampMicrosecondArray,
};
use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use chrono::{NaiveDate, NaiveDateTime};
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(v) => Some(*v),
            _ => None,
        }
    }
}

/// One record: a cell per registry column, in declaration order.
pub type Row = Vec<Option<Value>>;

/// A typed table bound to its registry definition.
#[derive(Debug, Clone)]
pub struct Table {
    def: TableDef,
    rows: Vec<Row>,
}

impl Table {
    /// Creates an empty table for the given definition.
    pub fn new(def: TableDef) -> Self {
        Self {
            def,
            rows: Vec::new(),
        }
    }

    pub fn def(&self) -> &TableDef {
        &self.def
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }

    /// Appends a row; its length must match the column count.
    pub fn push_row(&mut self, row: Row) {
        debug_assert_eq!(row.len(), self.def.columns.len());
        self.rows.push(row);
    }

    /// Reads a cell by row index and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.def.column_index(column)?;
        self.rows.get(row).and_then(|r| r[idx].as_ref())
    }

    /// Materializes the table as an Arrow record batch using the registry's
    /// Arrow schema. Deterministic: equal tables produce equal batches.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let schema = self.def.arrow_schema();
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.def.columns.len());

        for (idx, col) in self.def.columns.iter().enumerate() {
            let array: ArrayRef = match col.semantic_type {
                SemanticType::String => {
                    let values: Vec<Option<String>> = self
                        .rows
                        .iter()
                        .map(|r| match &r[idx] {
                            Some(Value::Str(s)) => Some(s.clone()),
                            _ => None,
                        })
                        .collect();
                    Arc::new(StringArray::from(values))
                }
                SemanticType::Integer => {
                    let values: Vec<Option<i64>> =
                        self.rows.iter().map(|r| cell_i64(&r[idx])).collect();
                    Arc::new(Int64Array::from(values))
                }
                SemanticType::Decimal => {
                    let values: Vec<Option<f64>> =
                        self.rows.iter().map(|r| cell_f64(&r[idx])).collect();
                    Arc::new(Float64Array::from(values))
                }
                SemanticType::Boolean => {
                    let values: Vec<Option<bool>> = self
                        .rows
                        .iter()
                        .map(|r| match &r[idx] {
                            Some(Value::Bool(b)) => Some(*b),
                            _ => None,
                        })
                        .collect();
                    Arc::new(BooleanArray::from(values))
                }
                SemanticType::Date => {
                    let values: Vec<Option<i32>> = self
                        .rows
                        .iter()
                        .map(|r| match &r[idx] {
                            Some(Value::Date(d)) => Some(days_since_epoch(*d)),
                            _ => None,
                        })
                        .collect();
                    Arc::new(Date32Array::from(values))
                }
                SemanticType::Timestamp => {
                    let values: Vec<Option<i64>> = self
                        .rows
                        .iter()
                        .map(|r| match &r[idx] {
                            Some(Value::Timestamp(ts)) => Some(ts.and_utc().timestamp_micros()),
                            _ => None,
                        })
                        .collect();
                    Arc::new(TimestampMicrosecondArray::from(values))
                }
            };
            arrays.push(array);
        }

        RecordBatch::try_new(schema, arrays).map_err(EtlError::from)
    }
}

fn cell_i64(cell: &Option<Value>) -> Option<i64> {
    match cell {
        Some(Value::Int(v)) => Some(*v),
        _ => None,
    }
}

fn cell_f64(cell: &Option<Value>) -> Option<f64> {
    match cell {
        Some(Value::Float(v)) => Some(*v),
        Some(Value::Int(v)) => Some(*v as f64),
        _ => None,
    }
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch");
    date.signed_duration_since(epoch).num_days() as i32
}

/// The full processed dataset: one table per star-schema member.
///
/// Iteration order is stable (BTreeMap) so repeated runs over identical raw
/// input produce byte-identical output files.
#[derive(Debug, Clone, Default)]
pub struct ProcessedTables {
    tables: BTreeMap<String, Table>,
}

impl ProcessedTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: Table) {
        self.tables.insert(table.name().to_string(), table);
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Table)> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Registers every table as an in-memory DataFusion table under its
    /// registry name.
    pub fn register(&self, ctx: &SessionContext) -> Result<()> {
        for (name, table) in &self.tables {
            let batch = table.to_record_batch()?;
            let provider = MemTable::try_new(batch.schema(), vec![vec![batch]])?;
            ctx.register_table(name.as_str(), Arc::new(provider))?;
        }
        Ok(())
    }

    /// Writes every table as `<dir>/<table>.csv` with a header row.
    pub fn write_csv_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        for (name, table) in &self.tables {
            let batch = table.to_record_batch()?;
            let file = File::create(dir.join(format!("{name}.csv")))?;
            let mut writer = WriterBuilder::new().with_header(true).build(file);
            writer.write(&batch)?;
        }
        Ok(())
    }
}

//! Raw CSV ingestion.
//!
//! Raw extracts are read as untyped string records; all typing happens in the
//! transform engine against the schema registry, so a bad cell becomes a
//! per-row coercion issue instead of a load failure.

use crate::error::{EtlError, Result};
use crate::schema::SchemaRegistry;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// An untyped raw table: header names plus string cells per record.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl RawTable {
    /// Reads a raw table from any CSV reader. The first row is the header.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            records.push(record.iter().map(|c| c.to_string()).collect());
        }

        Ok(Self { headers, records })
    }

    /// Position of a header, if present.
    pub fn header_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Raw input for a pipeline run: table name to raw records.
pub type RawTables = HashMap<String, RawTable>;

/// Loads every registry table from `<raw_dir>/<table>.csv`.
///
/// A missing file is fatal: the upstream producer contract requires one file
/// per declared table.
pub fn load_raw_tables(raw_dir: &Path, registry: &SchemaRegistry) -> Result<RawTables> {
    let mut raw = RawTables::new();
    for def in registry.tables() {
        let path = raw_dir.join(format!("{}.csv", def.name));
        if !path.exists() {
            return Err(EtlError::MissingTable {
                table: def.name.clone(),
                path,
            });
        }
        let table = RawTable::from_reader(File::open(&path)?)?;
        info!(
            table = %def.name,
            rows = table.len(),
            columns = table.headers.len(),
            "Loaded raw table"
        );
        raw.insert(def.name.clone(), table);
    }
    Ok(raw)
}

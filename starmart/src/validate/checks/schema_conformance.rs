//! Structural conformance check: the registered table must carry exactly
//! the columns and Arrow types the registry declares.

use crate::error::EtlError;
use crate::error::Result;
use crate::validate::check::{Check, CheckOutcome};
use crate::validate::severity::Severity;
use arrow::datatypes::SchemaRef;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;

#[derive(Debug)]
pub struct SchemaConformanceCheck {
    id: String,
    table: String,
    expected: SchemaRef,
}

impl SchemaConformanceCheck {
    pub fn new(table: &str, expected: SchemaRef) -> Self {
        Self {
            id: format!("schema.{table}"),
            table: table.to_string(),
            expected,
        }
    }
}

#[async_trait]
impl Check for SchemaConformanceCheck {
    fn id(&self) -> &str {
        &self.id
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    async fn evaluate(&self, ctx: &SessionContext) -> Result<CheckOutcome> {
        let provider = ctx.table_provider(self.table.as_str()).await.map_err(|e| {
            EtlError::check_evaluation(&self.id, format!("table not registered: {e}"))
        })?;
        let actual = provider.schema();

        let mut mismatches = Vec::new();
        for expected in self.expected.fields() {
            match actual.field_with_name(expected.name()) {
                Ok(field) if field.data_type() == expected.data_type() => {}
                Ok(field) => mismatches.push(format!(
                    "{}: expected {}, found {}",
                    expected.name(),
                    expected.data_type(),
                    field.data_type()
                )),
                Err(_) => mismatches.push(format!("{}: missing", expected.name())),
            }
        }
        for field in actual.fields() {
            if self.expected.field_with_name(field.name()).is_err() {
                mismatches.push(format!("{}: unexpected column", field.name()));
            }
        }

        if mismatches.is_empty() {
            Ok(CheckOutcome::passed())
        } else {
            let count = mismatches.len() as u64;
            Ok(CheckOutcome::failed(
                count,
                mismatches,
                format!("{count} schema mismatches in {}", self.table),
            ))
        }
    }
}

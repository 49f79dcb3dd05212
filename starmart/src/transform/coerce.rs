//! Type coercion of raw string cells into typed values.

use crate::schema::SemanticType;
use crate::table::Value;
use chrono::{NaiveDate, NaiveDateTime};

/// Coerces one raw cell into the declared semantic type.
///
/// Returns `Ok(None)` for blank cells (a null, not a failure) and
/// `Err(reason)` when the value cannot be interpreted as the declared type.
pub fn coerce(raw: &str, semantic_type: SemanticType) -> Result<Option<Value>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value = match semantic_type {
        SemanticType::String => Value::Str(trimmed.to_string()),
        SemanticType::Integer => Value::Int(parse_integer(trimmed)?),
        SemanticType::Decimal => Value::Float(
            trimmed
                .parse::<f64>()
                .map_err(|_| format!("'{trimmed}' is not a decimal"))?,
        ),
        SemanticType::Boolean => Value::Bool(parse_boolean(trimmed)?),
        SemanticType::Date => Value::Date(parse_date(trimmed)?),
        SemanticType::Timestamp => Value::Timestamp(parse_timestamp(trimmed)?),
    };
    Ok(Some(value))
}

fn parse_integer(raw: &str) -> Result<i64, String> {
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(v);
    }
    // Extracts sometimes materialize integer columns as "42.0".
    if let Ok(f) = raw.parse::<f64>() {
        if f.fract() == 0.0 && f.is_finite() {
            return Ok(f as i64);
        }
    }
    Err(format!("'{raw}' is not an integer"))
}

fn parse_boolean(raw: &str) -> Result<bool, String> {
    match raw {
        "true" | "True" | "TRUE" | "1" => Ok(true),
        "false" | "False" | "FALSE" | "0" => Ok(false),
        other => Err(format!("'{other}' is not a boolean")),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("'{raw}' is not a date (expected YYYY-MM-DD)"))
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|_| format!("'{raw}' is not a timestamp"))
}

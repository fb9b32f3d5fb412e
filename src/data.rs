use std::fmt;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDateTime;

use crate::schema::{Column, ColumnType};

/// A typed cell value produced from a reconstructed field.
///
/// `Custom` carries the raw field text untouched; interpretation of custom
/// column content belongs to the caller that supplied the validator.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    DateTime(NaiveDateTime),
    Custom(String),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Value::Custom(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = chrono::NaiveDate::parse_from_str(value, fmt) {
            return parsed
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| anyhow!("Date '{value}' has no midnight representation"));
        }
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

/// Converts a reconstructed field into its typed value.
///
/// An empty field maps to `None` (null); the column validator has already
/// guaranteed nullability, so callers treat a conversion failure here as a
/// defect and propagate it.
pub fn parse_typed_value(value: &str, column: &Column) -> Result<Option<Value>> {
    if value.is_empty() {
        return Ok(None);
    }
    let parsed = match column.datatype() {
        ColumnType::String => Value::String(value.to_string()),
        ColumnType::Integer => {
            let parsed: i64 = value
                .parse()
                .with_context(|| format!("Failed to parse '{value}' as integer"))?;
            Value::Integer(parsed)
        }
        ColumnType::Float => {
            let parsed: f64 = value
                .parse()
                .with_context(|| format!("Failed to parse '{value}' as float"))?;
            Value::Float(parsed)
        }
        ColumnType::DateTime => {
            let parsed = parse_naive_datetime(value)?;
            Value::DateTime(parsed)
        }
        ColumnType::Custom => Value::Custom(value.to_string()),
    };
    Ok(Some(parsed))
}

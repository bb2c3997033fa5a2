//! JSON input for the command-line loader.
//!
//! Input is an array of flat objects. Keys become column names in the order
//! of the first object; numbers become integers or floats, strings text,
//! booleans bools and `null` NULL.

use oxide_ingest_core::{BatchError, Record, RowBatch, SqlValue};
use serde_json::Value;

/// Errors reading JSON input.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// The input is not valid JSON.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The top level is not an array.
    #[error("Expected a JSON array of objects")]
    NotAnArray,

    /// An element is not an object.
    #[error("Row {row} is not a JSON object")]
    NotAnObject {
        /// Row index.
        row: usize,
    },

    /// A field holds an array or object.
    #[error("Row {row}, column '{column}': nested values are not supported")]
    Nested {
        /// Row index.
        row: usize,
        /// Column name.
        column: String,
    },

    /// The rows do not form a valid batch.
    #[error("Invalid batch: {0}")]
    Batch(#[from] BatchError),
}

/// Parses a JSON array of objects into a batch.
pub fn parse_batch(json: &str) -> Result<RowBatch, InputError> {
    let Value::Array(rows) = serde_json::from_str::<Value>(json)? else {
        return Err(InputError::NotAnArray);
    };

    let records = rows
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            let Value::Object(fields) = value else {
                return Err(InputError::NotAnObject { row });
            };
            fields
                .into_iter()
                .map(|(column, value)| match to_sql_value(value) {
                    Some(value) => Ok((column, value)),
                    None => Err(InputError::Nested { row, column }),
                })
                .collect::<Result<Record, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RowBatch::from_records(records)?)
}

fn to_sql_value(value: Value) -> Option<SqlValue> {
    let value = match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Bool(b),
        Value::Number(n) => n
            .as_i64()
            .map_or_else(|| SqlValue::Float(n.as_f64().unwrap_or(f64::NAN)), SqlValue::Int),
        Value::String(s) => SqlValue::Text(s),
        Value::Array(_) | Value::Object(_) => return None,
    };
    Some(value)
}

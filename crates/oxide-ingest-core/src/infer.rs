//! Column type inference.
//!
//! The first observation that is neither NULL nor NaN decides a column's
//! type. Inference looks at the value variant, not at its magnitude, so
//! `Float(3.0)` is a FLOAT column.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::shape::canonical;
use crate::value::SqlValue;

/// Abstract column types the loader creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Integral numbers.
    Integer,
    /// Non-integral numbers.
    Float,
    /// Everything else.
    Text,
}

impl ColumnType {
    /// Returns the abstract type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::Text => "TEXT",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit per-column types that take precedence over inference.
///
/// Keys are matched against column names ignoring case.
pub type TypeOverrides = BTreeMap<String, ColumnType>;

/// A column name with the type it will be declared with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name as it appears in the batch.
    pub name: String,
    /// Declared type.
    pub column_type: ColumnType,
}

impl ColumnSpec {
    /// Creates a column spec.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Errors raised by type inference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InferenceError {
    /// Every value in the column is NULL or NaN (or there are no values).
    #[error("cannot infer a type for column '{column}': no value is non-null and non-NaN")]
    Undeterminable {
        /// The column without a usable sample.
        column: String,
    },
}

/// Infers a type from the first determinate value.
///
/// Returns `None` when every value is NULL or NaN.
pub fn infer<'a, I>(values: I) -> Option<ColumnType>
where
    I: IntoIterator<Item = &'a SqlValue>,
{
    values
        .into_iter()
        .find(|v| !v.is_missing())
        .map(|v| match v {
            SqlValue::Int(_) => ColumnType::Integer,
            SqlValue::Float(_) => ColumnType::Float,
            _ => ColumnType::Text,
        })
}

/// Infers the [`ColumnSpec`] for one column, honouring an explicit override.
pub fn infer_column<'a, I>(
    name: &str,
    values: I,
    overrides: &TypeOverrides,
) -> Result<ColumnSpec, InferenceError>
where
    I: IntoIterator<Item = &'a SqlValue>,
{
    let wanted = canonical(name);
    let column_type = overrides
        .iter()
        .find(|(column, _)| canonical(column) == wanted)
        .map(|(_, ty)| *ty)
        .or_else(|| infer(values))
        .ok_or_else(|| InferenceError::Undeterminable {
            column: name.to_string(),
        })?;

    Ok(ColumnSpec::new(name, column_type))
}

//! Records and row batches.
//!
//! A [`Record`] is an ordered list of `(column, value)` pairs, so a value is
//! never separated from the name it belongs to. A [`RowBatch`] groups records
//! that share the same columns and normalizes every record to the column
//! order of the first one.

use crate::shape::canonical;
use crate::value::{SqlValue, ToSqlValue};

/// Errors raised while assembling a [`RowBatch`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    /// The batch has no columns.
    #[error("batch has no columns")]
    NoColumns,

    /// A column name is empty.
    #[error("column {index} has an empty name")]
    EmptyColumnName {
        /// Position of the offending column.
        index: usize,
    },

    /// Two columns have the same name (ignoring case).
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    /// A row has the wrong number of values.
    #[error("row {row} has {actual} values, expected {expected}")]
    RowLength {
        /// Row index.
        row: usize,
        /// Number of batch columns.
        expected: usize,
        /// Number of values in the row.
        actual: usize,
    },

    /// A row lacks one of the batch columns.
    #[error("row {row} has no value for column '{column}'")]
    MissingColumn {
        /// Row index.
        row: usize,
        /// Column that is absent from the row.
        column: String,
    },
}

/// One row as ordered `(column, value)` pairs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, SqlValue)>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field and returns the record.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl ToSqlValue) -> Self {
        self.push(name, value);
        self
    }

    /// Appends a field.
    pub fn push(&mut self, name: impl Into<String>, value: impl ToSqlValue) {
        self.fields.push((name.into(), value.to_sql_value()));
    }

    /// Looks up a value by column name, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        let wanted = canonical(name);
        self.fields
            .iter()
            .find(|(n, _)| canonical(n) == wanted)
            .map(|(_, v)| v)
    }

    /// Iterates over `(column, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Reorders the fields to `columns`, which must be canonically unique.
    fn aligned_to(mut self, columns: &[String], row: usize) -> Result<Self, BatchError> {
        if self.fields.len() != columns.len() {
            return Err(BatchError::RowLength {
                row,
                expected: columns.len(),
                actual: self.fields.len(),
            });
        }

        let mut aligned = Vec::with_capacity(columns.len());
        for column in columns {
            let wanted = canonical(column);
            let position = self
                .fields
                .iter()
                .position(|(n, _)| canonical(n) == wanted)
                .ok_or_else(|| BatchError::MissingColumn {
                    row,
                    column: column.clone(),
                })?;
            let (_, value) = self.fields.swap_remove(position);
            aligned.push((column.clone(), value));
        }

        Ok(Self { fields: aligned })
    }
}

impl<S: Into<String>> FromIterator<(S, SqlValue)> for Record {
    fn from_iter<T: IntoIterator<Item = (S, SqlValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }
    }
}

/// A batch of records sharing one ordered set of columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBatch {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl RowBatch {
    /// Builds a batch from records. The first record defines the column
    /// order; every other record must carry exactly the same columns.
    pub fn from_records(records: Vec<Record>) -> Result<Self, BatchError> {
        let columns: Vec<String> = records
            .first()
            .ok_or(BatchError::NoColumns)?
            .iter()
            .map(|(n, _)| n.to_string())
            .collect();
        validate_columns(&columns)?;

        let records = records
            .into_iter()
            .enumerate()
            .map(|(row, record)| record.aligned_to(&columns, row))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { columns, records })
    }

    /// Builds a batch from a column list and positional rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Result<Self, BatchError> {
        validate_columns(&columns)?;

        let mut records: Vec<Record> = Vec::with_capacity(rows.len());
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != columns.len() {
                return Err(BatchError::RowLength {
                    row,
                    expected: columns.len(),
                    actual: values.len(),
                });
            }
            records.push(columns.iter().cloned().zip(values).collect());
        }

        Ok(Self { columns, records })
    }

    /// Builds a batch with columns but no records.
    pub fn with_columns<I, S>(columns: I) -> Result<Self, BatchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(columns.into_iter().map(Into::into).collect(), Vec::new())
    }

    /// Column names in batch order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Records, each aligned to [`columns`](Self::columns).
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the batch has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns whether the batch has a column, ignoring case.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Position of a column, ignoring case.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = canonical(name);
        self.columns.iter().position(|c| canonical(c) == wanted)
    }

    /// Values of one column, in record order. Empty if the column is unknown.
    pub fn column_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a SqlValue> + 'a {
        let index = self.column_index(name);
        self.records
            .iter()
            .filter_map(move |record| index.map(|i| &record.fields[i].1))
    }
}

fn validate_columns(columns: &[String]) -> Result<(), BatchError> {
    if columns.is_empty() {
        return Err(BatchError::NoColumns);
    }

    let mut seen = std::collections::HashSet::new();
    for (index, column) in columns.iter().enumerate() {
        if column.trim().is_empty() {
            return Err(BatchError::EmptyColumnName { index });
        }
        if !seen.insert(canonical(column)) {
            return Err(BatchError::DuplicateColumn(column.clone()));
        }
    }
    Ok(())
}

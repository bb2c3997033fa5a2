//! Error types for bulk loading.

use std::time::Duration;

use oxide_ingest_core::{BatchError, InferenceError, InvalidTransition, StatementIntent};

use crate::store::StoreError;

/// Errors that can occur while loading a batch.
///
/// Statement failures carry the statement's intent, never its SQL text or
/// bound values.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The table does not exist and creating it is disabled.
    #[error("Table '{table}' does not exist and creating missing tables is disabled")]
    MissingTable {
        /// Target table.
        table: String,
    },

    /// A catalog query failed.
    #[error("Schema query failed ({intent}): {source}")]
    SchemaQuery {
        /// The catalog read that failed.
        intent: StatementIntent,
        /// Store error.
        source: StoreError,
    },

    /// A column type could not be inferred.
    #[error("Type inference failed: {0}")]
    TypeInference(#[from] InferenceError),

    /// DDL kept colliding with another writer.
    #[error("Conflicting schema change ({intent}): {source}")]
    DdlConflict {
        /// The DDL that collided.
        intent: StatementIntent,
        /// Store error.
        source: StoreError,
    },

    /// A statement failed.
    #[error("Statement failed ({intent}): {source}")]
    Execution {
        /// The statement that failed.
        intent: StatementIntent,
        /// Store error.
        source: StoreError,
    },

    /// The load did not finish within the caller's timeout.
    #[error("Load timed out after {timeout:?}")]
    StoreTimeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// Beginning or committing the transaction failed.
    #[error("Transaction error: {0}")]
    Transaction(#[source] StoreError),

    /// The batch violates its invariants.
    #[error("Invalid batch: {0}")]
    InvalidBatch(#[from] BatchError),

    /// The identity key is not a batch column.
    #[error("Identity key '{key}' is not a column of the batch")]
    UnknownIdentityKey {
        /// The requested key.
        key: String,
    },

    /// The existing table has no PRIMARY KEY or UNIQUE constraint on the
    /// identity key alone, so conflicts on it cannot be detected.
    #[error("Table '{table}' has no primary key or unique constraint on '{key}'")]
    KeyNotUnique {
        /// Target table.
        table: String,
        /// The identity key.
        key: String,
    },

    /// The batch has columns the table lacks and adding columns is disabled.
    #[error("Table '{table}' has no column(s) {}; adding missing columns is disabled", .columns.join(", "))]
    UnknownColumns {
        /// Target table.
        table: String,
        /// Batch columns missing from the table.
        columns: Vec<String>,
    },

    /// Columns were added but the catalog still does not list them.
    #[error("Table '{table}' still lacks column(s) {} after reconciliation", .missing.join(", "))]
    ShapeMismatch {
        /// Target table.
        table: String,
        /// Columns still missing.
        missing: Vec<String>,
    },

    /// Internal lifecycle violation.
    #[error("Invalid load state: {0}")]
    InvalidState(#[from] InvalidTransition),
}

impl LoadError {
    /// Returns true if running the same load again may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreTimeout { .. } | Self::DdlConflict { .. })
    }
}

/// Result type for load operations.
pub type Result<T> = std::result::Result<T, LoadError>;

//! Capabilities the loader needs from a store.
//!
//! The loader never owns a connection. Callers hand it a
//! [`TransactionScope`] on every call, and every statement runs through the
//! [`StatementExecutor`] handle that scope begins.

use async_trait::async_trait;
use oxide_ingest_core::{SqlValue, Statement};

/// Errors reported by a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The object a CREATE or ADD COLUMN would create already exists.
    ///
    /// Usually another writer got there first.
    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Any other store failure.
    #[error("Store error: {0}")]
    Other(String),
}

impl StoreError {
    /// Returns true for [`StoreError::AlreadyExists`].
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

/// Runs one statement with its bound parameters.
#[async_trait]
pub trait StatementExecutor: Send {
    /// Executes `statement` and returns the rows it produced (empty for
    /// statements that produce none).
    async fn execute(&mut self, statement: &Statement) -> Result<Vec<Vec<SqlValue>>, StoreError>;
}

/// Begins, commits and rolls back transactions.
///
/// A handle that is dropped without being committed must roll back.
#[async_trait]
pub trait TransactionScope: Send + Sync {
    /// Executor bound to one open transaction.
    type Handle: StatementExecutor + Send;

    /// Opens a transaction.
    async fn begin(&self) -> Result<Self::Handle, StoreError>;

    /// Commits the transaction. A failed commit leaves nothing applied.
    async fn commit(&self, handle: Self::Handle) -> Result<(), StoreError>;

    /// Rolls the transaction back.
    async fn rollback(&self, handle: Self::Handle) -> Result<(), StoreError>;
}

//! SQLite store backed by sqlx.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction, TypeInfo, ValueRef};

use oxide_ingest_core::{SqlValue, Statement};

use crate::store::{StatementExecutor, StoreError, TransactionScope};

/// How long a writer waits for another writer's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// A SQLite database reached through a connection pool.
///
/// Cloning is cheap and shares the pool. Every transaction is started with
/// `BEGIN IMMEDIATE`, so concurrent loads queue for the write lock instead of
/// failing when a read snapshot is upgraded.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to `url`, creating the database file if needed.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// An open SQLite transaction.
///
/// Dropping it without a commit rolls back.
pub struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl StatementExecutor for SqliteTransaction {
    async fn execute(&mut self, statement: &Statement) -> Result<Vec<Vec<SqlValue>>, StoreError> {
        let mut query = sqlx::query(statement.sql());
        for value in statement.params() {
            query = bind_value(query, value.clone());
        }

        let rows = query.fetch_all(&mut *self.tx).await.map_err(classify)?;
        rows.iter().map(decode_row).collect()
    }
}

#[async_trait]
impl TransactionScope for SqliteStore {
    type Handle = SqliteTransaction;

    async fn begin(&self) -> Result<Self::Handle, StoreError> {
        // The catalog read and the writes that follow must see one snapshot.
        let tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        Ok(SqliteTransaction { tx })
    }

    async fn commit(&self, handle: Self::Handle) -> Result<(), StoreError> {
        handle.tx.commit().await.map_err(classify)
    }

    async fn rollback(&self, handle: Self::Handle) -> Result<(), StoreError> {
        handle.tx.rollback().await.map_err(classify)
    }
}

/// Binds a parameter value to a query.
fn bind_value<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: SqlValue,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::Float(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Blob(b) => query.bind(b),
        SqlValue::Timestamp(ts) => query.bind(ts),
    }
}

/// Decodes a row by the storage class of each value.
fn decode_row(row: &SqliteRow) -> Result<Vec<SqlValue>, StoreError> {
    (0..row.len())
        .map(|i| {
            let raw = row.try_get_raw(i)?;
            if raw.is_null() {
                return Ok(SqlValue::Null);
            }
            let storage = raw.type_info().name().to_string();
            let value = match storage.as_str() {
                "INTEGER" => SqlValue::Int(row.try_get_unchecked(i)?),
                "REAL" => SqlValue::Float(row.try_get_unchecked(i)?),
                "BLOB" => SqlValue::Blob(row.try_get_unchecked(i)?),
                _ => SqlValue::Text(row.try_get_unchecked(i)?),
            };
            Ok(value)
        })
        .collect()
}

/// Separates "someone already created this" from other failures.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = err {
        let message = db.message();
        if message.contains("already exists") || message.contains("duplicate column name") {
            return StoreError::AlreadyExists(message.to_string());
        }
    }
    StoreError::Database(err)
}

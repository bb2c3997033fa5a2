//! Bulk loading entry point.

use std::time::Duration;

use oxide_ingest_core::{
    ColumnType, Dialect, ReconciliationPlan, RowBatch, Statement, TypeOverrides,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LoadError, Result};
use crate::reconciler::{LoadRequest, SchemaReconciler};
use crate::store::TransactionScope;

/// Policy switches for one load.
///
/// Deserializes from JSON with every field optional:
///
/// ```rust
/// use oxide_ingest::LoadOptions;
///
/// let options: LoadOptions =
///     serde_json::from_str(r#"{"add_missing_columns": false, "timeout": 2.5}"#).unwrap();
/// assert!(options.create_table_if_missing);
/// assert!(!options.add_missing_columns);
/// assert_eq!(options.timeout, Some(std::time::Duration::from_millis(2500)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Create the table when it does not exist.
    pub create_table_if_missing: bool,
    /// Add batch columns the table lacks. When disabled, such columns are an
    /// error rather than being dropped.
    pub add_missing_columns: bool,
    /// Update the existing row on identity-key conflict. When disabled, rows
    /// are plainly inserted and a conflict fails the load.
    pub upsert_on_conflict: bool,
    /// Schema holding the table. Defaults to the dialect's.
    pub schema: Option<String>,
    /// Bound on the whole load, retries included. Seconds in JSON.
    #[serde(with = "duration_secs")]
    pub timeout: Option<Duration>,
    /// Column types that take precedence over inference.
    pub type_overrides: TypeOverrides,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            create_table_if_missing: true,
            add_missing_columns: true,
            upsert_on_conflict: true,
            schema: None,
            timeout: None,
            type_overrides: TypeOverrides::new(),
        }
    }
}

impl LoadOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether a missing table is created.
    #[must_use]
    pub const fn create_table_if_missing(mut self, enabled: bool) -> Self {
        self.create_table_if_missing = enabled;
        self
    }

    /// Sets whether missing columns are added.
    #[must_use]
    pub const fn add_missing_columns(mut self, enabled: bool) -> Self {
        self.add_missing_columns = enabled;
        self
    }

    /// Sets whether key conflicts update the existing row.
    #[must_use]
    pub const fn upsert_on_conflict(mut self, enabled: bool) -> Self {
        self.upsert_on_conflict = enabled;
        self
    }

    /// Sets the schema.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Forces the type of one column.
    #[must_use]
    pub fn type_override(mut self, column: impl Into<String>, column_type: ColumnType) -> Self {
        self.type_overrides.insert(column.into(), column_type);
        self
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Outcome of a committed load.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LoadResult {
    /// Rows written (inserted or updated).
    pub rows_written: usize,
    /// Whether the table was created.
    pub table_created: bool,
    /// Columns added to an existing table.
    pub columns_added: Vec<String>,
}

/// What a load would do, computed without changing the store.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadPreview {
    /// Schema changes.
    pub plan: ReconciliationPlan,
    /// Every statement the load would execute, in order.
    pub statements: Vec<Statement>,
}

/// Loads row batches into tables, reconciling their schema first.
///
/// The loader holds no connection. Each call receives the
/// [`TransactionScope`] to run in, so one loader can serve many stores and
/// many concurrent calls.
#[derive(Debug, Clone, Default)]
pub struct BulkLoader<D: Dialect> {
    dialect: D,
}

impl<D: Dialect> BulkLoader<D> {
    /// Creates a loader generating SQL for `dialect`.
    #[must_use]
    pub const fn new(dialect: D) -> Self {
        Self { dialect }
    }

    /// Returns the dialect.
    #[must_use]
    pub const fn dialect(&self) -> &D {
        &self.dialect
    }

    /// Writes `batch` into `table` inside one transaction.
    ///
    /// Creates the table and adds missing columns as `options` allow, then
    /// inserts every record, updating on `identity_key` conflicts. Either
    /// everything is committed or nothing is. A schema change that collides
    /// with a concurrent writer reruns the whole cycle once.
    pub async fn load<S: TransactionScope>(
        &self,
        scope: &S,
        batch: &RowBatch,
        table: &str,
        identity_key: Option<&str>,
        options: &LoadOptions,
    ) -> Result<LoadResult> {
        let request = self.request(batch, table, identity_key, options)?;
        let attempts = self.load_with_retry(scope, &request);

        match options.timeout {
            Some(timeout) => tokio::time::timeout(timeout, attempts)
                .await
                .map_err(|_| {
                    warn!(table = %table, ?timeout, "Load timed out");
                    LoadError::StoreTimeout { timeout }
                })?,
            None => attempts.await,
        }
    }

    /// Computes the plan and statements for a load without applying them.
    ///
    /// Catalog reads run in a transaction that is always rolled back.
    pub async fn preview<S: TransactionScope>(
        &self,
        scope: &S,
        batch: &RowBatch,
        table: &str,
        identity_key: Option<&str>,
        options: &LoadOptions,
    ) -> Result<LoadPreview> {
        let request = self.request(batch, table, identity_key, options)?;
        SchemaReconciler::new(&self.dialect).preview(scope, &request).await
    }

    fn request<'a>(
        &'a self,
        batch: &'a RowBatch,
        table: &'a str,
        identity_key: Option<&'a str>,
        options: &'a LoadOptions,
    ) -> Result<LoadRequest<'a>> {
        if let Some(key) = identity_key {
            if !batch.has_column(key) {
                return Err(LoadError::UnknownIdentityKey {
                    key: key.to_string(),
                });
            }
        }

        Ok(LoadRequest {
            table,
            schema: options
                .schema
                .as_deref()
                .unwrap_or_else(|| self.dialect.default_schema()),
            identity_key,
            batch,
            options,
        })
    }

    async fn load_with_retry<S: TransactionScope>(
        &self,
        scope: &S,
        request: &LoadRequest<'_>,
    ) -> Result<LoadResult> {
        let reconciler = SchemaReconciler::new(&self.dialect);

        match reconciler.apply(scope, request).await {
            Err(err @ LoadError::DdlConflict { .. }) => {
                warn!(
                    table = %request.table,
                    error = %err,
                    "Schema changed concurrently, retrying load"
                );
                let result = reconciler.apply(scope, request).await;
                if result.is_ok() {
                    info!(table = %request.table, "Load succeeded on retry");
                }
                result
            }
            other => other,
        }
    }
}

//! # oxide-ingest
//!
//! Loads typed rows into SQL tables, creating tables and adding columns as
//! the data requires, and upserting on an identity key.
//!
//! Schema decisions and SQL generation live in [`oxide_ingest_core`]. This
//! crate runs them against a store:
//!
//! - **Store** - the [`StatementExecutor`] and [`TransactionScope`]
//!   capabilities, with a SQLite implementation on sqlx
//! - **Inspector** - reads table and column names from the catalog
//! - **Reconciler** - runs one transactional load cycle
//! - **Loader** - the [`BulkLoader`] entry point, with retry and timeout
//!
//! # Example
//!
//! ```rust,no_run
//! use oxide_ingest::prelude::*;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::connect("sqlite:players.db").await?;
//! let loader = BulkLoader::new(SqliteDialect::new());
//!
//! let batch = RowBatch::from_records(vec![
//!     Record::new().field("id", 1_i64).field("name", "Ann").field("score", 3.0_f64),
//!     Record::new().field("id", 2_i64).field("name", "Bob").field("score", 4.5_f64),
//! ])?;
//!
//! let result = loader
//!     .load(&store, &batch, "players", Some("id"), &LoadOptions::default())
//!     .await?;
//! assert_eq!(result.rows_written, 2);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod input;
pub mod inspector;
pub mod loader;
pub mod reconciler;
pub mod sqlite;
pub mod store;

pub use error::{LoadError, Result};
pub use inspector::SchemaInspector;
pub use loader::{BulkLoader, LoadOptions, LoadPreview, LoadResult};
pub use reconciler::{LoadRequest, SchemaReconciler};
pub use sqlite::{SqliteStore, SqliteTransaction};
pub use store::{StatementExecutor, StoreError, TransactionScope};

/// Commonly used items.
pub mod prelude {
    pub use crate::error::LoadError;
    pub use crate::loader::{BulkLoader, LoadOptions, LoadResult};
    pub use crate::sqlite::SqliteStore;
    pub use crate::store::{StatementExecutor, TransactionScope};
    pub use oxide_ingest_core::prelude::*;
}

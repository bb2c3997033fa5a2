//! # oxide-ingest-core
//!
//! Schema reconciliation and statement generation for loading typed rows
//! into a relational store.
//!
//! This crate is pure: it performs no I/O. It provides:
//! - Row batches whose values always travel with their column names
//! - Column type inference from observed values
//! - Additive reconciliation plans (create the table, add missing columns)
//! - Dialect-aware, parameterized DDL, upsert and catalog statements
//!
//! ## Planning a load
//!
//! ```rust
//! use oxide_ingest_core::prelude::*;
//!
//! let batch = RowBatch::from_records(vec![
//!     Record::new().field("id", 1_i64).field("name", "Ann"),
//!     Record::new().field("id", 2_i64).field("name", "Bob"),
//! ])
//! .unwrap();
//!
//! // The table does not exist yet.
//! let plan = plan(None, &batch, &TypeOverrides::new()).unwrap();
//! assert!(plan.create_table);
//!
//! let dialect = SqliteDialect::new();
//! let builder = StatementBuilder::new(&dialect);
//! let create = builder.build_create_table("players", &plan.create_columns, Some("id"));
//! assert_eq!(
//!     create.sql(),
//!     "CREATE TABLE \"players\" (\"id\" INTEGER PRIMARY KEY, \"name\" TEXT)"
//! );
//!
//! let rows = builder.build_upsert(&UpsertIntent::new("players", &batch).on_conflict(Some("id")));
//! assert_eq!(rows.len(), 2);
//! ```
//!
//! ## SQL Injection Prevention
//!
//! Data values are never part of the SQL text:
//!
//! ```rust
//! use oxide_ingest_core::prelude::*;
//!
//! let hostile = "'); DROP TABLE players; --";
//! let batch = RowBatch::from_records(vec![Record::new().field("name", hostile)]).unwrap();
//!
//! let dialect = SqliteDialect::new();
//! let stmts = StatementBuilder::new(&dialect).build_upsert(&UpsertIntent::new("players", &batch));
//!
//! assert_eq!(stmts[0].sql(), "INSERT INTO \"players\" (\"name\") VALUES (?)");
//! assert_eq!(stmts[0].params(), &[SqlValue::Text(hostile.into())]);
//! ```

pub mod batch;
pub mod builder;
pub mod dialect;
pub mod infer;
pub mod plan;
pub mod shape;
pub mod state;
pub mod statement;
pub mod value;

pub use batch::{BatchError, Record, RowBatch};
pub use dialect::{Dialect, MySqlDialect, PostgresDialect, SqliteDialect};
pub use infer::{ColumnSpec, ColumnType, InferenceError, TypeOverrides};
pub use plan::ReconciliationPlan;
pub use shape::TableShape;
pub use state::{InvalidTransition, LoadState};
pub use statement::{Statement, StatementBuilder, StatementIntent, UpsertIntent};
pub use value::{SqlValue, ToSqlValue};

/// Commonly used items.
pub mod prelude {
    pub use crate::batch::{Record, RowBatch};
    pub use crate::dialect::{Dialect, MySqlDialect, PostgresDialect, SqliteDialect};
    pub use crate::infer::{infer, infer_column, ColumnSpec, ColumnType, TypeOverrides};
    pub use crate::plan::{new_columns, plan, ReconciliationPlan};
    pub use crate::shape::TableShape;
    pub use crate::statement::{Statement, StatementBuilder, StatementIntent, UpsertIntent};
    pub use crate::value::{SqlValue, ToSqlValue};
}

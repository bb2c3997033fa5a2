//! Type-safe statement builders.
//!
//! Builders use the typestate pattern so an INSERT cannot be built before it
//! has a table and a row, and a conflict action cannot be chosen before the
//! conflict target. Every builder renders through a [`Dialect`], so quoting
//! and placeholders always match the target store.
//!
//! # Example
//!
//! ```rust
//! use oxide_ingest_core::builder::InsertBuilder;
//! use oxide_ingest_core::dialect::SqliteDialect;
//! use oxide_ingest_core::value::ToSqlValue;
//!
//! let (sql, params) = InsertBuilder::new()
//!     .into_table("players")
//!     .columns(&["id", "name"])
//!     .values(vec![1_i64.to_sql_value(), "Ann".to_sql_value()])
//!     .on_conflict("id")
//!     .do_update(&["name"])
//!     .build(&SqliteDialect::new());
//!
//! assert_eq!(
//!     sql,
//!     "INSERT INTO \"players\" (\"id\", \"name\") VALUES (?, ?) \
//!      ON CONFLICT (\"id\") DO UPDATE SET \"name\" = excluded.\"name\""
//! );
//! assert_eq!(params.len(), 2);
//! ```
//!
//! [`Dialect`]: crate::dialect::Dialect

mod insert;

pub use insert::{HasConflict, HasTable, HasValues, InsertBuilder, NoConflict, NoTable, NoValues};

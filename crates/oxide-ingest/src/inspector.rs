//! Catalog inspection.
//!
//! Reads which tables and columns exist through the same executor that
//! later applies changes, so the reads see the current transaction. All
//! names come back folded to canonical case.

use std::collections::BTreeSet;

use oxide_ingest_core::shape::canonical;
use oxide_ingest_core::{Dialect, SqlValue, Statement, StatementBuilder, TableShape};
use tracing::debug;

use crate::error::{LoadError, Result};
use crate::store::{StatementExecutor, StoreError};

/// Reads table shapes from a store catalog.
#[derive(Debug, Clone, Copy)]
pub struct SchemaInspector<'d, D: Dialect + ?Sized> {
    builder: StatementBuilder<'d, D>,
}

impl<'d, D: Dialect + ?Sized> SchemaInspector<'d, D> {
    /// Creates an inspector for `dialect`.
    #[must_use]
    pub const fn new(dialect: &'d D) -> Self {
        Self {
            builder: StatementBuilder::new(dialect),
        }
    }

    /// Names of the tables in `schema`.
    pub async fn list_tables<E>(&self, executor: &mut E, schema: &str) -> Result<BTreeSet<String>>
    where
        E: StatementExecutor + ?Sized,
    {
        let statement = self.builder.build_list_tables(schema);
        read_names(executor, &statement).await
    }

    /// Names of the columns of `table` in `schema`.
    pub async fn list_columns<E>(
        &self,
        executor: &mut E,
        schema: &str,
        table: &str,
    ) -> Result<BTreeSet<String>>
    where
        E: StatementExecutor + ?Sized,
    {
        let statement = self.builder.build_list_columns(schema, table);
        read_names(executor, &statement).await
    }

    /// Names of the columns of `table` that are each a complete PRIMARY
    /// KEY or UNIQUE constraint on their own.
    pub async fn list_key_columns<E>(
        &self,
        executor: &mut E,
        schema: &str,
        table: &str,
    ) -> Result<BTreeSet<String>>
    where
        E: StatementExecutor + ?Sized,
    {
        let statement = self.builder.build_list_key_columns(schema, table);
        read_names(executor, &statement).await
    }

    /// The shape of `table`, or `None` if it does not exist.
    pub async fn table_shape<E>(
        &self,
        executor: &mut E,
        schema: &str,
        table: &str,
    ) -> Result<Option<TableShape>>
    where
        E: StatementExecutor + ?Sized,
    {
        let tables = self.list_tables(executor, schema).await?;
        if !tables.contains(&canonical(table)) {
            return Ok(None);
        }

        let columns = self.list_columns(executor, schema, table).await?;
        Ok(Some(TableShape::new(table, columns)))
    }
}

async fn read_names<E>(executor: &mut E, statement: &Statement) -> Result<BTreeSet<String>>
where
    E: StatementExecutor + ?Sized,
{
    debug!(intent = %statement.intent(), sql = %statement.sql(), "Reading catalog");

    let schema_query = |source: StoreError| LoadError::SchemaQuery {
        intent: statement.intent().clone(),
        source,
    };

    let rows = executor.execute(statement).await.map_err(schema_query)?;
    rows.into_iter()
        .map(|row| match row.into_iter().next() {
            Some(SqlValue::Text(name)) => Ok(canonical(&name)),
            other => Err(schema_query(StoreError::Other(format!(
                "expected a name, catalog returned {}",
                other.as_ref().map_or("no value", SqlValue::kind)
            )))),
        })
        .collect()
}

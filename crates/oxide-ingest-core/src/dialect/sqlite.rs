//! SQLite dialect.
//!
//! SQLite's ALTER TABLE adds one column per statement, and its catalog lives
//! in `sqlite_master` and the `pragma_table_info` table-valued function
//! rather than in `information_schema`.

use super::Dialect;
use crate::infer::ColumnType;
use crate::value::SqlValue;

/// SQLite dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn default_schema(&self) -> &'static str {
        "main"
    }

    fn type_name(&self, column_type: ColumnType) -> &'static str {
        match column_type {
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "REAL",
            ColumnType::Text => "TEXT",
        }
    }

    fn supports_multi_column_alter(&self) -> bool {
        false
    }

    fn list_tables_sql(&self, schema: &str) -> (String, Vec<SqlValue>) {
        // The schema is part of the object name here, so it is quoted rather
        // than bound.
        (
            format!(
                "SELECT name FROM {}.sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
                self.quote_identifier(schema)
            ),
            Vec::new(),
        )
    }

    fn list_columns_sql(&self, schema: &str, table: &str) -> (String, Vec<SqlValue>) {
        (
            String::from("SELECT name FROM pragma_table_info(?, ?)"),
            vec![
                SqlValue::Text(table.to_string()),
                SqlValue::Text(schema.to_string()),
            ],
        )
    }

    fn list_key_columns_sql(&self, schema: &str, table: &str) -> (String, Vec<SqlValue>) {
        // A lone primary key column, or the only column of a unique index.
        let sql = String::from(
            "SELECT name FROM pragma_table_info(?, ?) WHERE pk = 1 \
             AND (SELECT COUNT(*) FROM pragma_table_info(?, ?) WHERE pk > 0) = 1 \
             UNION \
             SELECT ii.name FROM pragma_index_list(?, ?) AS il, \
             pragma_index_info(il.name, ?) AS ii \
             WHERE il.\"unique\" = 1 AND il.partial = 0 AND ii.name IS NOT NULL \
             AND (SELECT COUNT(*) FROM pragma_index_info(il.name, ?)) = 1",
        );
        let table = SqlValue::Text(table.to_string());
        let schema = SqlValue::Text(schema.to_string());
        let params = vec![
            table.clone(),
            schema.clone(),
            table.clone(),
            schema.clone(),
            table,
            schema.clone(),
            schema.clone(),
            schema,
        ];
        (sql, params)
    }
}

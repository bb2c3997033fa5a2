//! MySQL / MariaDB dialect.
//!
//! MySQL quotes identifiers with backticks, resolves conflicts with
//! `ON DUPLICATE KEY UPDATE` reading the incoming row through a row alias
//! (MySQL 8.0.19+), and cannot index an unbounded TEXT primary key.

use super::{key_columns_query, Dialect};
use crate::infer::ColumnType;
use crate::value::SqlValue;

/// Row alias naming the incoming values in `ON DUPLICATE KEY UPDATE`.
const INCOMING_ROW: &str = "incoming";

/// MySQL dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    /// Empty means "the connection's current database".
    fn default_schema(&self) -> &'static str {
        ""
    }

    fn identifier_quote(&self) -> char {
        '`'
    }

    fn type_name(&self, column_type: ColumnType) -> &'static str {
        match column_type {
            ColumnType::Integer => "BIGINT",
            ColumnType::Float => "DOUBLE",
            ColumnType::Text => "TEXT",
        }
    }

    fn key_type_name(&self, column_type: ColumnType) -> &'static str {
        match column_type {
            ColumnType::Text => "VARCHAR(255)",
            other => self.type_name(other),
        }
    }

    fn supports_multi_column_alter(&self) -> bool {
        true
    }

    fn upsert_clause(&self, key: &str, update_columns: &[&str]) -> String {
        if update_columns.is_empty() {
            // Self-assignment keeps the existing row.
            let quoted = self.quote_identifier(key);
            return format!(" ON DUPLICATE KEY UPDATE {quoted} = {quoted}");
        }

        let alias = self.quote_identifier(INCOMING_ROW);
        let updates: Vec<String> = update_columns
            .iter()
            .map(|col| {
                let quoted = self.quote_identifier(col);
                format!("{quoted} = {alias}.{quoted}")
            })
            .collect();
        format!(" AS {alias} ON DUPLICATE KEY UPDATE {}", updates.join(", "))
    }

    fn list_tables_sql(&self, schema: &str) -> (String, Vec<SqlValue>) {
        (
            String::from(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = COALESCE(NULLIF(?, ''), DATABASE()) \
                 AND table_type = 'BASE TABLE'",
            ),
            vec![SqlValue::Text(schema.to_string())],
        )
    }

    fn list_columns_sql(&self, schema: &str, table: &str) -> (String, Vec<SqlValue>) {
        (
            String::from(
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_schema = COALESCE(NULLIF(?, ''), DATABASE()) \
                 AND lower(table_name) = lower(?)",
            ),
            vec![
                SqlValue::Text(schema.to_string()),
                SqlValue::Text(table.to_string()),
            ],
        )
    }

    fn list_key_columns_sql(&self, schema: &str, table: &str) -> (String, Vec<SqlValue>) {
        (
            key_columns_query("COALESCE(NULLIF(?, ''), DATABASE())", "?"),
            vec![
                SqlValue::Text(schema.to_string()),
                SqlValue::Text(table.to_string()),
            ],
        )
    }
}

//! SQL dialect profiles.
//!
//! Different stores have slightly different SQL syntax. A dialect knows how
//! to quote identifiers, number placeholders, name column types, add several
//! columns at once, express an upsert and read its own catalog.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::infer::{ColumnSpec, ColumnType};
use crate::value::SqlValue;

/// Trait for dialect-specific SQL generation.
pub trait Dialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Schema searched when the caller does not name one.
    fn default_schema(&self) -> &'static str;

    /// Returns the identifier quote character.
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Quotes an identifier, doubling any embedded quote character.
    fn quote_identifier(&self, name: &str) -> String {
        let quote = self.identifier_quote();
        let escaped = name.replace(quote, &format!("{quote}{quote}"));
        format!("{quote}{escaped}{quote}")
    }

    /// Returns the placeholder for the 1-based parameter `index`.
    fn placeholder(&self, _index: usize) -> String {
        String::from("?")
    }

    /// Returns the store type name for an abstract column type.
    fn type_name(&self, column_type: ColumnType) -> &'static str;

    /// Returns the type name used for an identity key column.
    fn key_type_name(&self, column_type: ColumnType) -> &'static str {
        self.type_name(column_type)
    }

    /// Returns whether one ALTER TABLE may add several columns.
    fn supports_multi_column_alter(&self) -> bool;

    /// Generates a column definition.
    fn column_definition(&self, column: &ColumnSpec, primary_key: bool) -> String {
        if primary_key {
            format!(
                "{} {} PRIMARY KEY",
                self.quote_identifier(&column.name),
                self.key_type_name(column.column_type)
            )
        } else {
            format!(
                "{} {}",
                self.quote_identifier(&column.name),
                self.type_name(column.column_type)
            )
        }
    }

    /// Generates the conflict clause appended to an INSERT.
    ///
    /// `update_columns` are the non-key columns to overwrite; when empty the
    /// conflicting row is left untouched.
    fn upsert_clause(&self, key: &str, update_columns: &[&str]) -> String {
        let mut sql = format!(" ON CONFLICT ({})", self.quote_identifier(key));
        if update_columns.is_empty() {
            sql.push_str(" DO NOTHING");
        } else {
            sql.push_str(" DO UPDATE SET ");
            let updates: Vec<String> = update_columns
                .iter()
                .map(|col| {
                    let quoted = self.quote_identifier(col);
                    format!("{quoted} = excluded.{quoted}")
                })
                .collect();
            sql.push_str(&updates.join(", "));
        }
        sql
    }

    /// Catalog query listing the tables of `schema`, one name per row.
    fn list_tables_sql(&self, schema: &str) -> (String, Vec<SqlValue>) {
        (
            format!(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = {} AND table_type = 'BASE TABLE'",
                self.placeholder(1)
            ),
            vec![SqlValue::Text(schema.to_string())],
        )
    }

    /// Catalog query listing the columns of `table`, one name per row.
    fn list_columns_sql(&self, schema: &str, table: &str) -> (String, Vec<SqlValue>) {
        (
            format!(
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_schema = {} AND lower(table_name) = lower({})",
                self.placeholder(1),
                self.placeholder(2)
            ),
            vec![
                SqlValue::Text(schema.to_string()),
                SqlValue::Text(table.to_string()),
            ],
        )
    }

    /// Catalog query listing the columns of `table` that alone form a
    /// PRIMARY KEY or UNIQUE constraint, one name per row.
    fn list_key_columns_sql(&self, schema: &str, table: &str) -> (String, Vec<SqlValue>) {
        (
            key_columns_query(&self.placeholder(1), &self.placeholder(2)),
            vec![
                SqlValue::Text(schema.to_string()),
                SqlValue::Text(table.to_string()),
            ],
        )
    }
}

/// `information_schema` query for single-column key constraints.
fn key_columns_query(schema: &str, table: &str) -> String {
    format!(
        "SELECT kcu.column_name FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
         ON kcu.constraint_schema = tc.constraint_schema \
         AND kcu.constraint_name = tc.constraint_name \
         AND kcu.table_name = tc.table_name \
         WHERE tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE') \
         AND tc.table_schema = {schema} AND lower(tc.table_name) = lower({table}) \
         AND (SELECT COUNT(*) FROM information_schema.key_column_usage k \
         WHERE k.constraint_schema = tc.constraint_schema \
         AND k.constraint_name = tc.constraint_name \
         AND k.table_name = tc.table_name) = 1"
    )
}

//! PostgreSQL dialect.

use super::Dialect;
use crate::infer::ColumnType;

/// PostgreSQL dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn default_schema(&self) -> &'static str {
        "public"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn type_name(&self, column_type: ColumnType) -> &'static str {
        match column_type {
            ColumnType::Integer => "BIGINT",
            ColumnType::Float => "DOUBLE PRECISION",
            ColumnType::Text => "TEXT",
        }
    }

    fn supports_multi_column_alter(&self) -> bool {
        true
    }
}

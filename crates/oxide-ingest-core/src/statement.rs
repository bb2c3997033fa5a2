//! Statement generation.
//!
//! [`StatementBuilder`] turns reconciliation plans and row batches into
//! [`Statement`]s for one [`Dialect`]. A statement carries SQL text, the
//! parameters bound to its placeholders, and a [`StatementIntent`] saying
//! what it does. Errors and logs report the intent so that neither SQL text
//! nor data values leak into them.

use std::fmt;

use crate::batch::RowBatch;
use crate::builder::InsertBuilder;
use crate::dialect::Dialect;
use crate::infer::ColumnSpec;
use crate::shape::canonical;
use crate::value::SqlValue;

/// What a statement does, without its SQL or its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementIntent {
    /// Catalog read of the tables in a schema.
    ListTables {
        /// Schema searched.
        schema: String,
    },
    /// Catalog read of the columns of a table.
    ListColumns {
        /// Schema searched.
        schema: String,
        /// Table inspected.
        table: String,
    },
    /// Catalog read of the columns that alone form a PRIMARY KEY or UNIQUE
    /// constraint.
    ListKeyColumns {
        /// Schema searched.
        schema: String,
        /// Table inspected.
        table: String,
    },
    /// CREATE TABLE.
    CreateTable {
        /// Table created.
        table: String,
        /// Declared columns, in order.
        columns: Vec<String>,
        /// Column declared `PRIMARY KEY`.
        primary_key: Option<String>,
    },
    /// ALTER TABLE ... ADD COLUMN, for one or more columns.
    AddColumns {
        /// Table altered.
        table: String,
        /// Columns added by this statement.
        columns: Vec<String>,
    },
    /// Plain INSERT of one batch row.
    Insert {
        /// Target table.
        table: String,
        /// Columns written, in parameter order.
        columns: Vec<String>,
        /// Index of the row in its batch.
        row: usize,
    },
    /// INSERT of one batch row that updates on identity-key conflict.
    Upsert {
        /// Target table.
        table: String,
        /// Columns written, in parameter order.
        columns: Vec<String>,
        /// Identity key column.
        key: String,
        /// Index of the row in its batch.
        row: usize,
    },
}

impl StatementIntent {
    /// Returns true for CREATE TABLE and ADD COLUMN statements.
    #[must_use]
    pub const fn is_ddl(&self) -> bool {
        matches!(self, Self::CreateTable { .. } | Self::AddColumns { .. })
    }

    /// Returns true for read-only catalog queries.
    #[must_use]
    pub const fn is_catalog(&self) -> bool {
        matches!(
            self,
            Self::ListTables { .. } | Self::ListColumns { .. } | Self::ListKeyColumns { .. }
        )
    }

    /// The table the statement touches, if any.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::ListTables { .. } => None,
            Self::ListColumns { table, .. }
            | Self::ListKeyColumns { table, .. }
            | Self::CreateTable { table, .. }
            | Self::AddColumns { table, .. }
            | Self::Insert { table, .. }
            | Self::Upsert { table, .. } => Some(table),
        }
    }
}

impl fmt::Display for StatementIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListTables { schema } => write!(f, "list tables in schema '{schema}'"),
            Self::ListColumns { schema, table } => {
                write!(f, "list columns of '{table}' in schema '{schema}'")
            }
            Self::ListKeyColumns { schema, table } => {
                write!(f, "list key columns of '{table}' in schema '{schema}'")
            }
            Self::CreateTable { table, .. } => write!(f, "create table '{table}'"),
            Self::AddColumns { table, columns } => {
                write!(f, "add column(s) {} to '{table}'", columns.join(", "))
            }
            Self::Insert { table, row, .. } => write!(f, "insert row {row} into '{table}'"),
            Self::Upsert { table, key, row, .. } => {
                write!(f, "upsert row {row} into '{table}' on '{key}'")
            }
        }
    }
}

/// A parameterized statement ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<SqlValue>,
    intent: StatementIntent,
}

impl Statement {
    /// Creates a statement.
    #[must_use]
    pub fn new(sql: String, params: Vec<SqlValue>, intent: StatementIntent) -> Self {
        Self {
            sql,
            params,
            intent,
        }
    }

    /// SQL text with placeholders.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Values bound to the placeholders, in order.
    #[must_use]
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// What the statement does.
    #[must_use]
    pub fn intent(&self) -> &StatementIntent {
        &self.intent
    }
}

/// A request to write every record of a batch into a table.
#[derive(Debug, Clone)]
pub struct UpsertIntent<'a> {
    table: &'a str,
    batch: &'a RowBatch,
    conflict_key: Option<&'a str>,
}

impl<'a> UpsertIntent<'a> {
    /// Writes `batch` into `table` with plain INSERTs.
    #[must_use]
    pub const fn new(table: &'a str, batch: &'a RowBatch) -> Self {
        Self {
            table,
            batch,
            conflict_key: None,
        }
    }

    /// Sets the identity key that turns inserts into upserts.
    #[must_use]
    pub const fn on_conflict(mut self, key: Option<&'a str>) -> Self {
        self.conflict_key = key;
        self
    }

    /// Target table.
    #[must_use]
    pub const fn table(&self) -> &'a str {
        self.table
    }

    /// Rows to write.
    #[must_use]
    pub const fn batch(&self) -> &'a RowBatch {
        self.batch
    }

    /// Identity key, if conflicts update.
    #[must_use]
    pub const fn conflict_key(&self) -> Option<&'a str> {
        self.conflict_key
    }
}

/// Generates statements for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct StatementBuilder<'d, D: Dialect + ?Sized> {
    dialect: &'d D,
}

impl<'d, D: Dialect + ?Sized> StatementBuilder<'d, D> {
    /// Creates a builder for `dialect`.
    #[must_use]
    pub const fn new(dialect: &'d D) -> Self {
        Self { dialect }
    }

    /// Returns the dialect.
    #[must_use]
    pub const fn dialect(&self) -> &'d D {
        self.dialect
    }

    /// CREATE TABLE with every column in the given order.
    ///
    /// `primary_key`, matched ignoring case, is declared `PRIMARY KEY`.
    #[must_use]
    pub fn build_create_table(
        &self,
        table: &str,
        specs: &[ColumnSpec],
        primary_key: Option<&str>,
    ) -> Statement {
        let key = primary_key.map(canonical);
        let is_key = |spec: &ColumnSpec| key.as_deref() == Some(canonical(&spec.name).as_str());
        let definitions: Vec<String> = specs
            .iter()
            .map(|spec| self.dialect.column_definition(spec, is_key(spec)))
            .collect();

        let sql = format!(
            "CREATE TABLE {} ({})",
            self.dialect.quote_identifier(table),
            definitions.join(", ")
        );
        Statement::new(
            sql,
            Vec::new(),
            StatementIntent::CreateTable {
                table: table.to_string(),
                columns: specs.iter().map(|c| c.name.clone()).collect(),
                primary_key: specs.iter().find(|&c| is_key(c)).map(|c| c.name.clone()),
            },
        )
    }

    /// ALTER TABLE statements adding `specs`.
    ///
    /// One statement when the dialect can add several columns at once,
    /// otherwise one per column. No specs, no statements.
    #[must_use]
    pub fn build_add_columns(&self, table: &str, specs: &[ColumnSpec]) -> Vec<Statement> {
        if specs.is_empty() {
            return Vec::new();
        }

        let quoted_table = self.dialect.quote_identifier(table);
        let add = |spec: &ColumnSpec| {
            format!("ADD COLUMN {}", self.dialect.column_definition(spec, false))
        };
        let intent = |columns: &[ColumnSpec]| StatementIntent::AddColumns {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.name.clone()).collect(),
        };

        if self.dialect.supports_multi_column_alter() {
            let clauses: Vec<String> = specs.iter().map(add).collect();
            let sql = format!("ALTER TABLE {quoted_table} {}", clauses.join(", "));
            vec![Statement::new(sql, Vec::new(), intent(specs))]
        } else {
            specs
                .iter()
                .map(|spec| {
                    let sql = format!("ALTER TABLE {quoted_table} {}", add(spec));
                    Statement::new(sql, Vec::new(), intent(std::slice::from_ref(spec)))
                })
                .collect()
        }
    }

    /// One INSERT per record, each updating every non-key column on
    /// conflict when the intent names an identity key.
    #[must_use]
    pub fn build_upsert(&self, intent: &UpsertIntent<'_>) -> Vec<Statement> {
        let batch = intent.batch();
        let columns = batch.columns();

        // Use the batch's spelling of the key so the conflict target matches
        // the declared column.
        let key = intent.conflict_key().map(|k| {
            batch
                .column_index(k)
                .map_or_else(|| k.to_string(), |i| columns[i].clone())
        });
        let update_columns: Vec<&str> = key.as_deref().map_or_else(Vec::new, |k| {
            columns
                .iter()
                .filter(|c| canonical(c) != canonical(k))
                .map(String::as_str)
                .collect()
        });

        batch
            .records()
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let values: Vec<SqlValue> = record.iter().map(|(_, v)| v.clone()).collect();
                let insert = InsertBuilder::new()
                    .into_table(intent.table())
                    .columns(columns)
                    .values(values);

                match key.as_deref() {
                    Some(k) => {
                        let insert = insert.on_conflict(k);
                        let insert = if update_columns.is_empty() {
                            insert.do_nothing()
                        } else {
                            insert.do_update(update_columns.as_slice())
                        };
                        let (sql, params) = insert.build(self.dialect);
                        Statement::new(
                            sql,
                            params,
                            StatementIntent::Upsert {
                                table: intent.table().to_string(),
                                columns: columns.to_vec(),
                                key: k.to_string(),
                                row,
                            },
                        )
                    }
                    None => {
                        let (sql, params) = insert.build(self.dialect);
                        Statement::new(
                            sql,
                            params,
                            StatementIntent::Insert {
                                table: intent.table().to_string(),
                                columns: columns.to_vec(),
                                row,
                            },
                        )
                    }
                }
            })
            .collect()
    }

    /// Catalog query returning one table name per row.
    #[must_use]
    pub fn build_list_tables(&self, schema: &str) -> Statement {
        let (sql, params) = self.dialect.list_tables_sql(schema);
        Statement::new(
            sql,
            params,
            StatementIntent::ListTables {
                schema: schema.to_string(),
            },
        )
    }

    /// Catalog query returning one column name per row.
    #[must_use]
    pub fn build_list_columns(&self, schema: &str, table: &str) -> Statement {
        let (sql, params) = self.dialect.list_columns_sql(schema, table);
        Statement::new(
            sql,
            params,
            StatementIntent::ListColumns {
                schema: schema.to_string(),
                table: table.to_string(),
            },
        )
    }

    /// Catalog query returning the columns usable as a conflict target.
    #[must_use]
    pub fn build_list_key_columns(&self, schema: &str, table: &str) -> Statement {
        let (sql, params) = self.dialect.list_key_columns_sql(schema, table);
        Statement::new(
            sql,
            params,
            StatementIntent::ListKeyColumns {
                schema: schema.to_string(),
                table: table.to_string(),
            },
        )
    }
}

//! INSERT and upsert builder.

use std::marker::PhantomData;

use crate::dialect::Dialect;
use crate::value::{SqlValue, ToSqlValue};

// Typestate markers

/// Marker: No table specified yet.
pub struct NoTable;
/// Marker: Table has been specified.
pub struct HasTable;
/// Marker: No values specified yet.
pub struct NoValues;
/// Marker: Values have been specified.
pub struct HasValues;
/// Marker: No conflict target specified.
pub struct NoConflict;
/// Marker: Conflict target has been specified.
pub struct HasConflict;

/// Builds a single-row INSERT, optionally with a conflict clause.
///
/// Values are always emitted as placeholders and returned as parameters;
/// identifiers are quoted by the dialect at build time.
pub struct InsertBuilder<Table, Values, Conflict> {
    table: Option<String>,
    columns: Vec<String>,
    values: Vec<SqlValue>,
    conflict_key: Option<String>,
    update_columns: Vec<String>,
    _state: PhantomData<(Table, Values, Conflict)>,
}

impl InsertBuilder<NoTable, NoValues, NoConflict> {
    /// Creates a new INSERT builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: None,
            columns: vec![],
            values: vec![],
            conflict_key: None,
            update_columns: vec![],
            _state: PhantomData,
        }
    }
}

impl Default for InsertBuilder<NoTable, NoValues, NoConflict> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Table, Values, Conflict> InsertBuilder<Table, Values, Conflict> {
    fn transition<T, V, C>(self) -> InsertBuilder<T, V, C> {
        InsertBuilder {
            table: self.table,
            columns: self.columns,
            values: self.values,
            conflict_key: self.conflict_key,
            update_columns: self.update_columns,
            _state: PhantomData,
        }
    }
}

// Transition: NoTable -> HasTable
impl<Values, Conflict> InsertBuilder<NoTable, Values, Conflict> {
    /// Specifies the table to insert into.
    #[must_use]
    pub fn into_table(mut self, table: &str) -> InsertBuilder<HasTable, Values, Conflict> {
        self.table = Some(String::from(table));
        self.transition()
    }
}

impl<Values, Conflict> InsertBuilder<HasTable, Values, Conflict> {
    /// Specifies the columns to insert into.
    #[must_use]
    pub fn columns<S: AsRef<str>>(mut self, cols: &[S]) -> Self {
        self.columns = cols.iter().map(|s| String::from(s.as_ref())).collect();
        self
    }
}

// Transition: NoValues -> HasValues
impl<Conflict> InsertBuilder<HasTable, NoValues, Conflict> {
    /// Sets the row to insert.
    #[must_use]
    pub fn values<T: ToSqlValue>(mut self, vals: Vec<T>) -> InsertBuilder<HasTable, HasValues, Conflict> {
        self.values = vals.into_iter().map(ToSqlValue::to_sql_value).collect();
        self.transition()
    }
}

// Transition: NoConflict -> HasConflict
impl InsertBuilder<HasTable, HasValues, NoConflict> {
    /// Specifies the identity key that decides a conflict.
    ///
    /// Without a following [`do_update`](InsertBuilder::do_update) the
    /// conflicting row is left untouched.
    #[must_use]
    pub fn on_conflict(mut self, key: &str) -> InsertBuilder<HasTable, HasValues, HasConflict> {
        self.conflict_key = Some(String::from(key));
        self.transition()
    }
}

impl InsertBuilder<HasTable, HasValues, HasConflict> {
    /// Columns overwritten from the incoming row on conflict.
    #[must_use]
    pub fn do_update<S: AsRef<str>>(mut self, cols: &[S]) -> Self {
        self.update_columns = cols.iter().map(|s| String::from(s.as_ref())).collect();
        self
    }

    /// Leaves the conflicting row untouched.
    #[must_use]
    pub fn do_nothing(mut self) -> Self {
        self.update_columns.clear();
        self
    }
}

impl<Conflict> InsertBuilder<HasTable, HasValues, Conflict> {
    /// Builds the statement for `dialect` and returns SQL with parameters.
    #[must_use]
    pub fn build<D: Dialect + ?Sized>(self, dialect: &D) -> (String, Vec<SqlValue>) {
        let mut sql = String::from("INSERT INTO ");

        if let Some(ref table) = self.table {
            sql.push_str(&dialect.quote_identifier(table));
        }

        if !self.columns.is_empty() {
            let quoted: Vec<String> = self
                .columns
                .iter()
                .map(|c| dialect.quote_identifier(c))
                .collect();
            sql.push_str(" (");
            sql.push_str(&quoted.join(", "));
            sql.push(')');
        }

        let placeholders: Vec<String> = (1..=self.values.len())
            .map(|i| dialect.placeholder(i))
            .collect();
        sql.push_str(" VALUES (");
        sql.push_str(&placeholders.join(", "));
        sql.push(')');

        if let Some(ref key) = self.conflict_key {
            let updates: Vec<&str> = self.update_columns.iter().map(String::as_str).collect();
            sql.push_str(&dialect.upsert_clause(key, &updates));
        }

        (sql, self.values)
    }
}

//! Table shapes as reported by a store catalog.

use std::collections::BTreeSet;

/// Folds an identifier to the single case used for all comparisons.
///
/// Store catalogs frequently case-fold identifiers, so `Score` in a batch
/// and `score` in the catalog must compare equal.
#[must_use]
pub fn canonical(name: &str) -> String {
    name.to_lowercase()
}

/// The set of column names a table currently has.
///
/// A shape is a snapshot: it is re-read from the catalog on every load
/// cycle and never kept fresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableShape {
    table: String,
    columns: BTreeSet<String>,
}

impl TableShape {
    /// Creates a shape, folding every column name to canonical case.
    pub fn new<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            table: table.into(),
            columns: columns.into_iter().map(|c| canonical(c.as_ref())).collect(),
        }
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the canonical column names.
    #[must_use]
    pub fn columns(&self) -> &BTreeSet<String> {
        &self.columns
    }

    /// Returns whether the table has a column, ignoring case.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(&canonical(name))
    }

    /// Returns the names that this shape does not contain, in input order.
    pub fn missing<'a, I>(&self, names: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter(|name| !self.has_column(name))
            .collect()
    }
}

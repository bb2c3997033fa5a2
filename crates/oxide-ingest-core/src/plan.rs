//! Reconciliation planning.
//!
//! Compares an existing [`TableShape`] with an incoming [`RowBatch`] and
//! decides which DDL is needed. Plans only ever grow a table: columns are
//! never dropped or renamed.

use crate::batch::RowBatch;
use crate::infer::{infer_column, ColumnSpec, InferenceError, TypeOverrides};
use crate::shape::TableShape;

/// The schema changes needed before a batch can be written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconciliationPlan {
    /// Whether the table has to be created.
    pub create_table: bool,
    /// Full column declaration for CREATE TABLE. Empty unless `create_table`.
    pub create_columns: Vec<ColumnSpec>,
    /// Columns to add to an existing table. Empty when `create_table`.
    pub columns_to_add: Vec<ColumnSpec>,
}

impl ReconciliationPlan {
    /// Returns true if no DDL is needed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.create_table && self.columns_to_add.is_empty()
    }

    /// Names of the columns this plan adds to an existing table.
    #[must_use]
    pub fn added_column_names(&self) -> Vec<String> {
        self.columns_to_add.iter().map(|c| c.name.clone()).collect()
    }
}

/// Batch columns the table does not have yet, in batch order.
#[must_use]
pub fn new_columns<'a>(existing: &TableShape, batch: &'a RowBatch) -> Vec<&'a str> {
    existing.missing(batch.columns().iter().map(String::as_str))
}

/// Computes the plan for writing `batch` into a table with shape `existing`
/// (`None` when the table does not exist).
///
/// Types are inferred from the batch's own values, and only for the columns
/// that need declaring.
pub fn plan(
    existing: Option<&TableShape>,
    batch: &RowBatch,
    overrides: &TypeOverrides,
) -> Result<ReconciliationPlan, InferenceError> {
    let infer = |name: &str| infer_column(name, batch.column_values(name), overrides);

    match existing {
        None => Ok(ReconciliationPlan {
            create_table: true,
            create_columns: batch
                .columns()
                .iter()
                .map(|c| infer(c.as_str()))
                .collect::<Result<_, _>>()?,
            columns_to_add: Vec::new(),
        }),
        Some(shape) => Ok(ReconciliationPlan {
            create_table: false,
            create_columns: Vec::new(),
            columns_to_add: new_columns(shape, batch)
                .into_iter()
                .map(infer)
                .collect::<Result<_, _>>()?,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Record;
    use crate::infer::ColumnType;
    use crate::value::SqlValue;

    fn scores() -> RowBatch {
        RowBatch::from_records(vec![
            Record::new()
                .field("id", 1_i64)
                .field("name", "a")
                .field("score", 3.0_f64),
            Record::new()
                .field("id", 2_i64)
                .field("name", "b")
                .field("score", 4.5_f64),
        ])
        .unwrap()
    }

    #[test]
    fn test_missing_table_declares_every_column() {
        let plan = plan(None, &scores(), &TypeOverrides::new()).unwrap();
        assert!(plan.create_table);
        assert!(plan.columns_to_add.is_empty());
        assert_eq!(
            plan.create_columns,
            vec![
                ColumnSpec::new("id", ColumnType::Integer),
                ColumnSpec::new("name", ColumnType::Text),
                ColumnSpec::new("score", ColumnType::Float),
            ]
        );
    }

    #[test]
    fn test_existing_table_only_adds_new_columns() {
        let shape = TableShape::new("players", ["ID", "name"]);
        let plan = plan(Some(&shape), &scores(), &TypeOverrides::new()).unwrap();
        assert!(!plan.create_table);
        assert!(plan.create_columns.is_empty());
        assert_eq!(
            plan.columns_to_add,
            vec![ColumnSpec::new("score", ColumnType::Float)]
        );
        assert_eq!(plan.added_column_names(), vec!["score"]);
    }

    #[test]
    fn test_plan_never_removes_columns() {
        // The table has columns the batch does not mention; they stay.
        let shape = TableShape::new("players", ["id", "name", "score", "legacy"]);
        let plan = plan(Some(&shape), &scores(), &TypeOverrides::new()).unwrap();
        assert!(plan.is_noop());
    }

    #[test]
    fn test_columns_to_add_is_subset_of_difference() {
        let batch = scores();
        for existing in [vec![], vec!["id"], vec!["name", "other"], vec!["score"]] {
            let shape = TableShape::new("players", existing.clone());
            let plan = plan(Some(&shape), &batch, &TypeOverrides::new()).unwrap();
            for spec in &plan.columns_to_add {
                assert!(batch.has_column(&spec.name));
                assert!(!shape.has_column(&spec.name));
            }
            assert_eq!(
                plan.columns_to_add.len(),
                batch
                    .columns()
                    .iter()
                    .filter(|c| !shape.has_column(c))
                    .count()
            );
        }
    }

    #[test]
    fn test_all_null_column_fails_only_when_declared() {
        let batch = RowBatch::new(
            vec!["id".into(), "notes".into()],
            vec![vec![SqlValue::Int(1), SqlValue::Null]],
        )
        .unwrap();

        let err = plan(None, &batch, &TypeOverrides::new()).unwrap_err();
        assert_eq!(
            err,
            InferenceError::Undeterminable {
                column: "notes".into()
            }
        );

        // Already present: nothing to infer.
        let shape = TableShape::new("t", ["id", "notes"]);
        assert!(plan(Some(&shape), &batch, &TypeOverrides::new())
            .unwrap()
            .is_noop());
    }
}

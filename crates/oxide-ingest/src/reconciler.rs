//! Applying reconciliation plans.
//!
//! One cycle runs inside one transaction: read the table's shape, create the
//! table or add the missing columns, confirm the columns now exist, write
//! every row, commit. Any failure rolls the whole cycle back.

use oxide_ingest_core::plan::{new_columns, plan};
use oxide_ingest_core::shape::canonical;
use oxide_ingest_core::{
    Dialect, LoadState, ReconciliationPlan, RowBatch, SqlValue, Statement, StatementBuilder,
    UpsertIntent,
};
use tracing::{debug, info, warn};

use crate::error::{LoadError, Result};
use crate::inspector::SchemaInspector;
use crate::loader::{LoadOptions, LoadPreview, LoadResult};
use crate::store::{StatementExecutor, StoreError, TransactionScope};

/// Everything one load cycle needs.
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    /// Target table.
    pub table: &'a str,
    /// Schema holding the table.
    pub schema: &'a str,
    /// Identity key column, if rows are keyed.
    pub identity_key: Option<&'a str>,
    /// Rows to write.
    pub batch: &'a RowBatch,
    /// Policy switches.
    pub options: &'a LoadOptions,
}

impl LoadRequest<'_> {
    fn conflict_key(&self) -> Option<&str> {
        self.identity_key.filter(|_| self.options.upsert_on_conflict)
    }
}

/// Brings a table into agreement with a batch and writes the batch.
#[derive(Debug, Clone, Copy)]
pub struct SchemaReconciler<'d, D: Dialect + ?Sized> {
    builder: StatementBuilder<'d, D>,
    inspector: SchemaInspector<'d, D>,
}

impl<'d, D: Dialect + ?Sized> SchemaReconciler<'d, D> {
    /// Creates a reconciler for `dialect`.
    #[must_use]
    pub const fn new(dialect: &'d D) -> Self {
        Self {
            builder: StatementBuilder::new(dialect),
            inspector: SchemaInspector::new(dialect),
        }
    }

    /// Runs one complete cycle in a fresh transaction.
    pub async fn apply<S: TransactionScope>(
        &self,
        scope: &S,
        request: &LoadRequest<'_>,
    ) -> Result<LoadResult> {
        info!(
            table = %request.table,
            rows = request.batch.len(),
            "Loading batch"
        );

        let mut handle = scope.begin().await.map_err(LoadError::Transaction)?;
        let mut state = LoadState::Start;

        let err = match self.run(&mut handle, &mut state, request).await {
            Ok(result) => match scope.commit(handle).await {
                Ok(()) => {
                    transition(&mut state, LoadState::Committed, request.table)?;
                    info!(
                        table = %request.table,
                        rows_written = result.rows_written,
                        table_created = result.table_created,
                        columns_added = result.columns_added.len(),
                        "Load committed"
                    );
                    return Ok(result);
                }
                Err(source) => {
                    // The store discards a transaction it failed to commit.
                    warn!(
                        table = %request.table,
                        state = %state,
                        error = %source,
                        "Commit failed"
                    );
                    LoadError::Transaction(source)
                }
            },
            Err(err) => {
                warn!(table = %request.table, state = %state, error = %err, "Rolling back load");
                if let Err(rollback) = scope.rollback(handle).await {
                    warn!(table = %request.table, error = %rollback, "Rollback failed");
                }
                err
            }
        };

        transition(&mut state, LoadState::RolledBack, request.table)?;
        Err(err)
    }

    /// Computes the plan and every statement a cycle would run, then rolls
    /// back.
    pub async fn preview<S: TransactionScope>(
        &self,
        scope: &S,
        request: &LoadRequest<'_>,
    ) -> Result<LoadPreview> {
        let mut handle = scope.begin().await.map_err(LoadError::Transaction)?;
        let prepared = self.prepare(&mut handle, request).await;
        if let Err(rollback) = scope.rollback(handle).await {
            warn!(table = %request.table, error = %rollback, "Rollback failed");
        }

        let plan = prepared?;
        let mut statements = self.ddl(&plan, request);
        statements.extend(self.rows(request));
        Ok(LoadPreview { plan, statements })
    }

    async fn run<E: StatementExecutor + ?Sized>(
        &self,
        executor: &mut E,
        state: &mut LoadState,
        request: &LoadRequest<'_>,
    ) -> Result<LoadResult> {
        let plan = self.prepare(executor, request).await?;
        transition(state, LoadState::ShapeChecked, request.table)?;

        let ddl = self.ddl(&plan, request);
        for statement in &ddl {
            execute(executor, statement).await?;
        }
        let next = if plan.create_table {
            LoadState::TableCreated
        } else {
            LoadState::TableConfirmed
        };
        transition(state, next, request.table)?;

        if !plan.columns_to_add.is_empty() {
            self.confirm_columns(executor, request).await?;
        }
        transition(state, LoadState::ColumnsReconciled, request.table)?;

        let rows = self.rows(request);
        for statement in &rows {
            execute(executor, statement).await?;
        }
        transition(state, LoadState::RowsWritten, request.table)?;

        Ok(LoadResult {
            rows_written: rows.len(),
            table_created: plan.create_table,
            columns_added: plan.added_column_names(),
        })
    }

    /// Reads the shape, enforces the policy switches, checks that an
    /// existing table can resolve conflicts on the identity key, and plans
    /// the DDL.
    async fn prepare<E: StatementExecutor + ?Sized>(
        &self,
        executor: &mut E,
        request: &LoadRequest<'_>,
    ) -> Result<ReconciliationPlan> {
        let shape = self
            .inspector
            .table_shape(executor, request.schema, request.table)
            .await?;

        match &shape {
            None if !request.options.create_table_if_missing => {
                return Err(LoadError::MissingTable {
                    table: request.table.to_string(),
                });
            }
            Some(existing) if !request.options.add_missing_columns => {
                let missing = new_columns(existing, request.batch);
                if !missing.is_empty() {
                    return Err(LoadError::UnknownColumns {
                        table: request.table.to_string(),
                        columns: missing.into_iter().map(str::to_string).collect(),
                    });
                }
            }
            _ => {}
        }

        if let (Some(_), Some(key)) = (&shape, request.conflict_key()) {
            let keys = self
                .inspector
                .list_key_columns(executor, request.schema, request.table)
                .await?;
            if !keys.contains(&canonical(key)) {
                return Err(LoadError::KeyNotUnique {
                    table: request.table.to_string(),
                    key: key.to_string(),
                });
            }
        }

        let plan = plan(shape.as_ref(), request.batch, &request.options.type_overrides)?;
        debug!(
            table = %request.table,
            create_table = plan.create_table,
            columns_to_add = ?plan.added_column_names(),
            "Planned schema changes"
        );
        Ok(plan)
    }

    fn ddl(&self, plan: &ReconciliationPlan, request: &LoadRequest<'_>) -> Vec<Statement> {
        if plan.create_table {
            vec![self.builder.build_create_table(
                request.table,
                &plan.create_columns,
                request.identity_key,
            )]
        } else {
            self.builder.build_add_columns(request.table, &plan.columns_to_add)
        }
    }

    fn rows(&self, request: &LoadRequest<'_>) -> Vec<Statement> {
        let intent =
            UpsertIntent::new(request.table, request.batch).on_conflict(request.conflict_key());
        self.builder.build_upsert(&intent)
    }

    async fn confirm_columns<E: StatementExecutor + ?Sized>(
        &self,
        executor: &mut E,
        request: &LoadRequest<'_>,
    ) -> Result<()> {
        let columns = self
            .inspector
            .list_columns(executor, request.schema, request.table)
            .await?;
        let missing: Vec<String> = request
            .batch
            .columns()
            .iter()
            .filter(|c| !columns.contains(&canonical(c)))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LoadError::ShapeMismatch {
                table: request.table.to_string(),
                missing,
            })
        }
    }
}

async fn execute<E: StatementExecutor + ?Sized>(
    executor: &mut E,
    statement: &Statement,
) -> Result<Vec<Vec<SqlValue>>> {
    debug!(intent = %statement.intent(), sql = %statement.sql(), "Executing SQL");

    executor.execute(statement).await.map_err(|source| {
        let intent = statement.intent().clone();
        match source {
            StoreError::AlreadyExists(_) if intent.is_ddl() => {
                LoadError::DdlConflict { intent, source }
            }
            source if intent.is_catalog() => LoadError::SchemaQuery { intent, source },
            source => LoadError::Execution { intent, source },
        }
    })
}

fn transition(state: &mut LoadState, next: LoadState, table: &str) -> Result<()> {
    debug!(table = %table, from = %state, to = %next, "Load state");
    state.advance(next)?;
    Ok(())
}

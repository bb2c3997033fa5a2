#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use oxide_ingest::{SqliteStore, StatementExecutor, StoreError, TransactionScope};
use oxide_ingest_core::shape::canonical;
use oxide_ingest_core::{Record, RowBatch, SqlValue, Statement, StatementIntent};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tokio::sync::{Barrier, Notify};

// SQLite helpers

pub async fn create_test_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

pub async fn sqlite_store() -> SqliteStore {
    SqliteStore::new(create_test_pool().await)
}

/// A store on a fresh database file. Keep the directory alive while the
/// store is in use.
pub async fn disk_store() -> (tempfile::TempDir, SqliteStore) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("ingest.db").display());
    let store = SqliteStore::connect(&url).await.unwrap();
    (dir, store)
}

/// `(name, declared type, pk)` for every column of `table`.
pub async fn table_info(pool: &SqlitePool, table: &str) -> Vec<(String, String, i64)> {
    sqlx::query_as("SELECT name, type, pk FROM pragma_table_info(?)")
        .bind(table)
        .fetch_all(pool)
        .await
        .unwrap()
}

pub async fn column_names(pool: &SqlitePool, table: &str) -> Vec<String> {
    table_info(pool, table)
        .await
        .into_iter()
        .map(|(name, _, _)| name)
        .collect()
}

pub async fn table_exists(pool: &SqlitePool, table: &str) -> bool {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_optional(pool)
            .await
            .unwrap();
    row.is_some()
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM \"{table}\"");
    let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(pool).await.unwrap();
    count
}

// Batches

pub fn player(id: i64, name: &str, score: f64) -> Record {
    Record::new()
        .field("id", id)
        .field("name", name)
        .field("score", score)
}

pub fn players() -> RowBatch {
    RowBatch::from_records(vec![player(1, "a", 3.0), player(2, "b", 4.5)]).unwrap()
}

// In-memory store

/// Failures and timing the memory store injects.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Fail the n-th row write (1-based) of every transaction.
    pub fail_on_write: Option<usize>,
    /// Answer this many DDL statements with `AlreadyExists`.
    pub ddl_conflicts: usize,
    /// Delay before every statement.
    pub latency: Option<Duration>,
    /// Fail every catalog read.
    pub fail_catalog: bool,
    /// Report columns as of transaction start, ignoring its own ALTERs.
    pub stale_columns: bool,
    /// The first n table listings wait for each other.
    pub rendezvous: usize,
    /// Refuse every commit; the transaction is discarded.
    pub fail_commit: bool,
}

#[derive(Debug, Clone, Default)]
struct MemTable {
    columns: Vec<String>,
    key: Option<String>,
    rows: Vec<BTreeMap<String, SqlValue>>,
}

type Tables = BTreeMap<String, MemTable>;

#[derive(Debug, Clone)]
enum Op {
    Create {
        table: String,
        columns: Vec<String>,
        key: Option<String>,
    },
    AddColumns {
        table: String,
        columns: Vec<String>,
    },
    Write {
        table: String,
        columns: Vec<String>,
        values: Vec<SqlValue>,
        upsert_key: Option<String>,
    },
}

fn apply(tables: &mut Tables, op: &Op) -> Result<(), StoreError> {
    match op {
        Op::Create {
            table,
            columns,
            key,
        } => {
            let name = canonical(table);
            if tables.contains_key(&name) {
                return Err(StoreError::AlreadyExists(format!("table {table} already exists")));
            }
            tables.insert(
                name,
                MemTable {
                    columns: columns.iter().map(|c| canonical(c)).collect(),
                    key: key.as_deref().map(canonical),
                    rows: Vec::new(),
                },
            );
        }
        Op::AddColumns { table, columns } => {
            let t = table_mut(tables, table)?;
            for column in columns {
                let column = canonical(column);
                if t.columns.contains(&column) {
                    return Err(StoreError::AlreadyExists(format!(
                        "duplicate column name: {column}"
                    )));
                }
                t.columns.push(column);
            }
        }
        Op::Write {
            table,
            columns,
            values,
            upsert_key,
        } => {
            let t = table_mut(tables, table)?;
            let mut row = BTreeMap::new();
            for (column, value) in columns.iter().zip(values) {
                let column = canonical(column);
                if !t.columns.contains(&column) {
                    return Err(StoreError::Other(format!("no such column: {column}")));
                }
                row.insert(column, value.clone());
            }

            if let Some(upsert_key) = upsert_key {
                if t.key.as_deref() != Some(canonical(upsert_key).as_str()) {
                    return Err(StoreError::Other(
                        "ON CONFLICT clause does not match any PRIMARY KEY".into(),
                    ));
                }
            }

            let existing = t.key.as_ref().and_then(|key| {
                t.rows
                    .iter()
                    .position(|r| r.get(key).is_some() && r.get(key) == row.get(key))
            });
            match (existing, upsert_key) {
                (Some(i), Some(_)) => t.rows[i].extend(row),
                (Some(_), None) => {
                    return Err(StoreError::Other("UNIQUE constraint failed".into()));
                }
                (None, _) => t.rows.push(row),
            }
        }
    }
    Ok(())
}

fn table_mut<'a>(tables: &'a mut Tables, table: &str) -> Result<&'a mut MemTable, StoreError> {
    tables
        .get_mut(&canonical(table))
        .ok_or_else(|| StoreError::Other(format!("no such table: {table}")))
}

/// Object a transaction must own before creating it.
enum Claim {
    Table(String),
    Column(String, String),
}

impl Claim {
    fn key(&self) -> String {
        match self {
            Self::Table(t) => canonical(t),
            Self::Column(t, c) => format!("{}.{}", canonical(t), canonical(c)),
        }
    }

    fn exists(&self, tables: &Tables) -> bool {
        match self {
            Self::Table(t) => tables.contains_key(&canonical(t)),
            Self::Column(t, c) => tables
                .get(&canonical(t))
                .is_some_and(|t| t.columns.contains(&canonical(c))),
        }
    }
}

#[derive(Default)]
struct Shared {
    tables: Tables,
    claims: BTreeMap<String, u64>,
    next_txn: u64,
}

struct Inner {
    shared: Mutex<Shared>,
    changed: Notify,
    barrier: Barrier,
    barrier_slots: AtomicUsize,
    ddl_conflicts: AtomicUsize,
    faults: Faults,
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    creates: AtomicUsize,
}

/// A transactional store held in memory.
///
/// Each transaction works on a snapshot taken at `begin` and replays its
/// changes on commit. Creating a table or column first claims it; a second
/// transaction claiming the same object waits for the owner to finish and
/// gets `AlreadyExists` if the owner committed.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_faults(Faults::default())
    }

    pub fn with_faults(faults: Faults) -> Self {
        Self {
            inner: Arc::new(Inner {
                shared: Mutex::new(Shared::default()),
                changed: Notify::new(),
                barrier: Barrier::new(faults.rendezvous.max(1)),
                barrier_slots: AtomicUsize::new(faults.rendezvous),
                ddl_conflicts: AtomicUsize::new(faults.ddl_conflicts),
                faults,
                begins: AtomicUsize::new(0),
                commits: AtomicUsize::new(0),
                rollbacks: AtomicUsize::new(0),
                creates: AtomicUsize::new(0),
            }),
        }
    }

    /// Committed columns of `table`.
    pub fn columns(&self, table: &str) -> Option<Vec<String>> {
        let shared = self.inner.shared.lock().unwrap();
        shared.tables.get(&canonical(table)).map(|t| t.columns.clone())
    }

    /// Committed rows of `table`.
    pub fn rows(&self, table: &str) -> Vec<BTreeMap<String, SqlValue>> {
        let shared = self.inner.shared.lock().unwrap();
        shared
            .tables
            .get(&canonical(table))
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn open_claims(&self) -> usize {
        self.inner.shared.lock().unwrap().claims.len()
    }

    pub fn begins(&self) -> usize {
        self.inner.begins.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.inner.commits.load(Ordering::SeqCst)
    }

    /// Explicit rollbacks plus transactions dropped without a commit.
    pub fn rollbacks(&self) -> usize {
        self.inner.rollbacks.load(Ordering::SeqCst)
    }

    /// Committed CREATE TABLE statements.
    pub fn creates(&self) -> usize {
        self.inner.creates.load(Ordering::SeqCst)
    }
}

pub struct MemoryTransaction {
    inner: Arc<Inner>,
    id: u64,
    snapshot: Tables,
    view: Tables,
    ops: Vec<Op>,
    writes: usize,
    finished: bool,
}

impl MemoryTransaction {
    async fn rendezvous(&self) {
        let waiting = self
            .inner
            .barrier_slots
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if waiting {
            self.inner.barrier.wait().await;
        }
    }

    fn injected_conflict(&self, statement: &Statement) -> Result<(), StoreError> {
        let injected = self
            .inner
            .ddl_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::AlreadyExists(format!(
                "injected conflict: {}",
                statement.intent()
            )));
        }
        Ok(())
    }

    async fn claim(&self, claim: Claim) -> Result<(), StoreError> {
        let key = claim.key();
        loop {
            let notified = self.inner.changed.notified();
            {
                let mut shared = self.inner.shared.lock().unwrap();
                if claim.exists(&shared.tables) {
                    return Err(StoreError::AlreadyExists(format!("{key} already exists")));
                }
                let owner = shared.claims.get(&key).copied();
                if owner.map_or(true, |owner| owner == self.id) {
                    shared.claims.insert(key, self.id);
                    return Ok(());
                }
            }
            notified.await;
        }
    }

    fn stage(&mut self, op: Op) -> Result<(), StoreError> {
        apply(&mut self.view, &op)?;
        self.ops.push(op);
        Ok(())
    }

    fn release(&self) {
        let mut shared = self.inner.shared.lock().unwrap();
        shared.claims.retain(|_, owner| *owner != self.id);
        drop(shared);
        self.inner.changed.notify_waiters();
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            self.inner.rollbacks.fetch_add(1, Ordering::SeqCst);
        }
        self.release();
    }
}

#[async_trait]
impl StatementExecutor for MemoryTransaction {
    async fn execute(&mut self, statement: &Statement) -> Result<Vec<Vec<SqlValue>>, StoreError> {
        if let Some(latency) = self.inner.faults.latency {
            tokio::time::sleep(latency).await;
        }

        let catalog_down = || StoreError::Other("catalog unavailable".into());

        match statement.intent() {
            StatementIntent::ListTables { .. } => {
                self.rendezvous().await;
                if self.inner.faults.fail_catalog {
                    return Err(catalog_down());
                }
                Ok(self
                    .view
                    .keys()
                    .map(|t| vec![SqlValue::Text(t.clone())])
                    .collect())
            }
            StatementIntent::ListColumns { table, .. } => {
                if self.inner.faults.fail_catalog {
                    return Err(catalog_down());
                }
                let tables = if self.inner.faults.stale_columns {
                    &self.snapshot
                } else {
                    &self.view
                };
                Ok(tables
                    .get(&canonical(table))
                    .map(|t| {
                        t.columns
                            .iter()
                            .map(|c| vec![SqlValue::Text(c.clone())])
                            .collect()
                    })
                    .unwrap_or_default())
            }
            StatementIntent::ListKeyColumns { table, .. } => {
                if self.inner.faults.fail_catalog {
                    return Err(catalog_down());
                }
                Ok(self
                    .view
                    .get(&canonical(table))
                    .and_then(|t| t.key.clone())
                    .map(|key| vec![vec![SqlValue::Text(key)]])
                    .unwrap_or_default())
            }
            StatementIntent::CreateTable {
                table,
                columns,
                primary_key,
            } => {
                self.injected_conflict(statement)?;
                self.claim(Claim::Table(table.clone())).await?;
                self.stage(Op::Create {
                    table: table.clone(),
                    columns: columns.clone(),
                    key: primary_key.clone(),
                })?;
                Ok(Vec::new())
            }
            StatementIntent::AddColumns { table, columns } => {
                self.injected_conflict(statement)?;
                for column in columns {
                    self.claim(Claim::Column(table.clone(), column.clone()))
                        .await?;
                }
                self.stage(Op::AddColumns {
                    table: table.clone(),
                    columns: columns.clone(),
                })?;
                Ok(Vec::new())
            }
            StatementIntent::Insert { table, columns, .. } => {
                self.write(table, columns, None, statement.params())?;
                Ok(Vec::new())
            }
            StatementIntent::Upsert {
                table, columns, key, ..
            } => {
                self.write(table, columns, Some(key), statement.params())?;
                Ok(Vec::new())
            }
        }
    }
}

impl MemoryTransaction {
    fn write(
        &mut self,
        table: &str,
        columns: &[String],
        upsert_key: Option<&String>,
        values: &[SqlValue],
    ) -> Result<(), StoreError> {
        self.writes += 1;
        if self.inner.faults.fail_on_write == Some(self.writes) {
            return Err(StoreError::Other("injected write failure".into()));
        }
        self.stage(Op::Write {
            table: table.to_string(),
            columns: columns.to_vec(),
            values: values.to_vec(),
            upsert_key: upsert_key.cloned(),
        })
    }
}

#[async_trait]
impl TransactionScope for MemoryStore {
    type Handle = MemoryTransaction;

    async fn begin(&self) -> Result<Self::Handle, StoreError> {
        self.inner.begins.fetch_add(1, Ordering::SeqCst);
        let mut shared = self.inner.shared.lock().unwrap();
        shared.next_txn += 1;
        let snapshot = shared.tables.clone();
        Ok(MemoryTransaction {
            inner: Arc::clone(&self.inner),
            id: shared.next_txn,
            view: snapshot.clone(),
            snapshot,
            ops: Vec::new(),
            writes: 0,
            finished: false,
        })
    }

    async fn commit(&self, mut handle: Self::Handle) -> Result<(), StoreError> {
        if self.inner.faults.fail_commit {
            return Err(StoreError::Other("commit refused".into()));
        }
        {
            let mut shared = self.inner.shared.lock().unwrap();
            let mut tables = shared.tables.clone();
            for op in &handle.ops {
                apply(&mut tables, op)?;
            }
            shared.tables = tables;
        }

        let creates = handle
            .ops
            .iter()
            .filter(|op| matches!(op, Op::Create { .. }))
            .count();
        self.inner.creates.fetch_add(creates, Ordering::SeqCst);
        self.inner.commits.fetch_add(1, Ordering::SeqCst);
        handle.finished = true;
        Ok(())
    }

    async fn rollback(&self, mut handle: Self::Handle) -> Result<(), StoreError> {
        self.inner.rollbacks.fetch_add(1, Ordering::SeqCst);
        handle.finished = true;
        Ok(())
    }
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Version store
//!
//! The catalog of tables plus the row write locks. Writers go through
//! [`VersionStore::write`], which serializes writers per row and records
//! what it changed so the coordinator can later stamp or discard it.
//! Readers never take row locks; they only filter versions by visibility.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use super::gc::{self, GcStats};
use super::schema::TableSchema;
use super::table::{RowId, Table, TableId};
use super::value::Value;
use super::version::RowVersion;
use crate::exec::error::ExecutionError;
use crate::txn::lock::{LockAcquisition, RowKey, RowLockTable};
use crate::txn::log::WriteRecord;
use crate::txn::{CommitClock, CommitSeq, ReadView, Snapshot, TransactionId};

/// A row-level write
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// New row with already validated values
    Insert(Vec<Value>),
    /// Replace the current version of a row
    Update(RowId, Vec<Value>),
    /// Delete the current version of a row
    Delete(RowId),
}

/// Catalog and row storage shared by all transactions
#[derive(Debug)]
pub struct VersionStore {
    /// Keyed by lower-cased table name
    tables: RwLock<HashMap<String, Arc<Table>>>,
    next_table_id: AtomicU64,
    locks: RowLockTable,
    clock: Arc<CommitClock>,
}

impl VersionStore {
    pub fn new(clock: Arc<CommitClock>) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            next_table_id: AtomicU64::new(1),
            locks: RowLockTable::new(),
            clock,
        }
    }

    /// Register a table. Returns false when it already existed and
    /// `if_not_exists` was set.
    pub fn create_table(
        &self,
        schema: TableSchema,
        if_not_exists: bool,
    ) -> Result<bool, ExecutionError> {
        let key = schema.name.to_lowercase();
        let mut tables = self.tables.write();
        if tables.contains_key(&key) {
            if if_not_exists {
                return Ok(false);
            }
            return Err(ExecutionError::SchemaViolation(format!(
                "table {} already exists",
                schema.name
            )));
        }

        let id = TableId::from_u64(self.next_table_id.fetch_add(1, Ordering::Relaxed));
        log::info!("Created table {} ({})", schema.name, id);
        tables.insert(key, Arc::new(Table::new(id, schema)));
        Ok(true)
    }

    /// Remove a table from the catalog. Transactions that already wrote to
    /// it keep their own reference until they end.
    pub fn drop_table(&self, name: &str, if_exists: bool) -> Result<bool, ExecutionError> {
        match self.tables.write().remove(&name.to_lowercase()) {
            Some(table) => {
                log::info!("Dropped table {} ({})", table.name(), table.id());
                Ok(true)
            }
            None if if_exists => Ok(false),
            None => Err(unknown_table(name)),
        }
    }

    pub fn table(&self, name: &str) -> Result<Arc<Table>, ExecutionError> {
        self.tables
            .read()
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| unknown_table(name))
    }

    /// Table names as declared, sorted
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .read()
            .values()
            .map(|table| table.name().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn tables(&self) -> Vec<Arc<Table>> {
        self.tables.read().values().cloned().collect()
    }

    pub fn locks(&self) -> &RowLockTable {
        &self.locks
    }

    /// A view at the latest published commit
    pub fn fresh_view(&self, txn: TransactionId) -> ReadView {
        ReadView::new(txn, self.clock.last_commit())
    }

    /// Take the row's write lock, then read its newest committed (or own)
    /// values as of now
    pub fn lock_and_read(
        &self,
        txn: TransactionId,
        table: &Table,
        row: RowId,
        timeout: Option<Duration>,
    ) -> Result<Option<Vec<Value>>, ExecutionError> {
        self.lock_row(txn, table, row, timeout)?;
        Ok(self.read(table, row, self.fresh_view(txn)))
    }

    /// Like `lock_and_read`, returning the version itself for the write path
    fn lock_latest(
        &self,
        txn: TransactionId,
        table: &Table,
        row: RowId,
        timeout: Option<Duration>,
    ) -> Result<Option<Arc<RowVersion>>, ExecutionError> {
        self.lock_row(txn, table, row, timeout)?;
        Ok(table.read(row, self.fresh_view(txn)))
    }

    fn lock_row(
        &self,
        txn: TransactionId,
        table: &Table,
        row: RowId,
        timeout: Option<Duration>,
    ) -> Result<LockAcquisition, ExecutionError> {
        self.locks
            .acquire(RowKey::new(table.id(), row), txn, table.name(), timeout)
    }

    /// Apply one row-level write for `txn`
    ///
    /// Updates and deletes lock the row first (waiting for another writer
    /// to finish), then act on the version visible at the latest commit.
    /// An empty result means the row no longer exists.
    pub fn write(
        &self,
        txn: TransactionId,
        table: &Arc<Table>,
        op: WriteOp,
        timeout: Option<Duration>,
    ) -> Result<Vec<WriteRecord>, ExecutionError> {
        match op {
            WriteOp::Insert(values) => {
                let row = table.allocate_row_id()?;
                let version = Arc::new(RowVersion::new(values, txn));
                table.append_version(row, Arc::clone(&version));
                Ok(vec![WriteRecord::Created {
                    table: Arc::clone(table),
                    row,
                    version,
                }])
            }
            WriteOp::Update(row, values) => {
                let Some(current) = self.lock_latest(txn, table, row, timeout)? else {
                    return Ok(Vec::new());
                };
                let deleted = self.place_delete_marker(txn, table, row, current)?;
                let version = Arc::new(RowVersion::new(values, txn));
                table.append_version(row, Arc::clone(&version));
                Ok(vec![
                    deleted,
                    WriteRecord::Created {
                        table: Arc::clone(table),
                        row,
                        version,
                    },
                ])
            }
            WriteOp::Delete(row) => {
                let Some(current) = self.lock_latest(txn, table, row, timeout)? else {
                    return Ok(Vec::new());
                };
                Ok(vec![self.place_delete_marker(txn, table, row, current)?])
            }
        }
    }

    fn place_delete_marker(
        &self,
        txn: TransactionId,
        table: &Arc<Table>,
        row: RowId,
        version: Arc<RowVersion>,
    ) -> Result<WriteRecord, ExecutionError> {
        if !version.mark_deleted(txn) {
            return Err(ExecutionError::RuntimeError(format!(
                "{} row {} carries a delete marker from {:?} while locked by {}",
                table.name(),
                row,
                version.deleted_by(),
                txn
            )));
        }
        Ok(WriteRecord::Deleted {
            table: Arc::clone(table),
            row,
            version,
        })
    }

    /// Single-row read: values of the newest version of `row` visible to
    /// `view`, or `None` when no version is visible
    pub fn read(&self, table: &Table, row: RowId, view: ReadView) -> Option<Vec<Value>> {
        table.read(row, view).map(|version| version.values().to_vec())
    }

    /// Lazily iterate every row visible at `snapshot` to `reader`
    pub fn read_all(
        &self,
        table: Arc<Table>,
        snapshot: Arc<Snapshot>,
        reader: TransactionId,
    ) -> VisibleRows {
        VisibleRows::new(table, snapshot, reader)
    }

    /// Stamp every entry of a write set with its commit sequence
    pub fn stamp_commit(&self, records: &[WriteRecord], seq: CommitSeq) {
        for record in records {
            match record {
                WriteRecord::Created { version, .. } => version.stamp_created(seq),
                WriteRecord::Deleted { version, .. } => version.stamp_deleted(seq),
            }
        }
    }

    /// Undo a write set, newest entry first
    pub fn discard(&self, records: &[WriteRecord], txn: TransactionId) -> usize {
        let mut undone = 0;
        for record in records.iter().rev() {
            let reverted = match record {
                WriteRecord::Created {
                    table,
                    row,
                    version,
                } => table.remove_version(*row, version),
                WriteRecord::Deleted { version, .. } => version.clear_delete_marker(txn),
            };
            if reverted {
                undone += 1;
            }
        }
        undone
    }

    pub fn release_locks(&self, txn: TransactionId) -> usize {
        self.locks.release_all(txn)
    }

    /// Remove versions no snapshot at or after `horizon` can see
    pub fn collect_garbage(&self, horizon: CommitSeq) -> GcStats {
        gc::sweep(&self.tables(), horizon)
    }
}

fn unknown_table(name: &str) -> ExecutionError {
    ExecutionError::SchemaViolation(format!("unknown table {}", name))
}

/// Lazy, finite scan of the rows visible at one snapshot, in row id order
///
/// Holds its snapshot, so versions it may still yield are not collected.
#[derive(Debug)]
pub struct VisibleRows {
    table: Arc<Table>,
    view: ReadView,
    cursor: Option<RowId>,
    finished: bool,
    _snapshot: Arc<Snapshot>,
}

impl VisibleRows {
    fn new(table: Arc<Table>, snapshot: Arc<Snapshot>, reader: TransactionId) -> Self {
        Self {
            table,
            view: ReadView::new(reader, snapshot.boundary()),
            cursor: None,
            finished: false,
            _snapshot: snapshot,
        }
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }
}

impl Iterator for VisibleRows {
    type Item = (RowId, Arc<RowVersion>);

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let Some((row, chain)) = self.table.next_chain_after(self.cursor) else {
                self.finished = true;
                break;
            };
            self.cursor = Some(row);
            if let Some(version) = chain.latest_visible(self.view) {
                return Some((row, version));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::{ColumnDefinition, DataType};

    fn store() -> (Arc<CommitClock>, VersionStore) {
        let clock = CommitClock::new(16);
        let store = VersionStore::new(Arc::clone(&clock));
        let schema =
            TableSchema::new("T", vec![ColumnDefinition::new("i", DataType::TinyInt)]).unwrap();
        store.create_table(schema, false).unwrap();
        (clock, store)
    }

    fn commit(clock: &CommitClock, store: &VersionStore, txn: TransactionId, records: &[WriteRecord]) {
        let mut state = clock.lock();
        let seq = state.next_commit_seq().unwrap();
        store.stamp_commit(records, seq);
        state.publish(seq);
        state.deregister(txn);
        drop(state);
        store.release_locks(txn);
    }

    #[test]
    fn test_catalog_is_case_insensitive() {
        let (_, store) = store();
        assert!(store.table("t").is_ok());
        let schema =
            TableSchema::new("t", vec![ColumnDefinition::new("i", DataType::TinyInt)]).unwrap();
        assert!(store.create_table(schema.clone(), false).is_err());
        assert!(!store.create_table(schema, true).unwrap());
        assert_eq!(store.table_names(), vec!["T".to_string()]);

        assert!(store.drop_table("T", false).unwrap());
        assert!(!store.drop_table("T", true).unwrap());
        assert!(matches!(
            store.table("t"),
            Err(ExecutionError::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_insert_commit_and_scan() {
        let (clock, store) = store();
        let table = store.table("t").unwrap();
        let (writer, _) = clock.register().unwrap();
        let (reader, _) = clock.register().unwrap();

        let records = store
            .write(writer, &table, WriteOp::Insert(vec![Value::TinyInt(42)]), None)
            .unwrap();

        let before = Arc::new(clock.snapshot());
        assert_eq!(
            store
                .read_all(Arc::clone(&table), Arc::clone(&before), reader)
                .count(),
            0
        );
        assert_eq!(
            store
                .read_all(Arc::clone(&table), Arc::clone(&before), writer)
                .count(),
            1
        );

        commit(&clock, &store, writer, &records);

        // a scan opened before the commit keeps its boundary
        assert_eq!(
            store
                .read_all(Arc::clone(&table), before, reader)
                .count(),
            0
        );
        let after = Arc::new(clock.snapshot());
        let rows: Vec<_> = store.read_all(table, after, reader).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.values(), &[Value::TinyInt(42)]);
    }

    #[test]
    fn test_update_then_discard_restores_previous_version() {
        let (clock, store) = store();
        let table = store.table("t").unwrap();

        let (setup, _) = clock.register().unwrap();
        let records = store
            .write(setup, &table, WriteOp::Insert(vec![Value::TinyInt(1)]), None)
            .unwrap();
        commit(&clock, &store, setup, &records);
        let row = records[0].row();

        let (writer, _) = clock.register().unwrap();
        let records = store
            .write(writer, &table, WriteOp::Update(row, vec![Value::TinyInt(2)]), None)
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            store.read(&table, row, store.fresh_view(writer)),
            Some(vec![Value::TinyInt(2)])
        );

        assert_eq!(store.discard(&records, writer), 2);
        store.release_locks(writer);
        assert_eq!(
            store.read(&table, row, store.fresh_view(writer)),
            Some(vec![Value::TinyInt(1)])
        );
        assert_eq!(table.version_count(), 1);
    }

    #[test]
    fn test_lock_and_read_sees_latest_commit() {
        let (clock, store) = store();
        let table = store.table("t").unwrap();

        let (setup, _) = clock.register().unwrap();
        let records = store
            .write(setup, &table, WriteOp::Insert(vec![Value::TinyInt(1)]), None)
            .unwrap();
        let row = records[0].row();

        let (reader, _) = clock.register().unwrap();
        let old_view = store.fresh_view(reader);
        commit(&clock, &store, setup, &records);

        assert_eq!(store.read(&table, row, old_view), None);
        assert_eq!(
            store.lock_and_read(reader, &table, row, None).unwrap(),
            Some(vec![Value::TinyInt(1)])
        );
        assert_eq!(store.locks().held_count(reader), 1);
        store.release_locks(reader);
    }

    #[test]
    fn test_second_writer_times_out() {
        let (clock, store) = store();
        let table = store.table("t").unwrap();

        let (setup, _) = clock.register().unwrap();
        let records = store
            .write(setup, &table, WriteOp::Insert(vec![Value::TinyInt(1)]), None)
            .unwrap();
        commit(&clock, &store, setup, &records);
        let row = records[0].row();

        let (first, _) = clock.register().unwrap();
        let (second, _) = clock.register().unwrap();
        store
            .write(first, &table, WriteOp::Delete(row), None)
            .unwrap();
        let err = store
            .write(
                second,
                &table,
                WriteOp::Delete(row),
                Some(Duration::from_millis(20)),
            )
            .unwrap_err();
        assert!(err.is_retriable());
    }

    #[test]
    fn test_write_to_vanished_row_is_empty() {
        let (clock, store) = store();
        let table = store.table("t").unwrap();
        let (txn, _) = clock.register().unwrap();
        let records = store
            .write(txn, &table, WriteOp::Delete(RowId::from_u64(99)), None)
            .unwrap();
        assert!(records.is_empty());
    }
}

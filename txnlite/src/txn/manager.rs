// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction manager implementation
//!
//! Issues transaction handles, hands out statement snapshots and runs the
//! commit and rollback protocols against the version store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::exec::error::ExecutionError;
use crate::storage::VersionStore;

use super::clock::CommitClock;
use super::handle::TransactionHandle;
use super::isolation::{IsolationLevel, SnapshotScope};
use super::log::{RowChange, Savepoint, WriteRecord};
use super::snapshot::Snapshot;
use super::state::{AccessMode, CommitSeq, TransactionState};

/// Transaction manager handles the lifecycle of all transactions
#[derive(Debug)]
pub struct TransactionManager {
    clock: Arc<CommitClock>,
    store: Arc<VersionStore>,
    /// Default transaction characteristics
    default_isolation_level: IsolationLevel,
    default_access_mode: AccessMode,
    default_lock_timeout: Option<Duration>,
    committed: AtomicU64,
    rolled_back: AtomicU64,
}

impl TransactionManager {
    pub fn new(clock: Arc<CommitClock>, store: Arc<VersionStore>, config: &EngineConfig) -> Self {
        Self {
            clock,
            store,
            default_isolation_level: config.default_isolation_level,
            default_access_mode: config.default_access_mode,
            default_lock_timeout: config.lock_timeout(),
            committed: AtomicU64::new(0),
            rolled_back: AtomicU64::new(0),
        }
    }

    pub fn clock(&self) -> &Arc<CommitClock> {
        &self.clock
    }

    pub fn store(&self) -> &Arc<VersionStore> {
        &self.store
    }

    /// Start a new transaction
    pub fn start_transaction(
        &self,
        isolation_level: Option<IsolationLevel>,
        access_mode: Option<AccessMode>,
    ) -> Result<TransactionHandle, ExecutionError> {
        let isolation_level = isolation_level.unwrap_or(self.default_isolation_level);
        let access_mode = access_mode.unwrap_or(self.default_access_mode);

        if !isolation_level.is_supported() {
            return Err(ExecutionError::UnsupportedIsolationLevel(
                isolation_level.as_str().to_string(),
            ));
        }

        let (id, _) = self.clock.register()?;
        let pinned = match isolation_level.snapshot_scope() {
            SnapshotScope::Transaction => Some(Arc::new(self.clock.snapshot())),
            SnapshotScope::Statement => None,
        };

        log::info!(
            "BEGIN TRANSACTION {} - {} isolation level, {} access mode",
            id,
            isolation_level,
            access_mode
        );

        let state = TransactionState::new(id, isolation_level, access_mode);
        Ok(TransactionHandle::new(
            state,
            pinned,
            self.default_lock_timeout,
        ))
    }

    /// Read boundary for the next statement of `handle`
    ///
    /// READ COMMITTED pins the latest commit; REPEATABLE READ reuses the
    /// snapshot taken at BEGIN.
    pub fn statement_snapshot(
        &self,
        handle: &TransactionHandle,
    ) -> Result<Arc<Snapshot>, ExecutionError> {
        let mut state = handle.lock_state();
        if !state.is_active() {
            return Err(ExecutionError::TransactionClosed {
                id: state.id,
                status: state.status,
            });
        }
        state.statement_count += 1;
        drop(state);

        Ok(match handle.pinned_snapshot() {
            Some(snapshot) => snapshot,
            None => Arc::new(self.clock.snapshot()),
        })
    }

    /// Mark the start of a statement in the transaction's write set
    pub(crate) fn savepoint(&self, handle: &TransactionHandle) -> Savepoint {
        handle.lock_log().savepoint()
    }

    /// Undo everything the transaction wrote after `savepoint`
    ///
    /// Used when a statement fails partway. Row locks the statement took stay
    /// held until the transaction ends.
    pub(crate) fn rollback_statement(
        &self,
        handle: &TransactionHandle,
        savepoint: Savepoint,
    ) -> usize {
        let state = handle.lock_state();
        if !state.is_active() {
            return 0;
        }
        let records = handle.lock_log().rollback_to(savepoint);
        let undone = self.store.discard(&records, state.id);
        if undone > 0 {
            log::debug!("{} statement undone - {} writes reverted", state.id, undone);
        }
        undone
    }

    /// Add the entries of one row change to the transaction's write set
    ///
    /// If the transaction ended while the write was in progress (a rollback
    /// from another thread), the write is undone on the spot.
    pub(crate) fn record_writes(
        &self,
        handle: &TransactionHandle,
        change: RowChange,
        records: Vec<WriteRecord>,
    ) -> Result<(), ExecutionError> {
        let state = handle.lock_state();
        if !state.is_active() {
            let (id, status) = (state.id, state.status);
            drop(state);
            self.store.discard(&records, id);
            self.store.release_locks(id);
            return Err(ExecutionError::TransactionClosed { id, status });
        }
        handle.lock_log().record(change, records);
        Ok(())
    }

    /// Commit a transaction
    ///
    /// Stamping, publishing the new commit sequence and leaving the active
    /// set happen in one clock critical section; row locks are released
    /// after it.
    pub fn commit_transaction(
        &self,
        handle: &TransactionHandle,
    ) -> Result<CommitSeq, ExecutionError> {
        let mut state = handle.lock_state();
        if !state.is_active() {
            return Err(ExecutionError::InvalidTransactionState {
                id: state.id,
                status: state.status,
            });
        }

        let mut log = handle.lock_log();
        let seq = {
            let mut clock = self.clock.lock();
            let seq = clock.next_commit_seq()?;
            self.store.stamp_commit(log.records(), seq);
            state.commit(seq);
            clock.publish(seq);
            clock.deregister(state.id);
            seq
        };
        let summary = log.summary(state.id);
        log.take_records();
        drop(log);
        drop(state);

        self.store.release_locks(handle.id());
        drop(handle.take_pinned_snapshot());
        self.committed.fetch_add(1, Ordering::Relaxed);

        log::info!("COMMIT TRANSACTION at {} - {}", seq, summary);
        Ok(seq)
    }

    /// Rollback a transaction
    pub fn rollback_transaction(&self, handle: &TransactionHandle) -> Result<(), ExecutionError> {
        let mut state = handle.lock_state();
        if !state.is_active() {
            return Err(ExecutionError::InvalidTransactionState {
                id: state.id,
                status: state.status,
            });
        }

        let records = handle.lock_log().take_records();
        let undone = self.store.discard(&records, state.id);
        {
            let mut clock = self.clock.lock();
            state.rollback();
            clock.deregister(state.id);
        }
        let id = state.id;
        drop(state);

        self.store.release_locks(id);
        drop(handle.take_pinned_snapshot());
        self.rolled_back.fetch_add(1, Ordering::Relaxed);

        log::info!("ROLLBACK TRANSACTION {} - {} writes undone", id, undone);
        Ok(())
    }

    /// Get transaction statistics
    pub fn get_statistics(&self) -> TransactionStatistics {
        TransactionStatistics {
            active_transactions: self.clock.active_count() as u64,
            committed_transactions: self.committed.load(Ordering::Relaxed),
            rolled_back_transactions: self.rolled_back.load(Ordering::Relaxed),
            last_commit: self.clock.last_commit(),
            oldest_active_boundary: self.clock.oldest_active_boundary(),
            pinned_snapshots: self.clock.pinned_snapshot_count(),
            locked_rows: self.store.locks().total_locked(),
        }
    }
}

/// Transaction statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransactionStatistics {
    pub active_transactions: u64,
    pub committed_transactions: u64,
    pub rolled_back_transactions: u64,
    pub last_commit: CommitSeq,
    /// Boundary the oldest active transaction began at
    pub oldest_active_boundary: Option<CommitSeq>,
    pub pinned_snapshots: usize,
    pub locked_rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ColumnDefinition, DataType, TableSchema, Value, WriteOp};
    use crate::txn::TransactionStatus;

    fn manager() -> TransactionManager {
        let clock = CommitClock::new(8);
        let store = Arc::new(VersionStore::new(Arc::clone(&clock)));
        let schema =
            TableSchema::new("t", vec![ColumnDefinition::new("i", DataType::TinyInt)]).unwrap();
        store.create_table(schema, false).unwrap();
        TransactionManager::new(clock, store, &EngineConfig::default())
    }

    fn insert(manager: &TransactionManager, handle: &TransactionHandle, value: u8) {
        let table = manager.store().table("t").unwrap();
        let records = manager
            .store()
            .write(
                handle.id(),
                &table,
                WriteOp::Insert(vec![Value::TinyInt(value)]),
                None,
            )
            .unwrap();
        manager
            .record_writes(handle, RowChange::Inserted, records)
            .unwrap();
    }

    fn visible_count(manager: &TransactionManager, handle: &TransactionHandle) -> usize {
        let table = manager.store().table("t").unwrap();
        let snapshot = manager.statement_snapshot(handle).unwrap();
        manager
            .store()
            .read_all(table, snapshot, handle.id())
            .count()
    }

    #[test]
    fn test_unsupported_isolation_levels_rejected() {
        let manager = manager();
        for level in [IsolationLevel::ReadUncommitted, IsolationLevel::Serializable] {
            assert!(matches!(
                manager.start_transaction(Some(level), None),
                Err(ExecutionError::UnsupportedIsolationLevel(_))
            ));
        }
        assert_eq!(manager.clock().active_count(), 0);
    }

    #[test]
    fn test_commit_publishes_writes() {
        let manager = manager();
        let writer = manager.start_transaction(None, None).unwrap();
        let reader = manager.start_transaction(None, None).unwrap();

        insert(&manager, &writer, 42);
        assert_eq!(visible_count(&manager, &writer), 1);
        assert_eq!(visible_count(&manager, &reader), 0);

        let seq = manager.commit_transaction(&writer).unwrap();
        assert_eq!(seq, CommitSeq::from_u64(1));
        assert_eq!(writer.commit_seq(), Some(seq));
        assert_eq!(visible_count(&manager, &reader), 1);

        let stats = manager.get_statistics();
        assert_eq!(stats.committed_transactions, 1);
        assert_eq!(stats.active_transactions, 1);
        assert_eq!(stats.locked_rows, 0);
    }

    #[test]
    fn test_rollback_discards_writes() {
        let manager = manager();
        let txn = manager.start_transaction(None, None).unwrap();
        insert(&manager, &txn, 1);
        manager.rollback_transaction(&txn).unwrap();

        let table = manager.store().table("t").unwrap();
        assert_eq!(table.version_count(), 0);
        assert_eq!(txn.status(), TransactionStatus::RolledBack);
        assert!(txn.commit_seq().is_none());
    }

    #[test]
    fn test_terminal_state_is_final() {
        let manager = manager();
        let txn = manager.start_transaction(None, None).unwrap();
        manager.commit_transaction(&txn).unwrap();

        assert!(matches!(
            manager.commit_transaction(&txn),
            Err(ExecutionError::InvalidTransactionState { .. })
        ));
        assert!(matches!(
            manager.rollback_transaction(&txn),
            Err(ExecutionError::InvalidTransactionState { .. })
        ));
        assert!(matches!(
            manager.statement_snapshot(&txn),
            Err(ExecutionError::TransactionClosed { .. })
        ));
        assert_eq!(txn.status(), TransactionStatus::Committed);
    }

    #[test]
    fn test_repeatable_read_keeps_begin_boundary() {
        let manager = manager();
        let reader = manager
            .start_transaction(Some(IsolationLevel::RepeatableRead), None)
            .unwrap();

        let writer = manager.start_transaction(None, None).unwrap();
        insert(&manager, &writer, 5);
        manager.commit_transaction(&writer).unwrap();

        assert_eq!(visible_count(&manager, &reader), 0);
        manager.commit_transaction(&reader).unwrap();
        assert_eq!(manager.clock().pinned_snapshot_count(), 0);
    }

    #[test]
    fn test_write_after_concurrent_rollback_is_undone() {
        let manager = manager();
        let txn = manager.start_transaction(None, None).unwrap();
        manager.rollback_transaction(&txn).unwrap();

        let table = manager.store().table("t").unwrap();
        let records = manager
            .store()
            .write(txn.id(), &table, WriteOp::Insert(vec![Value::TinyInt(1)]), None)
            .unwrap();
        assert!(matches!(
            manager.record_writes(&txn, RowChange::Inserted, records),
            Err(ExecutionError::TransactionClosed { .. })
        ));
        assert_eq!(table.version_count(), 0);
    }
}

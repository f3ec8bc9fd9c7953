// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Session-scoped transaction state management
//!
//! Tracks the explicit transaction a session has open (if any) and whether
//! statements outside one commit on their own.

use parking_lot::RwLock;

use crate::coordinator::Database;
use crate::exec::ExecutionError;
use crate::txn::{AccessMode, CommitSeq, IsolationLevel, TransactionHandle};

/// Session-scoped transaction state
#[derive(Debug)]
pub struct SessionTransactionState {
    /// Current explicit transaction for this session (if any)
    current_transaction: RwLock<Option<TransactionHandle>>,

    /// Auto-commit mode for this session
    auto_commit: RwLock<bool>,
}

impl Default for SessionTransactionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTransactionState {
    pub fn new() -> Self {
        Self {
            current_transaction: RwLock::new(None),
            auto_commit: RwLock::new(true),
        }
    }

    pub fn current_transaction(&self) -> Option<TransactionHandle> {
        self.current_transaction.read().clone()
    }

    pub fn has_active_transaction(&self) -> bool {
        self.current_transaction.read().is_some()
    }

    pub fn is_auto_commit(&self) -> bool {
        *self.auto_commit.read()
    }

    /// With auto-commit off, a statement outside BEGIN opens a transaction
    /// that stays open until COMMIT or ROLLBACK
    pub fn set_auto_commit(&self, enabled: bool) {
        *self.auto_commit.write() = enabled;
    }

    /// Begin a new transaction
    pub fn begin_transaction(
        &self,
        db: &Database,
        isolation_level: Option<IsolationLevel>,
        access_mode: Option<AccessMode>,
    ) -> Result<TransactionHandle, ExecutionError> {
        let mut current = self.current_transaction.write();
        if let Some(open) = current.as_ref() {
            return Err(ExecutionError::TransactionInProgress(open.id()));
        }

        let handle = db.begin_with(isolation_level, access_mode)?;
        *current = Some(handle.clone());

        log::info!("Session began transaction: {}", handle.id());
        Ok(handle)
    }

    /// Commit the current transaction
    ///
    /// If the commit fails while the transaction is still active, the
    /// session keeps it so that ROLLBACK can end it.
    pub fn commit_transaction(&self, db: &Database) -> Result<CommitSeq, ExecutionError> {
        let mut current = self.current_transaction.write();
        let handle = current
            .clone()
            .ok_or(ExecutionError::NoActiveTransaction("commit"))?;

        match db.commit(&handle) {
            Ok(seq) => {
                *current = None;
                log::info!("Session committed transaction: {}", handle.id());
                Ok(seq)
            }
            Err(e) => {
                if !handle.is_active() {
                    *current = None;
                }
                Err(e)
            }
        }
    }

    /// Rollback the current transaction
    pub fn rollback_transaction(&self, db: &Database) -> Result<(), ExecutionError> {
        let handle = self
            .take_current()
            .ok_or(ExecutionError::NoActiveTransaction("rollback"))?;

        db.rollback(&handle)?;
        log::info!("Session rolled back transaction: {}", handle.id());
        Ok(())
    }

    pub(crate) fn take_current(&self) -> Option<TransactionHandle> {
        self.current_transaction.write().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::txn::TransactionStatus;

    fn database() -> Database {
        Database::with_config(EngineConfig::default().without_gc()).unwrap()
    }

    #[test]
    fn test_begin_commit_cycle() {
        let db = database();
        let state = SessionTransactionState::new();
        assert!(state.is_auto_commit());

        let handle = state
            .begin_transaction(&db, None, None)
            .unwrap();
        assert!(state.has_active_transaction());
        assert_eq!(
            state.begin_transaction(&db, None, None).unwrap_err(),
            ExecutionError::TransactionInProgress(handle.id())
        );

        state.commit_transaction(&db).unwrap();
        assert_eq!(handle.status(), TransactionStatus::Committed);
        assert!(!state.has_active_transaction());
        assert_eq!(
            state.commit_transaction(&db).unwrap_err(),
            ExecutionError::NoActiveTransaction("commit")
        );
        assert_eq!(
            state.rollback_transaction(&db).unwrap_err(),
            ExecutionError::NoActiveTransaction("rollback")
        );
    }

    #[test]
    fn test_commit_of_externally_ended_transaction_clears_state() {
        let db = database();
        let state = SessionTransactionState::new();
        let handle = state
            .begin_transaction(&db, None, None)
            .unwrap();
        db.rollback(&handle).unwrap();

        assert!(matches!(
            state.commit_transaction(&db),
            Err(ExecutionError::InvalidTransactionState { .. })
        ));
        assert!(!state.has_active_transaction());
    }

    #[test]
    fn test_failed_commit_keeps_transaction_for_rollback() {
        let db = database();
        db.exec_autocommit("create table t (i tinyint)").unwrap();
        let state = SessionTransactionState::new();
        let handle = state.begin_transaction(&db, None, None).unwrap();
        db.exec(&handle, "insert into t values (1)").unwrap();
        db.exhaust_commit_sequence();

        assert!(matches!(
            state.commit_transaction(&db),
            Err(ExecutionError::CapacityExceeded(_))
        ));
        assert!(state.has_active_transaction());
        assert!(handle.is_active());

        state.rollback_transaction(&db).unwrap();
        assert_eq!(handle.status(), TransactionStatus::RolledBack);
        assert!(!state.has_active_transaction());
        assert_eq!(db.statistics().active_transactions, 0);
    }
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Caller-held transaction handles

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use super::isolation::IsolationLevel;
use super::log::TransactionLog;
use super::snapshot::Snapshot;
use super::state::{AccessMode, CommitSeq, TransactionId, TransactionState, TransactionStatus};
use crate::exec::error::ExecutionError;

/// Handle to one transaction
///
/// Cloning yields another handle to the same transaction. A handle is meant
/// to be driven by one caller at a time; `rollback` from another thread is
/// the way to cancel work in progress.
#[derive(Debug, Clone)]
pub struct TransactionHandle {
    inner: Arc<TransactionInner>,
}

#[derive(Debug)]
struct TransactionInner {
    id: TransactionId,
    isolation_level: IsolationLevel,
    access_mode: AccessMode,
    state: Mutex<TransactionState>,
    log: Mutex<TransactionLog>,
    /// Transaction-wide snapshot for REPEATABLE READ
    pinned: Mutex<Option<Arc<Snapshot>>>,
    lock_timeout: Mutex<Option<Duration>>,
}

impl TransactionHandle {
    pub(crate) fn new(
        state: TransactionState,
        pinned: Option<Arc<Snapshot>>,
        lock_timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(TransactionInner {
                id: state.id,
                isolation_level: state.isolation_level,
                access_mode: state.access_mode,
                state: Mutex::new(state),
                log: Mutex::new(TransactionLog::new()),
                pinned: Mutex::new(pinned),
                lock_timeout: Mutex::new(lock_timeout),
            }),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.inner.id
    }

    pub fn isolation_level(&self) -> IsolationLevel {
        self.inner.isolation_level
    }

    pub fn access_mode(&self) -> AccessMode {
        self.inner.access_mode
    }

    pub fn status(&self) -> TransactionStatus {
        self.inner.state.lock().status
    }

    pub fn is_active(&self) -> bool {
        self.status() == TransactionStatus::Active
    }

    /// Commit sequence, once committed
    pub fn commit_seq(&self) -> Option<CommitSeq> {
        self.inner.state.lock().commit_seq
    }

    /// Copy of the lifecycle record
    pub fn state(&self) -> TransactionState {
        self.inner.state.lock().clone()
    }

    /// Bound on how long a write waits for another transaction's row lock;
    /// `None` waits until that transaction ends
    pub fn lock_timeout(&self) -> Option<Duration> {
        *self.inner.lock_timeout.lock()
    }

    pub fn set_lock_timeout(&self, timeout: Option<Duration>) {
        *self.inner.lock_timeout.lock() = timeout;
    }

    /// Number of versions created or marked deleted so far
    pub fn write_count(&self) -> usize {
        self.inner.log.lock().len()
    }

    /// Fail with `TransactionClosed` unless the transaction is active
    pub(crate) fn ensure_active(&self) -> Result<(), ExecutionError> {
        let state = self.inner.state.lock();
        if state.is_active() {
            Ok(())
        } else {
            Err(ExecutionError::TransactionClosed {
                id: state.id,
                status: state.status,
            })
        }
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, TransactionState> {
        self.inner.state.lock()
    }

    pub(crate) fn lock_log(&self) -> MutexGuard<'_, TransactionLog> {
        self.inner.log.lock()
    }

    pub(crate) fn pinned_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.pinned.lock().clone()
    }

    /// Release the transaction-wide snapshot; the caller drops it
    pub(crate) fn take_pinned_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.pinned.lock().take()
    }
}

impl PartialEq for TransactionHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for TransactionHandle {}

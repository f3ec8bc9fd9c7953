// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Commit clock: the process-wide transaction registry
//!
//! The transaction-id counter, the last assigned commit sequence, the active
//! transaction set and the pinned snapshot boundaries all live behind one
//! mutex. Commit visibility and active-set membership therefore change
//! together: a commit stamps its versions, publishes its sequence and leaves
//! the active set inside a single critical section.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::snapshot::Snapshot;
use super::state::{CommitSeq, TransactionId};
use crate::exec::error::ExecutionError;

/// Registry entry for an active transaction
#[derive(Debug, Clone, Copy)]
pub(crate) struct ActiveEntry {
    /// Last commit sequence published when the transaction began
    pub begin_boundary: CommitSeq,
}

/// State guarded by the clock mutex
#[derive(Debug)]
pub(crate) struct ClockState {
    next_txn_id: u64,
    last_commit: CommitSeq,
    active: BTreeMap<TransactionId, ActiveEntry>,
    /// Boundary -> number of live snapshots pinned at it
    pins: BTreeMap<CommitSeq, usize>,
    max_active: usize,
}

impl ClockState {
    /// Allocate the sequence number for a commit without publishing it
    pub fn next_commit_seq(&self) -> Result<CommitSeq, ExecutionError> {
        self.last_commit.next().ok_or_else(|| {
            ExecutionError::CapacityExceeded("commit sequence space exhausted".to_string())
        })
    }

    /// Make `seq` the boundary observed by statements that start from now on
    pub fn publish(&mut self, seq: CommitSeq) {
        debug_assert!(seq > self.last_commit);
        self.last_commit = seq;
    }

    pub fn deregister(&mut self, id: TransactionId) -> bool {
        self.active.remove(&id).is_some()
    }

    pub fn last_commit(&self) -> CommitSeq {
        self.last_commit
    }
}

/// Shared commit clock
///
/// Constructed explicitly and handed to the transaction manager, the version
/// store and the garbage collector.
#[derive(Debug)]
pub struct CommitClock {
    state: Mutex<ClockState>,
}

impl CommitClock {
    /// Create a clock that admits at most `max_active` concurrent transactions
    pub fn new(max_active: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ClockState {
                next_txn_id: 1,
                last_commit: CommitSeq::ZERO,
                active: BTreeMap::new(),
                pins: BTreeMap::new(),
                max_active,
            }),
        })
    }

    /// Allocate a transaction id and enter it in the active set
    pub(crate) fn register(&self) -> Result<(TransactionId, CommitSeq), ExecutionError> {
        let mut state = self.state.lock();

        if state.active.len() >= state.max_active {
            return Err(ExecutionError::CapacityExceeded(format!(
                "{} transactions already active",
                state.active.len()
            )));
        }

        let raw = state.next_txn_id;
        let next = raw.checked_add(1).ok_or_else(|| {
            ExecutionError::CapacityExceeded("transaction id space exhausted".to_string())
        })?;
        state.next_txn_id = next;

        let id = TransactionId::from_u64(raw);
        let begin_boundary = state.last_commit;
        state.active.insert(id, ActiveEntry { begin_boundary });
        Ok((id, begin_boundary))
    }

    /// Enter the commit critical section
    pub(crate) fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock()
    }

    /// Pin the current boundary and return it as a snapshot
    pub fn snapshot(self: &Arc<Self>) -> Snapshot {
        let mut state = self.state.lock();
        let boundary = state.last_commit;
        *state.pins.entry(boundary).or_insert(0) += 1;
        drop(state);
        Snapshot::new(boundary, Arc::clone(self))
    }

    pub(crate) fn unpin(&self, boundary: CommitSeq) {
        let mut state = self.state.lock();
        if let Some(count) = state.pins.get_mut(&boundary) {
            *count -= 1;
            if *count == 0 {
                state.pins.remove(&boundary);
            }
        }
    }

    /// Highest commit sequence published so far
    pub fn last_commit(&self) -> CommitSeq {
        self.state.lock().last_commit
    }

    /// Oldest boundary any live or future reader can use
    ///
    /// Versions whose deletion committed at or below this boundary are
    /// invisible to every snapshot that exists now or can still be taken.
    pub fn gc_horizon(&self) -> CommitSeq {
        let state = self.state.lock();
        state
            .pins
            .keys()
            .next()
            .copied()
            .map_or(state.last_commit, |oldest| oldest.min(state.last_commit))
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }

    pub fn is_active(&self, id: TransactionId) -> bool {
        self.state.lock().active.contains_key(&id)
    }

    /// Begin boundary of the oldest active transaction
    pub(crate) fn oldest_active_boundary(&self) -> Option<CommitSeq> {
        let state = self.state.lock();
        state.active.values().map(|entry| entry.begin_boundary).min()
    }

    pub fn pinned_snapshot_count(&self) -> usize {
        self.state.lock().pins.values().sum()
    }
}

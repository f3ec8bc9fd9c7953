// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Row versions and version chains
//!
//! Each logical row is a chain of versions. A version records the
//! transaction that created it and, once superseded or deleted, the
//! transaction that deleted it. The commit sequence of either side is
//! stamped when that transaction commits; 0 means "not yet".

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::value::Value;
use crate::txn::{CommitSeq, ReadView, TransactionId};

const NONE: u64 = 0;

/// One version of a row
#[derive(Debug)]
pub struct RowVersion {
    values: Vec<Value>,
    created_by: TransactionId,
    created_at: AtomicU64,
    deleted_by: AtomicU64,
    deleted_at: AtomicU64,
}

impl RowVersion {
    pub fn new(values: Vec<Value>, created_by: TransactionId) -> Self {
        Self {
            values,
            created_by,
            created_at: AtomicU64::new(NONE),
            deleted_by: AtomicU64::new(NONE),
            deleted_at: AtomicU64::new(NONE),
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn created_by(&self) -> TransactionId {
        self.created_by
    }

    pub fn created_at(&self) -> Option<CommitSeq> {
        seq(self.created_at.load(Ordering::Acquire))
    }

    pub fn deleted_by(&self) -> Option<TransactionId> {
        match self.deleted_by.load(Ordering::Acquire) {
            NONE => None,
            raw => Some(TransactionId::from_u64(raw)),
        }
    }

    pub fn deleted_at(&self) -> Option<CommitSeq> {
        seq(self.deleted_at.load(Ordering::Acquire))
    }

    /// Whether `view` sees this version
    pub fn is_visible(&self, view: ReadView) -> bool {
        self.creation_visible(view) && !self.deletion_visible(view)
    }

    fn creation_visible(&self, view: ReadView) -> bool {
        if self.created_by == view.reader {
            return true;
        }
        self.created_at()
            .is_some_and(|created| created <= view.boundary)
    }

    fn deletion_visible(&self, view: ReadView) -> bool {
        match self.deleted_by() {
            None => false,
            Some(deleter) if deleter == view.reader => true,
            Some(_) => self
                .deleted_at()
                .is_some_and(|deleted| deleted <= view.boundary),
        }
    }

    /// Place a delete marker for `txn`
    ///
    /// Returns false when another transaction's marker is already present.
    pub fn mark_deleted(&self, txn: TransactionId) -> bool {
        match self.deleted_by.compare_exchange(
            NONE,
            txn.id(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => true,
            Err(current) => current == txn.id(),
        }
    }

    /// Remove a delete marker placed by `txn` that never committed
    pub fn clear_delete_marker(&self, txn: TransactionId) -> bool {
        self.deleted_at.load(Ordering::Acquire) == NONE
            && self
                .deleted_by
                .compare_exchange(txn.id(), NONE, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    pub fn stamp_created(&self, seq: CommitSeq) {
        self.created_at.store(seq.get(), Ordering::Release);
    }

    pub fn stamp_deleted(&self, seq: CommitSeq) {
        self.deleted_at.store(seq.get(), Ordering::Release);
    }

    /// Deleted by a transaction that committed at or below `horizon`
    pub fn is_obsolete(&self, horizon: CommitSeq) -> bool {
        self.deleted_at().is_some_and(|deleted| deleted <= horizon)
    }
}

fn seq(raw: u64) -> Option<CommitSeq> {
    match raw {
        NONE => None,
        raw => Some(CommitSeq::from_u64(raw)),
    }
}

/// All versions of one row, oldest first
#[derive(Debug, Default)]
pub struct VersionChain {
    versions: RwLock<Vec<Arc<RowVersion>>>,
}

impl VersionChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, version: Arc<RowVersion>) {
        self.versions.write().push(version);
    }

    /// Newest version visible to `view`
    pub fn latest_visible(&self, view: ReadView) -> Option<Arc<RowVersion>> {
        self.versions
            .read()
            .iter()
            .rev()
            .find(|version| version.is_visible(view))
            .cloned()
    }

    /// Remove one specific version (rollback of its creator)
    pub fn remove(&self, version: &Arc<RowVersion>) -> bool {
        let mut versions = self.versions.write();
        let before = versions.len();
        versions.retain(|v| !Arc::ptr_eq(v, version));
        versions.len() != before
    }

    /// Drop versions no reader at or after `horizon` can see
    pub fn prune(&self, horizon: CommitSeq) -> usize {
        let mut versions = self.versions.write();
        let before = versions.len();
        versions.retain(|v| !v.is_obsolete(horizon));
        before - versions.len()
    }

    pub fn len(&self) -> usize {
        self.versions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.read().is_empty()
    }
}

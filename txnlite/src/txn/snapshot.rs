// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Read snapshots

use std::sync::Arc;

use super::clock::CommitClock;
use super::state::{CommitSeq, TransactionId};

/// A pinned read boundary
///
/// While a snapshot is alive the garbage collector keeps every version that
/// is visible at its boundary. Dropping it releases the pin.
#[derive(Debug)]
pub struct Snapshot {
    boundary: CommitSeq,
    clock: Arc<CommitClock>,
}

impl Snapshot {
    pub(crate) fn new(boundary: CommitSeq, clock: Arc<CommitClock>) -> Self {
        Self { boundary, clock }
    }

    pub fn boundary(&self) -> CommitSeq {
        self.boundary
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        self.clock.unpin(self.boundary);
    }
}

/// Who is reading, and at which boundary
///
/// A version created (or deleted) by `reader` is always visible (hidden) to
/// it; versions from other transactions count only once committed at or
/// below `boundary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadView {
    pub reader: TransactionId,
    pub boundary: CommitSeq,
}

impl ReadView {
    pub fn new(reader: TransactionId, boundary: CommitSeq) -> Self {
        Self { reader, boundary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_pins_until_dropped() {
        let clock = CommitClock::new(4);
        let first = clock.snapshot();
        let second = clock.snapshot();
        assert_eq!(clock.pinned_snapshot_count(), 2);

        drop(first);
        assert_eq!(clock.pinned_snapshot_count(), 1);
        drop(second);
        assert_eq!(clock.pinned_snapshot_count(), 0);
    }
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction management module
//!
//! This module provides transaction control over the version store with
//! READ COMMITTED isolation (and REPEATABLE READ as a transaction-wide
//! snapshot).
//!
//! # Features
//! - Transaction lifecycle management (BEGIN, COMMIT, ROLLBACK)
//! - A single commit clock ordering all commits
//! - Statement snapshots pinned against garbage collection
//! - Row write locks with timeouts and deadlock detection
//! - Write-set logging for commit stamping and rollback

pub mod clock;
pub mod handle;
pub mod isolation;
pub mod lock;
pub mod log;
pub mod manager;
pub mod snapshot;
pub mod state;

pub use clock::CommitClock;
pub use handle::TransactionHandle;
pub use isolation::{IsolationLevel, SnapshotScope};
pub use manager::{TransactionManager, TransactionStatistics};
pub use snapshot::{ReadView, Snapshot};
pub use state::{AccessMode, CommitSeq, TransactionId, TransactionState, TransactionStatus};

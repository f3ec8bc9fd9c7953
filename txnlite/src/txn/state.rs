// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction state management
//!
//! This module defines transaction identity, commit ordering and the
//! per-transaction lifecycle record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::isolation::IsolationLevel;

/// Unique identifier for a transaction
///
/// Identifiers are assigned from a monotonically increasing counter owned by
/// the commit clock, starting at 1. The raw value 0 is reserved to mean "no
/// transaction" inside version metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Get the underlying ID value
    pub fn id(&self) -> u64 {
        self.0
    }

    /// Create TransactionId from u64
    pub fn from_u64(id: u64) -> Self {
        TransactionId(id)
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

/// Position of a commit in the global commit order
///
/// `CommitSeq::ZERO` is the boundary before any commit; the first commit is
/// assigned 1.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CommitSeq(u64);

impl CommitSeq {
    pub const ZERO: CommitSeq = CommitSeq(0);

    pub fn get(&self) -> u64 {
        self.0
    }

    pub fn from_u64(seq: u64) -> Self {
        CommitSeq(seq)
    }

    /// The sequence number following this one, or `None` when exhausted
    pub fn next(&self) -> Option<CommitSeq> {
        self.0.checked_add(1).map(CommitSeq)
    }
}

impl std::fmt::Display for CommitSeq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cs_{}", self.0)
    }
}

/// Transaction lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Transaction is active and can perform operations
    Active,
    /// Transaction has been committed successfully
    Committed,
    /// Transaction has been rolled back
    RolledBack,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Active => "ACTIVE",
            TransactionStatus::Committed => "COMMITTED",
            TransactionStatus::RolledBack => "ROLLED BACK",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Active)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction access mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AccessMode {
    ReadOnly,
    #[default]
    ReadWrite,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::ReadOnly => "READ ONLY",
            AccessMode::ReadWrite => "READ WRITE",
        }
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete transaction state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionState {
    /// Unique transaction identifier
    pub id: TransactionId,
    /// Current transaction status
    pub status: TransactionStatus,
    /// Transaction isolation level
    pub isolation_level: IsolationLevel,
    /// Transaction access mode
    pub access_mode: AccessMode,
    /// Commit sequence, assigned only by a successful commit
    pub commit_seq: Option<CommitSeq>,
    /// Timestamp when transaction started
    pub start_time: DateTime<Utc>,
    /// Timestamp when transaction ended (if applicable)
    pub end_time: Option<DateTime<Utc>>,
    /// Number of statements executed in this transaction
    pub statement_count: u64,
}

impl TransactionState {
    pub fn new(id: TransactionId, isolation_level: IsolationLevel, access_mode: AccessMode) -> Self {
        Self {
            id,
            status: TransactionStatus::Active,
            isolation_level,
            access_mode,
            commit_seq: None,
            start_time: Utc::now(),
            end_time: None,
            statement_count: 0,
        }
    }

    /// Mark transaction as committed at `seq`
    pub fn commit(&mut self, seq: CommitSeq) {
        self.status = TransactionStatus::Committed;
        self.commit_seq = Some(seq);
        self.end_time = Some(Utc::now());
    }

    /// Mark transaction as rolled back
    pub fn rollback(&mut self) {
        self.status = TransactionStatus::RolledBack;
        self.end_time = Some(Utc::now());
    }

    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// Get transaction duration
    pub fn duration(&self) -> chrono::Duration {
        let end_time = self.end_time.unwrap_or_else(Utc::now);
        end_time - self.start_time
    }
}

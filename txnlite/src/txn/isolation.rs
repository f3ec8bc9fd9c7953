// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction isolation level management
//!
//! READ COMMITTED takes a fresh snapshot boundary for every statement.
//! REPEATABLE READ fixes the boundary when the transaction begins. The other
//! two standard levels are recognised but rejected at BEGIN.

use serde::{Deserialize, Serialize};

/// SQL isolation levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum IsolationLevel {
    /// Rejected at BEGIN
    ReadUncommitted,
    /// Each statement sees what was committed when it started
    #[default]
    ReadCommitted,
    /// Every statement sees what was committed at BEGIN
    RepeatableRead,
    /// Rejected at BEGIN
    Serializable,
}

/// When a transaction's read boundary is captured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotScope {
    /// New boundary at the start of each statement
    Statement,
    /// One boundary for the whole transaction, taken at BEGIN
    Transaction,
}

impl IsolationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }

    /// Whether transactions can be started at this level
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            IsolationLevel::ReadCommitted | IsolationLevel::RepeatableRead
        )
    }

    /// Snapshot scope for a supported level
    pub fn snapshot_scope(&self) -> SnapshotScope {
        match self {
            IsolationLevel::RepeatableRead | IsolationLevel::Serializable => {
                SnapshotScope::Transaction
            }
            IsolationLevel::ReadUncommitted | IsolationLevel::ReadCommitted => {
                SnapshotScope::Statement
            }
        }
    }
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IsolationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_uppercase().as_str() {
            "READ UNCOMMITTED" | "READ_UNCOMMITTED" => Ok(IsolationLevel::ReadUncommitted),
            "READ COMMITTED" | "READ_COMMITTED" => Ok(IsolationLevel::ReadCommitted),
            "REPEATABLE READ" | "REPEATABLE_READ" => Ok(IsolationLevel::RepeatableRead),
            "SERIALIZABLE" => Ok(IsolationLevel::Serializable),
            _ => Err(format!("Unknown isolation level: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_levels_and_scope() {
        assert!(IsolationLevel::default().is_supported());
        assert_eq!(
            IsolationLevel::ReadCommitted.snapshot_scope(),
            SnapshotScope::Statement
        );
        assert_eq!(
            IsolationLevel::RepeatableRead.snapshot_scope(),
            SnapshotScope::Transaction
        );
        assert!(!IsolationLevel::Serializable.is_supported());
        assert!(!IsolationLevel::ReadUncommitted.is_supported());
    }

    #[test]
    fn test_isolation_level_parsing() {
        assert_eq!(
            "read   committed".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::ReadCommitted
        );
        assert_eq!(
            "REPEATABLE_READ".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::RepeatableRead
        );
        assert!("snapshot".parse::<IsolationLevel>().is_err());
    }
}

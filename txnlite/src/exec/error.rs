// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution error types

use crate::ast::parser::ParserError;
use crate::txn::{TransactionId, TransactionStatus};
use std::time::Duration;
use thiserror::Error;

/// Execution errors
///
/// Every engine operation reports failures through this enum. Errors are
/// returned to the caller of the operation that detected them; an operation
/// that fails leaves no partial effect behind. A DML statement that fails on
/// one of its rows is undone as a whole and its transaction stays active.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// Commit or rollback attempted on a transaction that already ended
    #[error("Transaction {id} is {status}; expected it to be active")]
    InvalidTransactionState {
        id: TransactionId,
        status: TransactionStatus,
    },

    /// Statement submitted against a transaction that already ended
    #[error("Transaction {id} is closed ({status})")]
    TransactionClosed {
        id: TransactionId,
        status: TransactionStatus,
    },

    /// Waited longer than the configured timeout for a row write lock
    #[error("Lock timeout after {waited:?}: {table} row {row} is held by {holder}")]
    LockTimeout {
        table: String,
        row: u64,
        holder: TransactionId,
        waited: Duration,
    },

    /// Waiting for the lock would close a cycle in the wait-for graph
    #[error("Deadlock detected: {waiter} waiting for {holder} on {table} row {row}")]
    Deadlock {
        table: String,
        row: u64,
        waiter: TransactionId,
        holder: TransactionId,
    },

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    #[error("Transaction {0} is READ ONLY")]
    ReadOnlyTransaction(TransactionId),

    #[error("Isolation level {0} not supported")]
    UnsupportedIsolationLevel(String),

    #[error("Unsupported statement: {0}")]
    UnsupportedStatement(String),

    #[error("Syntax error: {0}")]
    SyntaxError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Session COMMIT or ROLLBACK without an open transaction
    #[error("No active transaction to {0}")]
    NoActiveTransaction(&'static str),

    /// Session BEGIN while another transaction is open
    #[error("Transaction {0} already in progress")]
    TransactionInProgress(TransactionId),

    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

impl ExecutionError {
    /// Whether the caller may retry the operation (after rolling back its own
    /// transaction if it chooses to)
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ExecutionError::LockTimeout { .. } | ExecutionError::Deadlock { .. }
        )
    }

    /// Whether the error leaves the process unable to make progress
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExecutionError::CapacityExceeded(_))
    }
}

impl From<ParserError> for ExecutionError {
    fn from(error: ParserError) -> Self {
        ExecutionError::SyntaxError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        let timeout = ExecutionError::LockTimeout {
            table: "t".to_string(),
            row: 1,
            holder: TransactionId::from_u64(7),
            waited: Duration::from_millis(10),
        };
        assert!(timeout.is_retriable());
        assert!(!timeout.is_fatal());

        let closed = ExecutionError::TransactionClosed {
            id: TransactionId::from_u64(3),
            status: TransactionStatus::Committed,
        };
        assert!(!closed.is_retriable());
        assert!(ExecutionError::CapacityExceeded("ids".to_string()).is_fatal());
    }

    #[test]
    fn test_error_messages_name_the_transaction() {
        let err = ExecutionError::InvalidTransactionState {
            id: TransactionId::from_u64(12),
            status: TransactionStatus::RolledBack,
        };
        assert_eq!(
            err.to_string(),
            "Transaction txn_12 is ROLLED BACK; expected it to be active"
        );
    }
}

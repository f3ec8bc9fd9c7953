// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! txnlite - An in-memory transactional table engine
//!
//! txnlite gives concurrent client sessions isolated, atomic views of a shared
//! set of tables. Every row is stored as a chain of versions tagged with the
//! transaction that created or deleted it; commits are totally ordered by a
//! global commit sequence and each statement reads at the boundary current when
//! it starts (READ COMMITTED).
//!
//! # Features
//!
//! - **Read-committed MVCC**: readers never block writers and never see
//!   uncommitted data from other transactions
//! - **Atomic commit/rollback**: a commit becomes visible all at once, a
//!   rollback discards every tentative version
//! - **Row write locks**: write-write conflicts block (with optional timeout)
//!   and wait-for cycles are reported as deadlocks
//! - **Garbage collection**: superseded versions are swept once no snapshot can
//!   observe them
//!
//! # Usage
//!
//! ```no_run
//! use txnlite::Database;
//!
//! let db = Database::new().unwrap();
//! db.exec_autocommit("create table t (i tinyint)").unwrap();
//!
//! let tx = db.begin().unwrap();
//! db.exec(&tx, "insert into t values (42)").unwrap();
//! let count: i64 = db.query(&tx, "select count(*) from t").unwrap().scan().unwrap();
//! assert_eq!(count, 1);
//! db.commit(&tx).unwrap();
//! ```

// Public modules - exposed to external users
pub mod config;
pub mod coordinator;
pub mod session;

// Internal modules - only visible within txnlite crate
pub(crate) mod ast;
pub(crate) mod exec;
pub(crate) mod storage;
pub(crate) mod txn;

// Re-export the public API
pub use ast::split_script;
pub use config::{EngineConfig, GcConfig};
pub use coordinator::Database;
pub use exec::{ExecutionError, QueryResult, ResultSet, Row};
pub use session::Session;
pub use storage::{DataType, FromValue, GcStats, Value};
pub use txn::{
    AccessMode, CommitSeq, IsolationLevel, TransactionHandle, TransactionId,
    TransactionState, TransactionStatistics, TransactionStatus,
};

/// txnlite version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// txnlite crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");

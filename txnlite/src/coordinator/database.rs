// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Database - the caller-facing entry point
//!
//! Wires the commit clock, version store, transaction manager, statement
//! executor and (optionally) the background garbage collector together and
//! exposes the transaction API over statement text.

use std::sync::Arc;
use std::time::Instant;

use crate::ast::{parse_statement, Statement};
use crate::config::EngineConfig;
use crate::exec::{ExecutionError, QueryResult, ResultSet, StatementExecutor};
use crate::storage::{GarbageCollector, GcStats, VersionStore};
use crate::txn::{
    AccessMode, CommitClock, CommitSeq, IsolationLevel, TransactionHandle, TransactionManager,
    TransactionStatistics,
};

/// An in-memory transactional database
///
/// `Database` is `Send + Sync`; share it between threads behind an `Arc`.
/// Every transaction handle it returns belongs to one caller at a time.
#[derive(Debug)]
pub struct Database {
    config: EngineConfig,
    manager: Arc<TransactionManager>,
    executor: StatementExecutor,
    gc: Option<GarbageCollector>,
}

impl Database {
    /// Create a database with the default configuration
    pub fn new() -> Result<Self, ExecutionError> {
        Self::with_config(EngineConfig::default())
    }

    /// Create a database from an explicit configuration
    ///
    /// # Arguments
    /// * `config` - Engine configuration; validated before anything starts
    ///
    /// # Returns
    /// * `Ok(Database)` - Ready for use, with the garbage collector running
    ///   when `config.gc.enabled` is set
    /// * `Err(ExecutionError::ConfigError)` - The configuration is invalid
    ///
    /// # Example
    /// ```no_run
    /// use std::time::Duration;
    /// use txnlite::{Database, EngineConfig};
    ///
    /// let config = EngineConfig::default().with_lock_timeout(Some(Duration::from_secs(1)));
    /// let db = Database::with_config(config).expect("valid configuration");
    /// ```
    pub fn with_config(config: EngineConfig) -> Result<Self, ExecutionError> {
        config.validate()?;

        let clock = CommitClock::new(config.max_active_transactions);
        let store = Arc::new(VersionStore::new(Arc::clone(&clock)));
        let manager = Arc::new(TransactionManager::new(
            Arc::clone(&clock),
            Arc::clone(&store),
            &config,
        ));
        let executor = StatementExecutor::new(Arc::clone(&manager));

        let gc = if config.gc.enabled {
            Some(GarbageCollector::start(store, clock, config.gc.interval())?)
        } else {
            None
        };

        log::info!(
            "txnlite {} started ({} default isolation, lock timeout {:?})",
            crate::VERSION,
            config.default_isolation_level,
            config.lock_timeout()
        );

        Ok(Self {
            config,
            manager,
            executor,
            gc,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Begin a transaction with the configured default characteristics
    pub fn begin(&self) -> Result<TransactionHandle, ExecutionError> {
        self.manager.start_transaction(None, None)
    }

    /// Begin a transaction with explicit characteristics
    ///
    /// `None` falls back to the configured default. READ UNCOMMITTED and
    /// SERIALIZABLE fail with `UnsupportedIsolationLevel`.
    pub fn begin_with(
        &self,
        isolation_level: Option<IsolationLevel>,
        access_mode: Option<AccessMode>,
    ) -> Result<TransactionHandle, ExecutionError> {
        self.manager.start_transaction(isolation_level, access_mode)
    }

    /// Execute a statement inside `handle` and return the rows affected
    ///
    /// # Arguments
    /// * `handle` - An active transaction
    /// * `text` - One statement; a trailing `;` is allowed
    ///
    /// # Returns
    /// * `Ok(u64)` - Rows inserted, updated or deleted (rows produced for SELECT)
    /// * `Err(ExecutionError)` - Syntax, schema, lock or state failure. Rows
    ///   the statement wrote before failing stay in the transaction.
    pub fn exec(&self, handle: &TransactionHandle, text: &str) -> Result<u64, ExecutionError> {
        let statement = parse_statement(text)?;
        self.execute_statement(handle, &statement)
    }

    /// Run a query inside `handle`
    ///
    /// The returned [`ResultSet`] reads lazily at the snapshot captured when
    /// the statement started.
    pub fn query(
        &self,
        handle: &TransactionHandle,
        text: &str,
    ) -> Result<ResultSet, ExecutionError> {
        let statement = parse_statement(text)?;
        self.query_statement(handle, &statement)
    }

    /// Commit `handle`, making its writes visible to later statements
    pub fn commit(&self, handle: &TransactionHandle) -> Result<CommitSeq, ExecutionError> {
        self.manager.commit_transaction(handle)
    }

    /// Roll back `handle`, discarding its writes
    pub fn rollback(&self, handle: &TransactionHandle) -> Result<(), ExecutionError> {
        self.manager.rollback_transaction(handle)
    }

    /// Execute one statement in its own transaction
    ///
    /// The implicit transaction commits on success and rolls back on failure.
    pub fn exec_autocommit(&self, text: &str) -> Result<u64, ExecutionError> {
        let statement = parse_statement(text)?;
        self.autocommit(|handle| self.execute_statement(handle, &statement))
    }

    /// Run one query in its own transaction and materialize its rows
    pub fn query_autocommit(&self, text: &str) -> Result<QueryResult, ExecutionError> {
        let statement = parse_statement(text)?;
        let started = Instant::now();
        let mut result = self.autocommit(|handle| {
            self.query_statement(handle, &statement)?
                .into_query_result()
        })?;
        result.execution_time_ms = started.elapsed().as_millis() as u64;
        Ok(result)
    }

    /// Sweep versions no current or future reader can see
    pub fn collect_garbage(&self) -> GcStats {
        let horizon = self.manager.clock().gc_horizon();
        let stats = self.manager.store().collect_garbage(horizon);
        log::debug!(
            "Manual GC at {}: removed {} versions",
            stats.horizon,
            stats.versions_removed
        );
        stats
    }

    pub fn statistics(&self) -> TransactionStatistics {
        self.manager.get_statistics()
    }

    /// Names of all tables, sorted
    pub fn table_names(&self) -> Vec<String> {
        self.manager.store().table_names()
    }

    /// Whether the background garbage collector is running
    pub fn gc_running(&self) -> bool {
        self.gc.as_ref().is_some_and(GarbageCollector::is_running)
    }

    pub(crate) fn execute_statement(
        &self,
        handle: &TransactionHandle,
        statement: &Statement,
    ) -> Result<u64, ExecutionError> {
        self.executor.execute(handle, statement)
    }

    pub(crate) fn query_statement(
        &self,
        handle: &TransactionHandle,
        statement: &Statement,
    ) -> Result<ResultSet, ExecutionError> {
        self.executor.query(handle, statement)
    }

    /// Run `body` in a fresh transaction, committing on success
    pub(crate) fn autocommit<T>(
        &self,
        body: impl FnOnce(&TransactionHandle) -> Result<T, ExecutionError>,
    ) -> Result<T, ExecutionError> {
        let handle = self.begin()?;
        let result = body(&handle).and_then(|value| self.commit(&handle).map(|_| value));
        if let Err(e) = &result {
            // A failed commit leaves the transaction active as well
            if handle.is_active() {
                log::debug!("Implicit transaction {} failed: {}", handle.id(), e);
                if let Err(rollback_error) = self.rollback(&handle) {
                    log::warn!(
                        "Rollback of implicit transaction {} failed: {}",
                        handle.id(),
                        rollback_error
                    );
                }
            }
        }
        result
    }

    /// Make every further commit fail as if the sequence space ran out
    #[cfg(test)]
    pub(crate) fn exhaust_commit_sequence(&self) {
        self.manager
            .clock()
            .lock()
            .publish(CommitSeq::from_u64(u64::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database() -> Database {
        Database::with_config(EngineConfig::default().without_gc()).unwrap()
    }

    #[test]
    fn test_autocommit_commits_and_rolls_back() {
        let db = database();
        db.exec_autocommit("create table t (i tinyint not null)")
            .unwrap();
        assert_eq!(db.exec_autocommit("insert into t values (1), (2)").unwrap(), 2);
        assert!(db.exec_autocommit("insert into t values (3), (null)").is_err());

        let result = db.query_autocommit("select count(*) from t").unwrap();
        assert_eq!(result.columns, vec!["COUNT(*)".to_string()]);
        assert_eq!(result.rows[0].get::<i64>(0).unwrap(), 2);

        let stats = db.statistics();
        assert_eq!(stats.active_transactions, 0);
        assert_eq!(stats.committed_transactions, 3);
        assert_eq!(stats.rolled_back_transactions, 1);
    }

    #[test]
    fn test_failed_autocommit_commit_is_rolled_back() {
        let db = database();
        db.exec_autocommit("create table t (i tinyint)").unwrap();
        db.exec_autocommit("insert into t values (1)").unwrap();
        db.exhaust_commit_sequence();

        let err = db.exec_autocommit("delete from t").unwrap_err();
        assert!(matches!(err, ExecutionError::CapacityExceeded(_)));

        let stats = db.statistics();
        assert_eq!(stats.active_transactions, 0);
        assert_eq!(stats.rolled_back_transactions, 1);
        assert_eq!(stats.locked_rows, 0);

        // The row is untouched and writable by the next transaction
        let txn = db.begin().unwrap();
        assert_eq!(db.exec(&txn, "delete from t").unwrap(), 1);
        db.rollback(&txn).unwrap();
    }

    #[test]
    fn test_failed_commit_leaves_transaction_active() {
        let db = database();
        db.exec_autocommit("create table t (i tinyint)").unwrap();
        let txn = db.begin().unwrap();
        db.exec(&txn, "insert into t values (1)").unwrap();
        db.exhaust_commit_sequence();

        assert!(db.commit(&txn).unwrap_err().is_fatal());
        assert!(txn.is_active());
        assert_eq!(txn.commit_seq(), None);
        db.rollback(&txn).unwrap();
        assert_eq!(db.statistics().active_transactions, 0);
    }

    #[test]
    fn test_syntax_errors_do_not_begin_transactions() {
        let db = database();
        let err = db.exec_autocommit("selec 1").unwrap_err();
        assert!(matches!(err, ExecutionError::SyntaxError(_)));
        assert_eq!(db.statistics().committed_transactions, 0);
        assert_eq!(db.statistics().rolled_back_transactions, 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.max_active_transactions = 0;
        assert!(matches!(
            Database::with_config(config),
            Err(ExecutionError::ConfigError(_))
        ));
    }

    #[test]
    fn test_gc_follows_config() {
        assert!(!database().gc_running());
        assert!(Database::new().unwrap().gc_running());
    }
}

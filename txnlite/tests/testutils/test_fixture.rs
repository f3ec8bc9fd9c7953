//! Test fixture for txnlite integration tests
//!
//! Uses ONLY the public `Database` / `Session` API.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use txnlite::{Database, EngineConfig, ExecutionError, Session, TransactionHandle};

/// Test fixture with an isolated database and one table
pub struct TestFixture {
    db: Arc<Database>,
    table: String,
}

impl TestFixture {
    /// Database without background GC and a `(i tinyint)` table
    pub fn new() -> Result<Self, ExecutionError> {
        Self::with_config(EngineConfig::default().without_gc())
    }

    /// Writers give up after `timeout` instead of waiting indefinitely
    pub fn with_lock_timeout(timeout: Duration) -> Result<Self, ExecutionError> {
        Self::with_config(
            EngineConfig::default()
                .without_gc()
                .with_lock_timeout(Some(timeout)),
        )
    }

    pub fn with_config(config: EngineConfig) -> Result<Self, ExecutionError> {
        Self::with_columns(config, "i tinyint")
    }

    /// Create a fixture whose table has the given column list
    pub fn with_columns(config: EngineConfig, columns: &str) -> Result<Self, ExecutionError> {
        init_logging();
        let db = Arc::new(Database::with_config(config)?);

        // Unique table name so a failing test is easy to trace in logs
        let table = format!("test_table_{}", fastrand::u64(..));
        db.exec_autocommit(&format!("create table {} ({})", table, columns))?;

        Ok(Self { db, table })
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn session(&self) -> Session {
        Session::new(Arc::clone(&self.db))
    }

    pub fn begin(&self) -> TransactionHandle {
        self.db.begin().expect("begin should succeed")
    }

    /// Run a statement, with `{t}` replaced by the fixture's table name
    pub fn exec(&self, handle: &TransactionHandle, text: &str) -> Result<u64, ExecutionError> {
        self.db.exec(handle, &self.sql(text))
    }

    pub fn exec_autocommit(&self, text: &str) -> Result<u64, ExecutionError> {
        self.db.exec_autocommit(&self.sql(text))
    }

    /// `count(*)` of the table as seen by `handle`
    pub fn count(&self, handle: &TransactionHandle) -> i64 {
        self.db
            .query(handle, &self.sql("select count(*) from {t}"))
            .and_then(|rows| rows.scan())
            .expect("count should succeed")
    }

    /// `count(*)` in a fresh transaction
    pub fn committed_count(&self) -> i64 {
        let handle = self.begin();
        let count = self.count(&handle);
        self.db.commit(&handle).expect("commit should succeed");
        count
    }

    /// Values of column `i` visible to `handle`, in row order
    pub fn values(&self, handle: &TransactionHandle) -> Vec<i64> {
        self.db
            .query(handle, &self.sql("select i from {t}"))
            .and_then(|rows| rows.map(|row| row?.get::<i64>(0)).collect())
            .expect("select should succeed")
    }

    pub fn sql(&self, text: &str) -> String {
        text.replace("{t}", &self.table)
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

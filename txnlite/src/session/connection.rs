// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Client sessions
//!
//! A session accepts statement text the way a client connection would:
//! BEGIN, COMMIT and ROLLBACK switch it in and out of an explicit
//! transaction, and every other statement runs in that transaction or in an
//! implicit one.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::transaction_state::SessionTransactionState;
use crate::ast::{parse_statement, split_script, Statement, TransactionStatement};
use crate::coordinator::Database;
use crate::exec::{ExecutionError, QueryResult};
use crate::txn::TransactionHandle;

/// A connection-scoped view of a [`Database`]
///
/// Dropping a session with an open transaction rolls that transaction back.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    db: Arc<Database>,
    state: SessionTransactionState,
    created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(db: Arc<Database>) -> Self {
        let id = Uuid::new_v4();
        log::debug!("Session {} opened", id);
        Self {
            id,
            db,
            state: SessionTransactionState::new(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// The explicit transaction currently open, if any
    pub fn current_transaction(&self) -> Option<TransactionHandle> {
        self.state.current_transaction()
    }

    pub fn in_transaction(&self) -> bool {
        self.state.has_active_transaction()
    }

    pub fn is_auto_commit(&self) -> bool {
        self.state.is_auto_commit()
    }

    pub fn set_auto_commit(&self, enabled: bool) {
        self.state.set_auto_commit(enabled);
    }

    /// Execute one statement
    ///
    /// # Returns
    /// * Rows and column names for SELECT
    /// * `rows_affected` for INSERT, UPDATE and DELETE
    /// * A status `message` for BEGIN, COMMIT, ROLLBACK and DDL
    pub fn execute(&self, text: &str) -> Result<QueryResult, ExecutionError> {
        let started = Instant::now();
        let statement = parse_statement(text)?;

        let mut result = match &statement {
            Statement::TransactionStatement(TransactionStatement::StartTransaction(c)) => {
                let handle =
                    self.state
                        .begin_transaction(&self.db, c.isolation_level, c.access_mode)?;
                QueryResult::message(format!(
                    "BEGIN {} ({}, {})",
                    handle.id(),
                    handle.isolation_level(),
                    handle.access_mode()
                ))
            }
            Statement::TransactionStatement(TransactionStatement::Commit) => {
                let seq = self.state.commit_transaction(&self.db)?;
                QueryResult::message(format!("COMMIT {}", seq))
            }
            Statement::TransactionStatement(TransactionStatement::Rollback) => {
                self.state.rollback_transaction(&self.db)?;
                QueryResult::message("ROLLBACK")
            }
            other => self.run(other)?,
        };

        result.execution_time_ms = started.elapsed().as_millis() as u64;
        Ok(result)
    }

    /// Execute a `;`-separated script, stopping at the first error
    pub fn execute_script(&self, script: &str) -> Result<Vec<QueryResult>, ExecutionError> {
        split_script(script)
            .iter()
            .map(|statement| self.execute(statement))
            .collect()
    }

    fn run(&self, statement: &Statement) -> Result<QueryResult, ExecutionError> {
        let handle = match self.state.current_transaction() {
            Some(handle) => handle,
            None if self.state.is_auto_commit() => {
                return self.db.autocommit(|handle| self.run_in(handle, statement));
            }
            None => self.state.begin_transaction(&self.db, None, None)?,
        };
        self.run_in(&handle, statement)
    }

    fn run_in(
        &self,
        handle: &TransactionHandle,
        statement: &Statement,
    ) -> Result<QueryResult, ExecutionError> {
        match statement {
            Statement::Select(_) => self.db.query_statement(handle, statement)?.into_query_result(),
            _ if statement.is_ddl() => {
                self.db.execute_statement(handle, statement)?;
                Ok(QueryResult::message(statement.kind()))
            }
            _ => Ok(QueryResult::affected(
                self.db.execute_statement(handle, statement)?,
            )),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(handle) = self.state.take_current() {
            if handle.is_active() {
                match self.db.rollback(&handle) {
                    Ok(()) => log::info!(
                        "Session {} closed; rolled back open transaction {}",
                        self.id,
                        handle.id()
                    ),
                    Err(e) => log::warn!(
                        "Session {} closed; rollback of {} failed: {}",
                        self.id,
                        handle.id(),
                        e
                    ),
                }
            }
        }
        log::debug!("Session {} closed", self.id);
    }
}

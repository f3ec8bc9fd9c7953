// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement executor
//!
//! Runs one parsed statement inside a transaction. Reads go through the
//! statement snapshot handed out by the transaction manager. UPDATE and
//! DELETE pick candidates at that snapshot, then lock each row and re-check
//! its newest committed version before writing, so a row changed by a
//! concurrent commit is judged by its current contents.

use std::sync::Arc;

use crate::ast::{
    CreateTableStatement, DeleteStatement, InsertStatement, Projection, SelectStatement,
    Statement, UpdateStatement,
};
use crate::storage::{RowId, Table, TableSchema, Value, VersionStore, WriteOp};
use crate::txn::log::RowChange;
use crate::txn::{AccessMode, TransactionHandle, TransactionManager};

use super::error::ExecutionError;
use super::filter::RowFilter;
use super::result::ResultSet;
use super::row_iterator::{CountIterator, RowIterator, ScanIterator};

/// Executes data and schema statements against the version store
#[derive(Debug)]
pub struct StatementExecutor {
    manager: Arc<TransactionManager>,
}

impl StatementExecutor {
    pub fn new(manager: Arc<TransactionManager>) -> Self {
        Self { manager }
    }

    fn store(&self) -> &VersionStore {
        self.manager.store()
    }

    /// Execute a statement and return the number of rows it affected
    ///
    /// For SELECT this is the number of rows the query produced.
    pub fn execute(
        &self,
        handle: &TransactionHandle,
        statement: &Statement,
    ) -> Result<u64, ExecutionError> {
        handle.ensure_active()?;
        log::debug!("{} executing {}", handle.id(), statement.kind());

        if statement.is_ddl() || statement.is_dml() {
            check_writable(handle)?;
        }

        match statement {
            Statement::CreateTable(create) => self.create_table(create),
            Statement::DropTable(drop) => self
                .store()
                .drop_table(&drop.name, drop.if_exists)
                .map(|_| 0),
            Statement::Insert(insert) => {
                self.atomically(handle, |exec| exec.insert(handle, insert))
            }
            Statement::Update(update) => {
                self.atomically(handle, |exec| exec.update(handle, update))
            }
            Statement::Delete(delete) => {
                self.atomically(handle, |exec| exec.delete(handle, delete))
            }
            Statement::Select(select) => self.select(handle, select)?.try_fold(0u64, |count, row| {
                row.map(|_| count + 1)
            }),
            Statement::TransactionStatement(_) => Err(transaction_control(statement)),
        }
    }

    /// Run a statement and return its rows
    ///
    /// Statements other than SELECT are executed and produce an empty
    /// result set.
    pub fn query(
        &self,
        handle: &TransactionHandle,
        statement: &Statement,
    ) -> Result<ResultSet, ExecutionError> {
        match statement {
            Statement::Select(select) => {
                handle.ensure_active()?;
                log::debug!("{} querying {}", handle.id(), select.table);
                self.select(handle, select)
            }
            other => self.execute(handle, other).map(|_| ResultSet::empty()),
        }
    }

    /// Run one DML statement so that it applies all of its writes or none
    fn atomically(
        &self,
        handle: &TransactionHandle,
        statement: impl FnOnce(&Self) -> Result<u64, ExecutionError>,
    ) -> Result<u64, ExecutionError> {
        let savepoint = self.manager.savepoint(handle);
        let result = statement(self);
        if result.is_err() {
            self.manager.rollback_statement(handle, savepoint);
        }
        result
    }

    fn create_table(&self, create: &CreateTableStatement) -> Result<u64, ExecutionError> {
        let schema = TableSchema::new(create.name.clone(), create.columns.clone())?;
        self.store().create_table(schema, create.if_not_exists)?;
        Ok(0)
    }

    fn insert(
        &self,
        handle: &TransactionHandle,
        insert: &InsertStatement,
    ) -> Result<u64, ExecutionError> {
        let table = self.store().table(&insert.table)?;
        let schema = table.schema();

        let positions: Vec<usize> = match &insert.columns {
            Some(columns) => {
                let positions = columns
                    .iter()
                    .map(|column| schema.column_index(column))
                    .collect::<Result<Vec<_>, _>>()?;
                for (i, position) in positions.iter().enumerate() {
                    if positions[..i].contains(position) {
                        return Err(ExecutionError::SchemaViolation(format!(
                            "column {} listed more than once",
                            schema.columns[*position].name
                        )));
                    }
                }
                positions
            }
            None => (0..schema.columns.len()).collect(),
        };

        // Every row is checked before the first one is written
        let rows = insert
            .rows
            .iter()
            .map(|literals| {
                if literals.len() != positions.len() {
                    return Err(ExecutionError::SchemaViolation(format!(
                        "INSERT into {} expects {} values, got {}",
                        table.name(),
                        positions.len(),
                        literals.len()
                    )));
                }
                let mut values = vec![Value::Null; schema.columns.len()];
                for (&position, literal) in positions.iter().zip(literals) {
                    values[position] = literal.to_value();
                }
                values
                    .into_iter()
                    .enumerate()
                    .map(|(index, value)| schema.check_value(index, value))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let timeout = handle.lock_timeout();
        let mut affected = 0;
        for values in rows {
            let records = self
                .store()
                .write(handle.id(), &table, WriteOp::Insert(values), timeout)?;
            self.manager
                .record_writes(handle, RowChange::Inserted, records)?;
            affected += 1;
        }

        log::debug!("{} inserted {} rows into {}", handle.id(), affected, table.name());
        Ok(affected)
    }

    fn update(
        &self,
        handle: &TransactionHandle,
        update: &UpdateStatement,
    ) -> Result<u64, ExecutionError> {
        let table = self.store().table(&update.table)?;
        let schema = table.schema();
        let filter = RowFilter::bind(update.filter.as_ref(), schema)?;
        let assignments = update
            .assignments
            .iter()
            .map(|assignment| {
                let index = schema.column_index(&assignment.column)?;
                Ok((index, schema.check_value(index, assignment.value.to_value())?))
            })
            .collect::<Result<Vec<_>, ExecutionError>>()?;

        let timeout = handle.lock_timeout();
        let mut affected = 0;
        for row in self.candidates(handle, &table, &filter)? {
            let Some(current) = self.store().lock_and_read(handle.id(), &table, row, timeout)?
            else {
                continue;
            };
            if !filter.matches(&current) {
                continue;
            }

            let mut values = current;
            for (index, value) in &assignments {
                values[*index] = value.clone();
            }
            let records = self
                .store()
                .write(handle.id(), &table, WriteOp::Update(row, values), timeout)?;
            if records.is_empty() {
                continue;
            }
            self.manager
                .record_writes(handle, RowChange::Updated, records)?;
            affected += 1;
        }

        log::debug!("{} updated {} rows in {}", handle.id(), affected, table.name());
        Ok(affected)
    }

    fn delete(
        &self,
        handle: &TransactionHandle,
        delete: &DeleteStatement,
    ) -> Result<u64, ExecutionError> {
        let table = self.store().table(&delete.table)?;
        let filter = RowFilter::bind(delete.filter.as_ref(), table.schema())?;

        let timeout = handle.lock_timeout();
        let mut affected = 0;
        for row in self.candidates(handle, &table, &filter)? {
            let Some(current) = self.store().lock_and_read(handle.id(), &table, row, timeout)?
            else {
                continue;
            };
            if !filter.matches(&current) {
                continue;
            }

            let records = self
                .store()
                .write(handle.id(), &table, WriteOp::Delete(row), timeout)?;
            if records.is_empty() {
                continue;
            }
            self.manager
                .record_writes(handle, RowChange::Deleted, records)?;
            affected += 1;
        }

        log::debug!("{} deleted {} rows from {}", handle.id(), affected, table.name());
        Ok(affected)
    }

    /// Rows matching `filter` at the statement snapshot
    fn candidates(
        &self,
        handle: &TransactionHandle,
        table: &Arc<Table>,
        filter: &RowFilter,
    ) -> Result<Vec<RowId>, ExecutionError> {
        let snapshot = self.manager.statement_snapshot(handle)?;
        Ok(self
            .store()
            .read_all(Arc::clone(table), snapshot, handle.id())
            .filter(|(_, version)| filter.matches(version.values()))
            .map(|(row, _)| row)
            .collect())
    }

    fn select(
        &self,
        handle: &TransactionHandle,
        select: &SelectStatement,
    ) -> Result<ResultSet, ExecutionError> {
        let table = self.store().table(&select.table)?;
        let schema = table.schema();
        let filter = RowFilter::bind(select.filter.as_ref(), schema)?;

        let projection = match &select.projection {
            Projection::CountStar => None,
            Projection::All => Some((0..schema.columns.len()).collect::<Vec<_>>()),
            Projection::Columns(columns) => Some(
                columns
                    .iter()
                    .map(|column| schema.column_index(column))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        let snapshot = self.manager.statement_snapshot(handle)?;
        log::debug!(
            "{} scanning {} at {}",
            handle.id(),
            table.name(),
            snapshot.boundary()
        );
        let rows = self
            .store()
            .read_all(Arc::clone(&table), snapshot, handle.id());

        Ok(match projection {
            None => ResultSet::new(
                vec!["COUNT(*)".to_string()],
                CountIterator::new(rows, filter).boxed(),
            ),
            Some(indices) => {
                let columns = indices
                    .iter()
                    .map(|&index| schema.columns[index].name.clone())
                    .collect();
                ResultSet::new(columns, ScanIterator::new(rows, filter, indices).boxed())
            }
        })
    }
}

fn check_writable(handle: &TransactionHandle) -> Result<(), ExecutionError> {
    match handle.access_mode() {
        AccessMode::ReadOnly => Err(ExecutionError::ReadOnlyTransaction(handle.id())),
        AccessMode::ReadWrite => Ok(()),
    }
}

fn transaction_control(statement: &Statement) -> ExecutionError {
    ExecutionError::UnsupportedStatement(format!(
        "{} must be issued through the transaction API",
        statement.kind()
    ))
}

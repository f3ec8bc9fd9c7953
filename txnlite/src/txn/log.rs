// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction write-set logging
//!
//! Every version a transaction creates and every delete marker it places is
//! recorded here. Commit walks the log to stamp the commit sequence; rollback
//! walks it backwards to undo the writes.

use std::sync::Arc;

use crate::storage::{RowId, RowVersion, Table};

use super::state::TransactionId;

/// A single write-set entry
#[derive(Debug, Clone)]
pub enum WriteRecord {
    /// A version was created - to undo, remove it from its chain
    Created {
        table: Arc<Table>,
        row: RowId,
        version: Arc<RowVersion>,
    },
    /// A delete marker was placed - to undo, clear it
    Deleted {
        table: Arc<Table>,
        row: RowId,
        version: Arc<RowVersion>,
    },
}

impl WriteRecord {
    pub fn table_name(&self) -> &str {
        match self {
            WriteRecord::Created { table, .. } | WriteRecord::Deleted { table, .. } => {
                table.name()
            }
        }
    }

    pub fn row(&self) -> RowId {
        match self {
            WriteRecord::Created { row, .. } | WriteRecord::Deleted { row, .. } => *row,
        }
    }
}

/// Kind of row change a statement made, for the per-transaction counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowChange {
    Inserted,
    Updated,
    Deleted,
}

/// Position in a transaction's write set, taken before a statement runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Savepoint {
    records: usize,
    rows_inserted: u64,
    rows_updated: u64,
    rows_deleted: u64,
}

/// Write-set of one transaction
#[derive(Debug, Default)]
pub struct TransactionLog {
    records: Vec<WriteRecord>,
    rows_inserted: u64,
    rows_updated: u64,
    rows_deleted: u64,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the entries produced by one row change
    pub fn record(&mut self, change: RowChange, records: Vec<WriteRecord>) {
        match change {
            RowChange::Inserted => self.rows_inserted += 1,
            RowChange::Updated => self.rows_updated += 1,
            RowChange::Deleted => self.rows_deleted += 1,
        }
        self.records.extend(records);
    }

    pub fn records(&self) -> &[WriteRecord] {
        &self.records
    }

    /// Take the write set, leaving the log empty
    pub fn take_records(&mut self) -> Vec<WriteRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn savepoint(&self) -> Savepoint {
        Savepoint {
            records: self.records.len(),
            rows_inserted: self.rows_inserted,
            rows_updated: self.rows_updated,
            rows_deleted: self.rows_deleted,
        }
    }

    /// Remove and return the entries recorded after `savepoint`
    ///
    /// Returns nothing if the write set was already taken by commit or
    /// rollback.
    pub fn rollback_to(&mut self, savepoint: Savepoint) -> Vec<WriteRecord> {
        if self.records.len() < savepoint.records {
            return Vec::new();
        }
        self.rows_inserted = savepoint.rows_inserted;
        self.rows_updated = savepoint.rows_updated;
        self.rows_deleted = savepoint.rows_deleted;
        self.records.split_off(savepoint.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get a summary of the write set
    pub fn summary(&self, id: TransactionId) -> String {
        format!(
            "{}: {} inserted, {} updated, {} deleted ({} versions touched)",
            id,
            self.rows_inserted,
            self.rows_updated,
            self.rows_deleted,
            self.records.len()
        )
    }
}

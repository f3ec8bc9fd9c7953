// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Tables: a schema plus an ordered map of row id to version chain

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::schema::TableSchema;
use super::version::{RowVersion, VersionChain};
use crate::exec::error::ExecutionError;
use crate::txn::{CommitSeq, ReadView};

/// Catalog identifier of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableId(u64);

impl TableId {
    pub fn from_u64(id: u64) -> Self {
        TableId(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table_{}", self.0)
    }
}

/// Stable identity of a logical row within its table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowId(u64);

impl RowId {
    pub fn from_u64(id: u64) -> Self {
        RowId(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Counts removed by one prune pass over a table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneCounts {
    pub versions: usize,
    pub chains: usize,
}

/// An in-memory table
#[derive(Debug)]
pub struct Table {
    id: TableId,
    schema: TableSchema,
    next_row_id: AtomicU64,
    rows: RwLock<BTreeMap<RowId, Arc<VersionChain>>>,
}

impl Table {
    pub fn new(id: TableId, schema: TableSchema) -> Self {
        Self {
            id,
            schema,
            next_row_id: AtomicU64::new(1),
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Allocate a fresh row id; ids are never reused
    pub fn allocate_row_id(&self) -> Result<RowId, ExecutionError> {
        self.next_row_id
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |id| id.checked_add(1))
            .map(RowId)
            .map_err(|_| {
                ExecutionError::CapacityExceeded(format!(
                    "row id space exhausted for table {}",
                    self.name()
                ))
            })
    }

    pub fn chain(&self, row: RowId) -> Option<Arc<VersionChain>> {
        self.rows.read().get(&row).cloned()
    }

    /// Append a version to the row's chain, creating the chain if needed
    pub fn append_version(&self, row: RowId, version: Arc<RowVersion>) {
        let mut rows = self.rows.write();
        rows.entry(row)
            .or_insert_with(|| Arc::new(VersionChain::new()))
            .push(version);
    }

    /// Remove a version that its creator rolled back
    pub fn remove_version(&self, row: RowId, version: &Arc<RowVersion>) -> bool {
        let mut rows = self.rows.write();
        let Some(chain) = rows.get(&row) else {
            return false;
        };
        let removed = chain.remove(version);
        if chain.is_empty() {
            rows.remove(&row);
        }
        removed
    }

    /// Newest version of `row` visible to `view`
    pub fn read(&self, row: RowId, view: ReadView) -> Option<Arc<RowVersion>> {
        self.chain(row)?.latest_visible(view)
    }

    /// First chain with a row id strictly greater than `after`
    pub fn next_chain_after(&self, after: Option<RowId>) -> Option<(RowId, Arc<VersionChain>)> {
        let rows = self.rows.read();
        let lower = match after {
            Some(row) => Bound::Excluded(row),
            None => Bound::Unbounded,
        };
        rows.range((lower, Bound::Unbounded))
            .next()
            .map(|(row, chain)| (*row, Arc::clone(chain)))
    }

    /// Drop obsolete versions and the chains they leave empty
    pub fn prune(&self, horizon: CommitSeq) -> PruneCounts {
        let chains: Vec<Arc<VersionChain>> = self.rows.read().values().cloned().collect();
        let versions = chains.iter().map(|chain| chain.prune(horizon)).sum();

        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|_, chain| !chain.is_empty());
        PruneCounts {
            versions,
            chains: before - rows.len(),
        }
    }

    pub fn chain_count(&self) -> usize {
        self.rows.read().len()
    }

    pub fn version_count(&self) -> usize {
        self.rows.read().values().map(|chain| chain.len()).sum()
    }
}

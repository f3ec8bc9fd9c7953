// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Row iterators for lazy query results
//!
//! Scans pull one visible version at a time from the version store and
//! apply the statement's filter and projection as they go, so a result set
//! never materializes the table.

use super::error::ExecutionError;
use super::filter::RowFilter;
use super::result::Row;
use crate::storage::{Value, VisibleRows};

/// Iterator over result rows
pub trait RowIterator: Iterator<Item = Result<Row, ExecutionError>> {
    /// Estimated number of remaining rows (lower, upper)
    fn size_hint_rows(&self) -> (usize, Option<usize>) {
        self.size_hint()
    }

    fn boxed(self) -> Box<dyn RowIterator + Send>
    where
        Self: Sized + Send + 'static,
    {
        Box::new(self)
    }
}

/// Filtered, projected scan over the rows visible at one snapshot
pub struct ScanIterator {
    rows: VisibleRows,
    filter: RowFilter,
    /// Column positions to emit, in output order
    projection: Vec<usize>,
}

impl ScanIterator {
    pub fn new(rows: VisibleRows, filter: RowFilter, projection: Vec<usize>) -> Self {
        Self {
            rows,
            filter,
            projection,
        }
    }
}

impl Iterator for ScanIterator {
    type Item = Result<Row, ExecutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        for (_, version) in self.rows.by_ref() {
            let values = version.values();
            if !self.filter.matches(values) {
                continue;
            }
            let projected = self
                .projection
                .iter()
                .map(|&index| values.get(index).cloned().unwrap_or(Value::Null))
                .collect();
            return Some(Ok(Row::new(projected)));
        }
        None
    }
}

impl RowIterator for ScanIterator {}

/// `count(*)` over a scan, computed when first pulled
pub struct CountIterator {
    rows: Option<VisibleRows>,
    filter: RowFilter,
}

impl CountIterator {
    pub fn new(rows: VisibleRows, filter: RowFilter) -> Self {
        Self {
            rows: Some(rows),
            filter,
        }
    }
}

impl Iterator for CountIterator {
    type Item = Result<Row, ExecutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        let rows = self.rows.take()?;
        let count = rows
            .filter(|(_, version)| self.filter.matches(version.values()))
            .count();
        Some(
            i64::try_from(count)
                .map(|count| Row::new(vec![Value::BigInt(count)]))
                .map_err(|_| {
                    ExecutionError::CapacityExceeded(format!("row count {} overflows", count))
                }),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::from(self.rows.is_some());
        (remaining, Some(remaining))
    }
}

impl RowIterator for CountIterator {}

/// Empty result
pub struct EmptyRowIterator;

impl Iterator for EmptyRowIterator {
    type Item = Result<Row, ExecutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(0))
    }
}

impl RowIterator for EmptyRowIterator {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ColumnDefinition, DataType, TableSchema, VersionStore, WriteOp};
    use crate::txn::CommitClock;
    use std::sync::Arc;

    fn populated() -> (Arc<CommitClock>, VersionStore) {
        let clock = CommitClock::new(8);
        let store = VersionStore::new(Arc::clone(&clock));
        let schema = TableSchema::new(
            "t",
            vec![
                ColumnDefinition::new("a", DataType::TinyInt),
                ColumnDefinition::new("b", DataType::Varchar(None)),
            ],
        )
        .unwrap();
        store.create_table(schema, false).unwrap();
        (clock, store)
    }

    #[test]
    fn test_scan_projects_own_writes() {
        let (clock, store) = populated();
        let table = store.table("t").unwrap();
        let (txn, _) = clock.register().unwrap();
        for i in 1..=3u8 {
            store
                .write(
                    txn,
                    &table,
                    WriteOp::Insert(vec![Value::TinyInt(i), Value::Text(format!("r{}", i))]),
                    None,
                )
                .unwrap();
        }

        let snapshot = Arc::new(clock.snapshot());
        let scan = ScanIterator::new(
            store.read_all(Arc::clone(&table), Arc::clone(&snapshot), txn),
            RowFilter::accept_all(),
            vec![1],
        );
        let rows: Vec<Row> = scan.collect::<Result<_, _>>().unwrap();
        assert_eq!(
            rows.iter().map(|row| row.values.clone()).collect::<Vec<_>>(),
            vec![
                vec![Value::Text("r1".into())],
                vec![Value::Text("r2".into())],
                vec![Value::Text("r3".into())],
            ]
        );

        let mut count = CountIterator::new(
            store.read_all(table, snapshot, txn),
            RowFilter::accept_all(),
        );
        assert_eq!(count.size_hint_rows(), (1, Some(1)));
        assert_eq!(
            count.next().unwrap().unwrap().values,
            vec![Value::BigInt(3)]
        );
        assert!(count.next().is_none());
    }

    #[test]
    fn test_empty_iterator() {
        assert!(EmptyRowIterator.boxed().next().is_none());
    }
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query execution results

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ExecutionError;
use super::row_iterator::{EmptyRowIterator, RowIterator};
use crate::storage::{FromValue, Value};

/// One result row, values in projection order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get_value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Typed value at `index`
    pub fn get<T: FromValue>(&self, index: usize) -> Result<T, ExecutionError> {
        let value = self.values.get(index).ok_or_else(|| {
            ExecutionError::SchemaViolation(format!(
                "column index {} out of range for a row of {} values",
                index,
                self.values.len()
            ))
        })?;
        T::from_value(value).ok_or_else(|| {
            ExecutionError::SchemaViolation(format!(
                "cannot convert {} value {} to {}",
                value.type_name(),
                value,
                std::any::type_name::<T>()
            ))
        })
    }
}

/// Lazily produced rows of one query
///
/// Finite and not restartable. The statement snapshot stays pinned until the
/// result set is exhausted or dropped.
pub struct ResultSet {
    columns: Vec<String>,
    rows: Box<dyn RowIterator + Send>,
}

impl ResultSet {
    pub(crate) fn new(columns: Vec<String>, rows: Box<dyn RowIterator + Send>) -> Self {
        Self { columns, rows }
    }

    /// Result of a statement that produces no rows
    pub fn empty() -> Self {
        Self::new(Vec::new(), Box::new(EmptyRowIterator))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// First value of the first row, e.g. the result of `count(*)`
    pub fn scan<T: FromValue>(mut self) -> Result<T, ExecutionError> {
        match self.rows.next() {
            Some(row) => row?.get(0),
            None => Err(ExecutionError::RuntimeError(
                "query returned no rows".to_string(),
            )),
        }
    }

    pub fn collect_rows(self) -> Result<Vec<Row>, ExecutionError> {
        self.rows.collect()
    }

    /// Materialize into a [`QueryResult`]
    pub fn into_query_result(self) -> Result<QueryResult, ExecutionError> {
        let columns = self.columns.clone();
        let rows = self.collect_rows()?;
        Ok(QueryResult::with_rows(columns, rows))
    }
}

impl Iterator for ResultSet {
    type Item = Result<Row, ExecutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSet")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

/// Materialized outcome of one statement, as returned by sessions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub rows_affected: u64,
    /// Status text for statements without rows (BEGIN, COMMIT, DDL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            ..Self::default()
        }
    }

    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            ..Self::default()
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn has_rows(&self) -> bool {
        !self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rows(std::vec::IntoIter<Row>);

    impl Iterator for Rows {
        type Item = Result<Row, ExecutionError>;

        fn next(&mut self) -> Option<Self::Item> {
            self.0.next().map(Ok)
        }
    }

    impl RowIterator for Rows {}

    fn result_set(rows: Vec<Row>) -> ResultSet {
        ResultSet::new(vec!["i".to_string()], Rows(rows.into_iter()).boxed())
    }

    #[test]
    fn test_row_get_conversions() {
        let row = Row::new(vec![Value::TinyInt(42), Value::Null]);
        assert_eq!(row.get::<i64>(0).unwrap(), 42);
        assert_eq!(row.get::<Option<i64>>(1).unwrap(), None);
        assert!(row.get::<String>(0).is_ok());
        assert!(row.get::<bool>(0).is_err());
        assert!(row.get::<i64>(5).is_err());
    }

    #[test]
    fn test_scan_reads_first_value() {
        let rs = result_set(vec![Row::new(vec![Value::BigInt(3)])]);
        assert_eq!(rs.scan::<i64>().unwrap(), 3);
        assert!(result_set(Vec::new()).scan::<i64>().is_err());
    }

    #[test]
    fn test_into_query_result() {
        let rs = result_set(vec![
            Row::new(vec![Value::BigInt(1)]),
            Row::new(vec![Value::BigInt(2)]),
        ]);
        let result = rs.into_query_result().unwrap();
        assert_eq!(result.columns, vec!["i".to_string()]);
        assert_eq!(result.rows.len(), 2);
        assert!(result.has_rows());
        assert!(!QueryResult::affected(2).has_rows());
    }
}

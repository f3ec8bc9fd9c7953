// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement execution
//!
//! Turns parsed statements into version store reads and writes on behalf of
//! one transaction.

pub mod error;
pub mod executor;
pub mod filter;
pub mod result;
pub mod row_iterator;

pub use error::ExecutionError;
pub use executor::StatementExecutor;
pub use result::{QueryResult, ResultSet, Row};
pub use row_iterator::RowIterator;

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Database coordinator - the entry point that ties storage, transactions
//! and statement execution together

pub mod database;

pub use database::Database;

// Re-export types needed for the public API
pub use crate::exec::{QueryResult, ResultSet, Row};

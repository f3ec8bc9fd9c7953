// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Multi-version row storage
//!
//! - [`value`]: column values
//! - [`schema`]: column types and table schemas
//! - [`version`]: row versions and their visibility
//! - [`table`]: row id to version chain maps
//! - [`store`]: the catalog and the write path
//! - [`gc`]: reclaiming versions no reader can see

pub mod gc;
pub mod schema;
pub mod store;
pub mod table;
pub mod value;
pub mod version;

pub use gc::{GarbageCollector, GcStats};
pub use schema::{ColumnDefinition, DataType, TableSchema};
pub use store::{VersionStore, VisibleRows, WriteOp};
pub use table::{RowId, Table, TableId};
pub use value::{FromValue, Value};
pub use version::{RowVersion, VersionChain};

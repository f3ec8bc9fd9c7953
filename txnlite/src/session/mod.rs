// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Client sessions over a shared database
//!
//! - Auto-commit and manual-commit modes
//! - BEGIN / START TRANSACTION, COMMIT and ROLLBACK as statement text
//! - Rollback of an open transaction when the session is dropped

pub mod connection;
pub mod transaction_state;

pub use connection::Session;
pub use transaction_state::SessionTransactionState;

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for txnlite
//!
//! Provides an interactive console (REPL) and script execution.

pub mod commands;
pub mod console;
pub mod output;

pub use commands::{Cli, Commands};
pub use console::{handle_console, handle_run, load_config};

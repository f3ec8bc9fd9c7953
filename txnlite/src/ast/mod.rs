// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement language: lexer, parser and AST nodes

#[allow(clippy::module_inception)]
mod ast;
pub use ast::*;
pub mod lexer;
pub mod parser;

pub use parser::{parse_statement, split_script, ParserError};

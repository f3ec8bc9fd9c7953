// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Abstract syntax tree for the statement language

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::storage::{ColumnDefinition, Value};
use crate::txn::{AccessMode, IsolationLevel};

/// Top-level statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    CreateTable(CreateTableStatement),
    DropTable(DropTableStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Select(SelectStatement),
    TransactionStatement(TransactionStatement),
}

impl Statement {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::CreateTable(_) => "CREATE TABLE",
            Statement::DropTable(_) => "DROP TABLE",
            Statement::Insert(_) => "INSERT",
            Statement::Update(_) => "UPDATE",
            Statement::Delete(_) => "DELETE",
            Statement::Select(_) => "SELECT",
            Statement::TransactionStatement(TransactionStatement::StartTransaction(_)) => "BEGIN",
            Statement::TransactionStatement(TransactionStatement::Commit) => "COMMIT",
            Statement::TransactionStatement(TransactionStatement::Rollback) => "ROLLBACK",
        }
    }

    pub fn is_ddl(&self) -> bool {
        matches!(self, Statement::CreateTable(_) | Statement::DropTable(_))
    }

    pub fn is_dml(&self) -> bool {
        matches!(
            self,
            Statement::Insert(_) | Statement::Update(_) | Statement::Delete(_)
        )
    }
}

/// CREATE TABLE [IF NOT EXISTS] name (column type [NOT NULL], ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTableStatement {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub if_not_exists: bool,
}

/// DROP TABLE [IF EXISTS] name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropTableStatement {
    pub name: String,
    pub if_exists: bool,
}

/// INSERT INTO table [(columns)] VALUES (...), (...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Option<Vec<String>>,
    pub rows: Vec<Vec<Literal>>,
}

/// UPDATE table SET column = literal, ... [WHERE ...]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatement {
    pub table: String,
    pub assignments: Vec<Assignment>,
    pub filter: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub column: String,
    pub value: Literal,
}

/// DELETE FROM table [WHERE ...]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStatement {
    pub table: String,
    pub filter: Option<Predicate>,
}

/// SELECT projection FROM table [WHERE ...]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStatement {
    pub projection: Projection,
    pub table: String,
    pub filter: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    /// `*`
    All,
    Columns(Vec<String>),
    /// `count(*)`
    CountStar,
}

/// Transaction control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransactionStatement {
    StartTransaction(TransactionCharacteristics),
    Commit,
    Rollback,
}

/// Characteristics named in BEGIN / START TRANSACTION
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCharacteristics {
    pub isolation_level: Option<IsolationLevel>,
    pub access_mode: Option<AccessMode>,
}

/// Literal values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

impl Literal {
    pub fn to_value(&self) -> Value {
        match self {
            Literal::String(s) => Value::Text(s.clone()),
            Literal::Integer(i) => Value::BigInt(*i),
            Literal::Float(f) => Value::Double(*f),
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Null => Value::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl ComparisonOp {
    pub fn matches(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::Equal => ordering == Ordering::Equal,
            ComparisonOp::NotEqual => ordering != Ordering::Equal,
            ComparisonOp::Less => ordering == Ordering::Less,
            ComparisonOp::LessEqual => ordering != Ordering::Greater,
            ComparisonOp::Greater => ordering == Ordering::Greater,
            ComparisonOp::GreaterEqual => ordering != Ordering::Less,
        }
    }
}

/// A single WHERE condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Compare {
        column: String,
        op: ComparisonOp,
        value: Literal,
    },
    IsNull {
        column: String,
        negated: bool,
    },
}

impl Condition {
    pub fn column(&self) -> &str {
        match self {
            Condition::Compare { column, .. } | Condition::IsNull { column, .. } => column,
        }
    }
}

/// Conjunction of conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub conditions: Vec<Condition>,
}

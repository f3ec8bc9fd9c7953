// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! WHERE predicates bound to a table schema

use crate::ast::{ComparisonOp, Condition, Predicate};
use crate::exec::error::ExecutionError;
use crate::storage::{TableSchema, Value};

#[derive(Debug, Clone)]
enum BoundCondition {
    Compare {
        index: usize,
        op: ComparisonOp,
        value: Value,
    },
    IsNull {
        index: usize,
        negated: bool,
    },
}

/// A conjunction of conditions with columns resolved to positions
#[derive(Debug, Clone, Default)]
pub struct RowFilter {
    conditions: Vec<BoundCondition>,
}

impl RowFilter {
    /// Filter that accepts every row
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn bind(predicate: Option<&Predicate>, schema: &TableSchema) -> Result<Self, ExecutionError> {
        let Some(predicate) = predicate else {
            return Ok(Self::accept_all());
        };

        let conditions = predicate
            .conditions
            .iter()
            .map(|condition| {
                let index = schema.column_index(condition.column())?;
                Ok(match condition {
                    Condition::Compare { op, value, .. } => BoundCondition::Compare {
                        index,
                        op: *op,
                        value: value.to_value(),
                    },
                    Condition::IsNull { negated, .. } => BoundCondition::IsNull {
                        index,
                        negated: *negated,
                    },
                })
            })
            .collect::<Result<Vec<_>, ExecutionError>>()?;

        Ok(Self { conditions })
    }

    /// Comparisons involving NULL never match
    pub fn matches(&self, values: &[Value]) -> bool {
        self.conditions.iter().all(|condition| match condition {
            BoundCondition::Compare { index, op, value } => values
                .get(*index)
                .and_then(|actual| actual.compare(value))
                .is_some_and(|ordering| op.matches(ordering)),
            BoundCondition::IsNull { index, negated } => {
                let is_null = values.get(*index).map_or(true, Value::is_null);
                is_null != *negated
            }
        })
    }
}

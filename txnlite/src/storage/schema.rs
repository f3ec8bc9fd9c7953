// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Table schemas and column type enforcement

use serde::{Deserialize, Serialize};
use std::fmt;

use super::value::Value;
use crate::exec::error::ExecutionError;

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// Unsigned 8-bit integer, 0..=255
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Double,
    Boolean,
    /// Character data with an optional maximum length in characters
    Varchar(Option<u32>),
}

impl DataType {
    /// Resolve a type name as written in a column definition
    pub fn from_name(name: &str, length: Option<u32>) -> Option<Self> {
        let data_type = match name.to_ascii_uppercase().as_str() {
            "TINYINT" => DataType::TinyInt,
            "SMALLINT" => DataType::SmallInt,
            "INT" | "INTEGER" => DataType::Integer,
            "BIGINT" => DataType::BigInt,
            "DOUBLE" | "FLOAT" | "REAL" => DataType::Double,
            "BOOLEAN" | "BOOL" => DataType::Boolean,
            "VARCHAR" | "NVARCHAR" | "CHAR" | "NCHAR" => DataType::Varchar(length),
            "TEXT" | "STRING" => DataType::Varchar(None),
            _ => return None,
        };
        Some(data_type)
    }

    /// Convert a loosely typed value to this type, checking range and length
    pub fn coerce(&self, value: Value) -> Result<Value, String> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        let out_of_range = |v: &Value| format!("value {} out of range for {}", v, self);
        let mismatch = |v: &Value| format!("cannot store {} value {} in {}", v.type_name(), v, self);

        match self {
            DataType::TinyInt | DataType::SmallInt | DataType::Integer | DataType::BigInt => {
                let int = match &value {
                    Value::Double(d) if d.fract() == 0.0 => *d as i64,
                    other => other.as_i64().ok_or_else(|| mismatch(other))?,
                };
                match self {
                    DataType::TinyInt => u8::try_from(int)
                        .map(Value::TinyInt)
                        .map_err(|_| out_of_range(&value)),
                    DataType::SmallInt => i16::try_from(int)
                        .map(Value::SmallInt)
                        .map_err(|_| out_of_range(&value)),
                    DataType::Integer => i32::try_from(int)
                        .map(Value::Integer)
                        .map_err(|_| out_of_range(&value)),
                    _ => Ok(Value::BigInt(int)),
                }
            }
            DataType::Double => value
                .as_f64()
                .map(Value::Double)
                .ok_or_else(|| mismatch(&value)),
            DataType::Boolean => value
                .as_bool()
                .map(Value::Boolean)
                .ok_or_else(|| mismatch(&value)),
            DataType::Varchar(limit) => {
                let text = match value {
                    Value::Text(s) => s,
                    other => return Err(mismatch(&other)),
                };
                if let Some(limit) = limit {
                    let len = text.chars().count();
                    if len > *limit as usize {
                        return Err(format!(
                            "string of length {} exceeds {}",
                            len, self
                        ));
                    }
                }
                Ok(Value::Text(text))
            }
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::TinyInt => write!(f, "TINYINT"),
            DataType::SmallInt => write!(f, "SMALLINT"),
            DataType::Integer => write!(f, "INTEGER"),
            DataType::BigInt => write!(f, "BIGINT"),
            DataType::Double => write!(f, "DOUBLE"),
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Varchar(Some(n)) => write!(f, "VARCHAR({})", n),
            DataType::Varchar(None) => write!(f, "VARCHAR"),
        }
    }
}

/// A column in a table schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Schema of one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

impl TableSchema {
    /// Build a schema, rejecting empty and duplicate column lists
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Result<Self, ExecutionError> {
        let name = name.into();
        if columns.is_empty() {
            return Err(ExecutionError::SchemaViolation(format!(
                "table {} must declare at least one column",
                name
            )));
        }
        for (i, column) in columns.iter().enumerate() {
            if columns[..i]
                .iter()
                .any(|c| c.name.eq_ignore_ascii_case(&column.name))
            {
                return Err(ExecutionError::SchemaViolation(format!(
                    "duplicate column {} in table {}",
                    column.name, name
                )));
            }
        }
        Ok(Self { name, columns })
    }

    /// Position of a column, matched case-insensitively
    pub fn column_index(&self, column: &str) -> Result<usize, ExecutionError> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(column))
            .ok_or_else(|| {
                ExecutionError::SchemaViolation(format!(
                    "unknown column {} in table {}",
                    column, self.name
                ))
            })
    }

    /// Coerce and check a value destined for column `index`
    pub fn check_value(&self, index: usize, value: Value) -> Result<Value, ExecutionError> {
        let column = &self.columns[index];
        let value = column.data_type.coerce(value).map_err(|reason| {
            ExecutionError::SchemaViolation(format!(
                "column {}.{}: {}",
                self.name, column.name, reason
            ))
        })?;
        if value.is_null() && !column.nullable {
            return Err(ExecutionError::SchemaViolation(format!(
                "column {}.{} is NOT NULL",
                self.name, column.name
            )));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> TableSchema {
        TableSchema::new(
            "t",
            vec![
                ColumnDefinition::new("i", DataType::TinyInt).not_null(),
                ColumnDefinition::new("name", DataType::Varchar(Some(3))),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_tinyint_is_unsigned_byte() {
        assert_eq!(
            DataType::TinyInt.coerce(Value::BigInt(255)),
            Ok(Value::TinyInt(255))
        );
        assert!(DataType::TinyInt.coerce(Value::BigInt(256)).is_err());
        assert!(DataType::TinyInt.coerce(Value::BigInt(-1)).is_err());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(DataType::from_name("int", None), Some(DataType::Integer));
        assert_eq!(
            DataType::from_name("NVARCHAR", Some(10)),
            Some(DataType::Varchar(Some(10)))
        );
        assert_eq!(DataType::from_name("blob", None), None);
    }

    #[test]
    fn test_check_value_enforces_constraints() {
        let schema = schema();
        assert_eq!(
            schema.check_value(0, Value::BigInt(42)).unwrap(),
            Value::TinyInt(42)
        );
        assert!(schema.check_value(0, Value::Null).is_err());
        assert!(schema.check_value(1, Value::Text("abcd".into())).is_err());
        assert!(schema.check_value(1, Value::BigInt(1)).is_err());
        assert_eq!(schema.check_value(1, Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let schema = schema();
        assert_eq!(schema.column_index("NAME").unwrap(), 1);
        assert!(matches!(
            schema.column_index("missing"),
            Err(ExecutionError::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let result = TableSchema::new(
            "dup",
            vec![
                ColumnDefinition::new("a", DataType::Integer),
                ColumnDefinition::new("A", DataType::Integer),
            ],
        );
        assert!(result.is_err());
    }
}

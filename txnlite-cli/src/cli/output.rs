// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result formatting for CLI output

use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use txnlite::{QueryResult, Value};

use super::commands::OutputFormat;

/// Result formatter for different output formats
pub struct ResultFormatter;

impl ResultFormatter {
    pub fn format(result: &QueryResult, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => Self::format_table(result),
            OutputFormat::Json => Self::format_json(result),
            OutputFormat::Csv => Self::format_csv(result),
        }
    }

    /// Format results as a table using comfy-table
    fn format_table(result: &QueryResult) -> String {
        if let Some(message) = &result.message {
            return format!("{}\n", message.green());
        }

        if !result.has_rows() {
            return format!(
                "{} ({} ms)\n",
                format!("{} rows affected", result.rows_affected).green(),
                result.execution_time_ms
            );
        }

        if result.rows.is_empty() {
            return format!("{}\n", "No rows".yellow());
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(
            result
                .columns
                .iter()
                .map(|column| Cell::new(column).fg(Color::Green))
                .collect::<Vec<_>>(),
        );
        for row in &result.rows {
            table.add_row(row.values.iter().map(Self::value_to_string).collect::<Vec<_>>());
        }

        format!(
            "{}\n{} rows ({} ms)\n",
            table,
            result.rows.len(),
            result.execution_time_ms
        )
    }

    /// Format results as JSON
    fn format_json(result: &QueryResult) -> String {
        let json = serde_json::json!({
            "status": "success",
            "message": result.message,
            "columns": result.columns,
            "rows": result.rows.iter().map(|row| {
                let object: serde_json::Map<String, serde_json::Value> = result
                    .columns
                    .iter()
                    .zip(&row.values)
                    .map(|(column, value)| (column.clone(), Self::value_to_json(value)))
                    .collect();
                serde_json::Value::Object(object)
            }).collect::<Vec<_>>(),
            "rows_affected": result.rows_affected,
            "execution_time_ms": result.execution_time_ms,
        });

        serde_json::to_string_pretty(&json).unwrap_or_else(|_| {
            "{\"status\": \"error\", \"error\": \"Could not serialize results to JSON\"}"
                .to_string()
        })
    }

    /// Format results as CSV
    fn format_csv(result: &QueryResult) -> String {
        if !result.has_rows() {
            return match &result.message {
                Some(message) => format!("# {}\n", message),
                None => format!("# {} rows affected\n", result.rows_affected),
            };
        }

        let mut output = result.columns.join(",");
        output.push('\n');
        for row in &result.rows {
            let line: Vec<String> = row.values.iter().map(Self::value_to_csv_string).collect();
            output.push_str(&line.join(","));
            output.push('\n');
        }
        output
    }

    fn value_to_string(value: &Value) -> String {
        value.to_string()
    }

    fn value_to_json(value: &Value) -> serde_json::Value {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::TinyInt(v) => serde_json::json!(v),
            Value::SmallInt(v) => serde_json::json!(v),
            Value::Integer(v) => serde_json::json!(v),
            Value::BigInt(v) => serde_json::json!(v),
            Value::Double(v) => serde_json::json!(v),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// CSV-safe rendering; NULL is an empty field
    fn value_to_csv_string(value: &Value) -> String {
        if value.is_null() {
            return String::new();
        }
        let s = Self::value_to_string(value);
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txnlite::Row;

    fn result() -> QueryResult {
        QueryResult::with_rows(
            vec!["i".to_string(), "s".to_string()],
            vec![
                Row::new(vec![Value::TinyInt(1), Value::Text("a,b".to_string())]),
                Row::new(vec![Value::TinyInt(2), Value::Null]),
            ],
        )
    }

    #[test]
    fn test_csv_quotes_and_nulls() {
        let csv = ResultFormatter::format(&result(), OutputFormat::Csv);
        assert_eq!(csv, "i,s\n1,\"a,b\"\n2,\n");
    }

    #[test]
    fn test_json_rows_are_objects() {
        let json = ResultFormatter::format(&result(), OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["rows"][0]["i"], serde_json::json!(1));
        assert_eq!(parsed["rows"][1]["s"], serde_json::Value::Null);
    }

    #[test]
    fn test_affected_rows_summary() {
        let csv = ResultFormatter::format(&QueryResult::affected(3), OutputFormat::Csv);
        assert_eq!(csv, "# 3 rows affected\n");
    }
}

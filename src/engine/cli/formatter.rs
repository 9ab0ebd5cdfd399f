//! CLI Output Formatting Module
//! Colorized terminal output for rows and table definitions

use colored::Colorize;

use crate::engine::definition::Table;
use crate::engine::value::{Row, Value};

/// Cells longer than this are cut with an ellipsis
const MAX_CELL: usize = 40;

pub struct CliFormatter;

impl CliFormatter {
    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue().bold(), message);
    }

    /// Print a section header
    pub fn header(title: &str) {
        println!("\n{}", title.bright_cyan().bold());
        println!("{}", "─".repeat(title.chars().count()).bright_black());
    }

    /// Print a key-value pair
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", key.bright_white().bold(), value);
    }

    /// Print a table header
    pub fn table_header(columns: &[String]) {
        let header = columns
            .iter()
            .map(|c| c.bright_white().bold().to_string())
            .collect::<Vec<_>>()
            .join(" │ ");
        let width: usize = columns.iter().map(|c| c.chars().count()).sum::<usize>() + 3 * columns.len().saturating_sub(1);
        println!("  {}", header);
        println!("  {}", "─".repeat(width).bright_black());
    }

    /// Print a table row
    pub fn table_row(values: &[String]) {
        println!("  {}", values.join(" │ "));
    }

    /// Column listing of a table definition
    pub fn describe(table: &Table) {
        Self::header(&table.qn());
        for column in table.columns() {
            let mut flags = Vec::new();
            if column.primary_key {
                flags.push("primary key");
            } else if column.unique {
                flags.push("unique");
            }
            if column.required {
                flags.push("required");
            }
            let kind = column.column_type.to_string();
            if flags.is_empty() {
                Self::kv(&column.name, &kind);
            } else {
                Self::kv(&column.name, &format!("{} {}", kind, format!("({})", flags.join(", ")).bright_black()));
            }
        }
    }

    /// Rows as a pipe-separated table; columns follow the first row
    pub fn rows(rows: &[Row]) {
        let Some(first) = rows.first() else {
            Self::info("No rows");
            return;
        };
        let columns: Vec<String> = first.keys().map(str::to_string).collect();
        Self::table_header(&columns);
        for row in rows {
            let cells: Vec<String> = columns
                .iter()
                .map(|c| row.get(c).map(format_value).unwrap_or_default())
                .collect();
            Self::table_row(&cells);
        }
        println!("\n  {} row(s)", rows.len().to_string().bright_white().bold());
    }
}

/// One cell of text output
pub fn format_value(value: &Value) -> String {
    let text = match value {
        Value::Null => return "NULL".bright_black().to_string(),
        Value::Text(s) => s.clone(),
        other => other.to_json().to_string(),
    };
    truncate(&text, MAX_CELL)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&Value::Text("bolt".into())), "bolt");
        assert_eq!(format_value(&Value::Integer(7)), "7");
        assert_eq!(format_value(&Value::Bool(true)), "true");
        assert_eq!(format_value(&Value::TextSet(vec!["a".into(), "b".into()])), r#"["a","b"]"#);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}

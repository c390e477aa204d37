//! CLI command implementations

pub mod export;
pub mod table;

use tk_db::Record;

use crate::OutputFormat;

/// Parse a `column=value` filter condition.
pub fn parse_condition(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected column=value, got '{}'", raw)),
    }
}

pub fn print_rows(rows: &[Record], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("No rows.");
                return Ok(());
            }
            for row in rows {
                println!("- {}", format_row(row));
            }
        }
    }
    Ok(())
}

fn format_row(row: &Record) -> String {
    row.iter()
        .map(|(column, value)| match value {
            serde_json::Value::String(s) => format!("{}={}", column, s),
            other => format!("{}={}", column, other),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

//! Row reads and deletes

use tk_core::{Filter, Page, Value};

use crate::commands::print_rows;
use crate::config::CliContext;
use crate::OutputFormat;

pub async fn query(
    ctx: &CliContext,
    table: &str,
    conditions: Vec<(String, String)>,
    page_size: u64,
    page: u64,
    transform: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let table = ctx.table(table)?;
    let filter = build_filter(conditions);
    let page = Some(Page::new(page_size, page)).filter(Page::is_active);

    let rows = table.query(Some(filter), page, transform).await?;
    tracing::debug!(rows = rows.len(), table = table.name(), "query finished");
    print_rows(&rows, format)
}

pub async fn get(
    ctx: &CliContext,
    table: &str,
    id: &str,
    transform: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let table = ctx.table(table)?;
    match table.by_id(Value::parse_literal(id), transform).await? {
        Some(row) => print_rows(&[row], format),
        None => {
            println!("No row with id {}.", id);
            Ok(())
        }
    }
}

pub async fn delete(ctx: &CliContext, table: &str, id: &str) -> anyhow::Result<()> {
    let table = ctx.table(table)?;
    let removed = table.delete(Value::parse_literal(id)).await?;
    println!("Deleted {} row(s) from {}.", removed, table.name());
    Ok(())
}

fn build_filter(conditions: Vec<(String, String)>) -> Filter {
    conditions
        .into_iter()
        .map(|(column, raw)| (column, Value::parse_literal(&raw)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_parses_literals() {
        let filter = build_filter(vec![
            ("stringCol".to_string(), "null".to_string()),
            ("integerCol".to_string(), "1".to_string()),
            ("name".to_string(), "abc".to_string()),
        ]);

        assert_eq!(filter.keys().collect::<Vec<_>>(), vec!["stringCol", "integerCol", "name"]);
        assert_eq!(filter.get("stringCol"), Some(&Value::Null));
        assert_eq!(filter.get("integerCol"), Some(&Value::Int(1)));
        assert_eq!(filter.get("name"), Some(&Value::Text("abc".to_string())));
    }
}

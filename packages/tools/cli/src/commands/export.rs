//! Table export

use std::path::PathBuf;

use tokio::io::BufWriter;
use tk_db::JsonFormat;

use crate::config::CliContext;

pub async fn run(ctx: &CliContext, table: &str, output: Option<PathBuf>, lines: bool) -> anyhow::Result<()> {
    let table = ctx.table(table)?;
    let format = if lines { JsonFormat::Lines } else { JsonFormat::Array };

    let rows = match &output {
        Some(path) => {
            let file = tokio::fs::File::create(path).await?;
            table.export_json(BufWriter::new(file), format).await?
        }
        None => table.export_json(BufWriter::new(tokio::io::stdout()), format).await?,
    };

    if let Some(path) = output {
        eprintln!("Exported {} row(s) from {} to {}.", rows, table.name(), path.display());
    }
    Ok(())
}

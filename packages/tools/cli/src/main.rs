//! tablekit CLI (`tk`)
//!
//! Read, export and delete rows of PostgreSQL tables through the generic
//! table layer, without writing SQL.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "tk")]
#[command(author, version, about = "tablekit CLI - query and export PostgreSQL tables", long_about = None)]
struct Cli {
    /// Database URL (overrides TK_DATABASE_URL / DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// JSON file of table descriptors ([{"tableName", "refName"}])
    #[arg(long, global = true, env = "TK_TABLES")]
    tables: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────
    /// Query rows by equality filter
    Query {
        /// Table (ref name when --tables is given)
        table: String,

        /// Filter condition `column=value`, repeatable. `null` matches NULL.
        #[arg(long = "where", value_parser = commands::parse_condition)]
        conditions: Vec<(String, String)>,

        #[arg(long, default_value = "0")]
        page_size: u64,

        #[arg(long, default_value = "1")]
        page: u64,

        /// Skip table converters
        #[arg(long)]
        raw: bool,
    },

    /// Fetch one row by id
    Get {
        table: String,
        id: String,

        #[arg(long)]
        raw: bool,
    },

    /// Stream a whole table as JSON
    Export {
        table: String,

        /// Output file (defaults to stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Newline-delimited JSON instead of one array
        #[arg(long)]
        lines: bool,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────
    /// Delete rows by id
    Delete { table: String, id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries data; logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tk=info,tk_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = CliConfig::resolve(cli.database_url, cli.tables)?;
    let ctx = config.context().await?;

    match cli.command {
        Commands::Query {
            table,
            conditions,
            page_size,
            page,
            raw,
        } => commands::table::query(&ctx, &table, conditions, page_size, page, !raw, cli.format).await,
        Commands::Get { table, id, raw } => commands::table::get(&ctx, &table, &id, !raw, cli.format).await,
        Commands::Delete { table, id } => commands::table::delete(&ctx, &table, &id).await,
        Commands::Export {
            table,
            output,
            lines,
        } => commands::export::run(&ctx, &table, output, lines).await,
    }
}

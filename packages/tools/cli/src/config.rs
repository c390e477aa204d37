//! CLI configuration

use std::path::PathBuf;
use std::sync::Arc;

use tk_db::{connect, load_descriptors, Context, DbConfig, PgPoolConnection, TableDescriptor};

/// Effective settings after flags, environment and `.env`
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db: DbConfig,

    /// Descriptor file; without it table arguments are plain table names
    pub tables: Option<PathBuf>,
}

impl CliConfig {
    /// Flags win over the environment.
    pub fn resolve(database_url: Option<String>, tables: Option<PathBuf>) -> anyhow::Result<Self> {
        let db = match database_url {
            Some(url) => DbConfig {
                database_url: url,
                ..DbConfig::from_env().unwrap_or_else(|_| DbConfig::new(""))
            },
            None => DbConfig::from_env()?,
        };
        Ok(Self { db, tables })
    }

    pub fn descriptors(&self) -> anyhow::Result<Vec<TableDescriptor>> {
        match &self.tables {
            Some(path) => Ok(load_descriptors(path)?),
            None => Ok(Vec::new()),
        }
    }

    /// Connect and build a context over the configured tables.
    pub async fn context(&self) -> anyhow::Result<CliContext> {
        let pool = connect(&self.db).await?;
        let ctx = Context::new(Arc::new(PgPoolConnection::new(pool)), self.descriptors()?);
        Ok(CliContext {
            ctx,
            strict: self.tables.is_some(),
        })
    }
}

/// Context plus how table arguments are resolved.
pub struct CliContext {
    pub ctx: Context,
    strict: bool,
}

impl CliContext {
    /// Look up `name` as a ref name; without a descriptor file, any name is
    /// accepted as a table name.
    pub fn table(&self, name: &str) -> anyhow::Result<tk_db::Table> {
        match self.ctx.table(name) {
            Ok(table) => Ok(table.clone()),
            Err(_) if !self.strict => Ok(tk_db::Table::new(name, self.ctx.connection().clone())),
            Err(e) => Err(e.into()),
        }
    }
}

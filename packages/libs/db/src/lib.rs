//! tk-db: table handles over PostgreSQL
//!
//! Binds the statement builders from `tk-sql` to a live connection.
//!
//! # Modules
//!
//! - `connection`: the `Connection` / `TxConnection` seam
//! - `postgres`: sqlx implementation (pool and transaction)
//! - `table`: per-table CRUD handle
//! - `converter`: inbound / outbound / query hooks
//! - `factory`: how a context builds its tables
//! - `context`: table registry and transaction scoping
//! - `stream`: cursor-backed JSON export
//! - `config`: pool settings from the environment
//!
//! # Example
//!
//! ```ignore
//! let pool = tk_db::connect(&DbConfig::from_env()?).await?;
//! let ctx = Context::new(
//!     Arc::new(PgPoolConnection::new(pool)),
//!     vec![TableDescriptor::new("public.test", "test")],
//! );
//!
//! let rows = ctx.table("test")?.query(Some(payload! { "stringCol" => Value::Null }), None, true).await?;
//!
//! ctx.in_transaction(|tx| async move {
//!     tx.table("test")?.delete(1).await?;
//!     Ok::<_, DbError>(())
//! })
//! .await?;
//! ```

pub mod config;
pub mod connection;
pub mod context;
pub mod converter;
pub mod error;
pub mod factory;
pub mod postgres;
pub mod stream;
pub mod table;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{connect, load_descriptors, DbConfig};
pub use connection::{Connection, Record, RowSink, TxConnection};
pub use context::{Context, TableDescriptor};
pub use converter::{InboundConverter, ModifiedAtStamp, OutboundConverter, QueryConverter};
pub use error::{DbError, Result};
pub use factory::{CustomTableFactory, DefaultTableFactory, TableFactory};
pub use postgres::{PgPoolConnection, PgTransaction};
pub use stream::{stream_json, JsonFormat, JsonSink};
pub use table::{Table, DEFAULT_CREATED_AT_COLUMN};

//! Connection primitive
//!
//! The seam between table handles and the database. Table handles only need
//! "run this statement and give me zero/one/many rows", a streaming pass and
//! a way to open a transaction; [`crate::postgres`] implements it over sqlx.

use std::sync::Arc;

use async_trait::async_trait;
use tk_sql::Statement;

use crate::error::Result;

/// A decoded row: column name → JSON value, in column order
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Receives rows one at a time from [`Connection::for_each_row`].
#[async_trait]
pub trait RowSink: Send {
    async fn accept(&mut self, row: Record) -> Result<()>;
}

/// Statement executor
#[async_trait]
pub trait Connection: Send + Sync {
    /// Exactly one row. Zero rows is `sqlx::Error::RowNotFound`, more than
    /// one is `DbError::MultipleRows`.
    async fn one(&self, stmt: &Statement) -> Result<Record>;

    /// Zero or one row; more than one is `DbError::MultipleRows`.
    async fn one_or_none(&self, stmt: &Statement) -> Result<Option<Record>>;

    /// Any number of rows
    async fn many_or_none(&self, stmt: &Statement) -> Result<Vec<Record>>;

    /// No rows expected. Returns the affected row count, which callers such
    /// as `Table::delete` pass on; callers that only need success ignore it.
    async fn none(&self, stmt: &Statement) -> Result<u64>;

    /// Stream rows into `sink` as they arrive. Returns the number of rows.
    async fn for_each_row(&self, stmt: &Statement, sink: &mut dyn RowSink) -> Result<u64>;

    /// Open a transaction scope on this connection.
    async fn begin(&self) -> Result<Arc<dyn TxConnection>>;
}

/// A connection bound to an open transaction (or savepoint).
///
/// Once committed or rolled back, every further call fails with
/// `DbError::TransactionClosed`.
#[async_trait]
pub trait TxConnection: Connection {
    async fn commit(&self) -> Result<()>;

    async fn rollback(&self) -> Result<()>;

    fn into_connection(self: Arc<Self>) -> Arc<dyn Connection>;
}

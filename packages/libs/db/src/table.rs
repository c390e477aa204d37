//! Table handle
//!
//! A [`Table`] binds a table name, a connection, a projection and optional
//! converters, and exposes CRUD and filtered reads without hand-written SQL.
//!
//! Every read/write takes a `transform` flag. With `transform = false` all
//! converters are bypassed and raw rows come back.

use std::sync::Arc;

use futures::future::try_join_all;
use tokio::io::AsyncWrite;

use tk_core::{Filter, Identifier, Operation, Page, Payload, Value, ID_COLUMN};
use tk_sql::{DeleteBuilder, InsertBuilder, SelectBuilder, UpdateBuilder, DEFAULT_PROJECTION};

use crate::connection::{Connection, Record};
use crate::converter::{InboundConverter, OutboundConverter, QueryConverter};
use crate::error::Result;
use crate::stream::{stream_json, JsonFormat};

/// Server-assigned creation column, never written on insert
pub const DEFAULT_CREATED_AT_COLUMN: &str = "createdAt";

/// Handle for one table on one connection
#[derive(Clone)]
pub struct Table {
    name: String,
    projection: String,
    created_at_column: Option<String>,
    connection: Arc<dyn Connection>,
    inbound: Option<Arc<dyn InboundConverter>>,
    outbound: Option<Arc<dyn OutboundConverter>>,
    query: Option<Arc<dyn QueryConverter>>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("projection", &self.projection)
            .field("created_at_column", &self.created_at_column)
            .field("inbound", &self.inbound.is_some())
            .field("outbound", &self.outbound.is_some())
            .field("query", &self.query.is_some())
            .finish()
    }
}

impl Table {
    pub fn new(name: impl Into<String>, connection: Arc<dyn Connection>) -> Self {
        Self {
            name: name.into(),
            projection: DEFAULT_PROJECTION.to_string(),
            created_at_column: Some(DEFAULT_CREATED_AT_COLUMN.to_string()),
            connection,
            inbound: None,
            outbound: None,
            query: None,
        }
    }

    /// Column list returned by reads and `returning` clauses (default `*`).
    pub fn with_projection(mut self, projection: impl Into<String>) -> Self {
        self.projection = projection.into();
        self
    }

    /// Override or disable (`None`) the server-assigned creation column.
    pub fn with_created_at_column(mut self, column: Option<&str>) -> Self {
        self.created_at_column = column.map(str::to_string);
        self
    }

    pub fn with_inbound(mut self, converter: impl InboundConverter + 'static) -> Self {
        self.inbound = Some(Arc::new(converter));
        self
    }

    pub fn with_outbound(mut self, converter: impl OutboundConverter + 'static) -> Self {
        self.outbound = Some(Arc::new(converter));
        self
    }

    pub fn with_query_converter(mut self, converter: impl QueryConverter + 'static) -> Self {
        self.query = Some(Arc::new(converter));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn projection(&self) -> &str {
        &self.projection
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Same table and converters on another connection.
    pub fn rebind(&self, connection: Arc<dyn Connection>) -> Self {
        Self {
            connection,
            ..self.clone()
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert one row and return it.
    ///
    /// An `id` field is dropped unless `allow_pk_insert` is set; the creation
    /// column is always dropped.
    pub async fn insert(&self, mut payload: Payload, transform: bool, allow_pk_insert: bool) -> Result<Record> {
        if !allow_pk_insert {
            payload.remove(ID_COLUMN);
        }
        let mut payload = self.inbound(payload, Operation::Insert, transform)?;
        if let Some(column) = &self.created_at_column {
            payload.remove(column);
        }

        let stmt = InsertBuilder::new(&self.name, &self.projection).build(&payload)?;
        let row = self.connection.one(&stmt).await?;
        self.outbound(row, Operation::Insert, transform)
    }

    /// Update the single row at `id` and return it.
    pub async fn update(&self, id: impl Into<Identifier>, payload: Payload, transform: bool) -> Result<Record> {
        let key = id.into().resolve()?;
        let payload = self.inbound(payload, Operation::Update, transform)?;

        let stmt = UpdateBuilder::new(&self.name, &self.projection).build(&key, &payload)?;
        let row = self.connection.one(&stmt).await?;
        self.outbound(row, Operation::Update, transform)
    }

    /// Delete the rows at `id`, returning how many were removed.
    pub async fn delete(&self, id: impl Into<Identifier>) -> Result<u64> {
        let key = id.into().resolve()?;
        let stmt = DeleteBuilder::new(&self.name).build(&key);
        self.connection.none(&stmt).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn by_id(&self, id: impl Into<Value>, transform: bool) -> Result<Option<Record>> {
        self.one(Payload::new().with(ID_COLUMN, id), transform).await
    }

    pub async fn all(&self, page: Option<Page>, transform: bool) -> Result<Vec<Record>> {
        let stmt = SelectBuilder::new(&self.name, &self.projection).all(page);
        let rows = self.connection.many_or_none(&stmt).await?;
        self.outbound_all(rows, transform)
    }

    /// Filtered read. A missing or empty filter reads the whole table.
    pub async fn query(&self, filter: Option<Filter>, page: Option<Page>, transform: bool) -> Result<Vec<Record>> {
        let filter = match filter {
            Some(filter) if !filter.is_empty() => filter,
            _ => return self.all(page, transform).await,
        };
        let filter = match &self.query {
            Some(converter) if transform => converter.convert(filter)?,
            _ => filter,
        };

        let stmt = SelectBuilder::new(&self.name, &self.projection).filtered(&filter, page);
        let rows = self.connection.many_or_none(&stmt).await?;
        self.outbound_all(rows, transform)
    }

    pub async fn many(&self, filter: Option<Filter>, page: Option<Page>, transform: bool) -> Result<Vec<Record>> {
        self.query(filter, page, transform).await
    }

    /// First matching row; no match is `Ok(None)`.
    pub async fn one(&self, filter: Filter, transform: bool) -> Result<Option<Record>> {
        let rows = self.query(Some(filter), None, transform).await?;
        Ok(rows.into_iter().next())
    }

    /// Read with a caller-built predicate, e.g. `"\"age\" > $1"`.
    pub async fn raw_where(&self, where_clause: &str, values: Vec<Value>, transform: bool) -> Result<Vec<Record>> {
        let stmt = SelectBuilder::new(&self.name, &self.projection).raw_where(where_clause, values);
        let rows = self.connection.many_or_none(&stmt).await?;
        self.outbound_all(rows, transform)
    }

    /// Zero-or-one variant of [`Table::raw_where`].
    pub async fn raw_where_one(&self, where_clause: &str, values: Vec<Value>, transform: bool) -> Result<Option<Record>> {
        let stmt = SelectBuilder::new(&self.name, &self.projection).raw_where(where_clause, values);
        match self.connection.one_or_none(&stmt).await? {
            Some(row) => Ok(Some(self.outbound(row, Operation::Query, transform)?)),
            None => Ok(None),
        }
    }

    /// Run one query per filter concurrently. Rows come back grouped in the
    /// order of `filters`, whatever order the queries finish in.
    pub async fn multi_query(&self, filters: Vec<Filter>, transform: bool) -> Result<Vec<Record>> {
        let results = try_join_all(
            filters
                .into_iter()
                .map(|filter| self.query(Some(filter), None, transform)),
        )
        .await?;
        Ok(results.into_iter().flatten().collect())
    }

    /// Stream the whole table as JSON into `out` without buffering it.
    /// Rows are written raw; converters do not apply.
    pub async fn export_json<W>(&self, out: W, format: JsonFormat) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let stmt = SelectBuilder::new(&self.name, &self.projection).all(None);
        stream_json(self.connection.as_ref(), &stmt.sql, stmt.params, out, format).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Conversion
    // ─────────────────────────────────────────────────────────────────────────

    fn inbound(&self, payload: Payload, operation: Operation, transform: bool) -> Result<Payload> {
        match &self.inbound {
            Some(converter) if transform => Ok(converter.convert(payload, operation)?),
            _ => Ok(payload),
        }
    }

    fn outbound(&self, row: Record, operation: Operation, transform: bool) -> Result<Record> {
        match &self.outbound {
            Some(converter) if transform => Ok(converter.convert(row, operation)?),
            _ => Ok(row),
        }
    }

    fn outbound_all(&self, rows: Vec<Record>, transform: bool) -> Result<Vec<Record>> {
        rows.into_iter()
            .map(|row| self.outbound(row, Operation::Query, transform))
            .collect()
    }
}

//! In-memory [`Connection`] for unit tests.
//!
//! Records every executed statement and transaction event, answers with
//! canned rows, and can delay answers per statement.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tk_sql::Statement;

use crate::connection::{Connection, Record, RowSink, TxConnection};
use crate::error::{DbError, Result};

type Responder = Arc<dyn Fn(&Statement) -> Vec<Record> + Send + Sync>;
type Delay = Arc<dyn Fn(&Statement) -> Duration + Send + Sync>;

#[derive(Default)]
struct Log {
    statements: Vec<Statement>,
    events: Vec<String>,
}

#[derive(Clone)]
pub struct MockConnection {
    log: Arc<Mutex<Log>>,
    responder: Responder,
    delay: Option<Delay>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Log::default())),
            responder: Arc::new(|_| Vec::new()),
            delay: None,
        }
    }

    /// Answer every statement with `rows`.
    pub fn with_rows(self, rows: Vec<Record>) -> Self {
        self.with_responder(move |_| rows.clone())
    }

    pub fn with_responder(mut self, f: impl Fn(&Statement) -> Vec<Record> + Send + Sync + 'static) -> Self {
        self.responder = Arc::new(f);
        self
    }

    pub fn with_delay(mut self, f: impl Fn(&Statement) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Some(Arc::new(f));
        self
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.log.lock().unwrap().statements.clone()
    }

    pub fn last_statement(&self) -> Statement {
        self.statements().pop().expect("no statement executed")
    }

    pub fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().events.clone()
    }

    fn event(&self, name: &str) {
        self.log.lock().unwrap().events.push(name.to_string());
    }

    async fn run(&self, stmt: &Statement) -> Vec<Record> {
        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(stmt)).await;
        }
        self.log.lock().unwrap().statements.push(stmt.clone());
        (self.responder)(stmt)
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn one(&self, stmt: &Statement) -> Result<Record> {
        let mut rows = self.run(stmt).await;
        match rows.len() {
            0 => Err(DbError::Database(sqlx::Error::RowNotFound)),
            1 => Ok(rows.remove(0)),
            count => Err(DbError::MultipleRows { count }),
        }
    }

    async fn one_or_none(&self, stmt: &Statement) -> Result<Option<Record>> {
        let mut rows = self.run(stmt).await;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(Some(rows.remove(0))),
            count => Err(DbError::MultipleRows { count }),
        }
    }

    async fn many_or_none(&self, stmt: &Statement) -> Result<Vec<Record>> {
        Ok(self.run(stmt).await)
    }

    async fn none(&self, stmt: &Statement) -> Result<u64> {
        Ok(self.run(stmt).await.len() as u64)
    }

    async fn for_each_row(&self, stmt: &Statement, sink: &mut dyn RowSink) -> Result<u64> {
        let rows = self.run(stmt).await;
        let count = rows.len() as u64;
        for row in rows {
            sink.accept(row).await?;
        }
        Ok(count)
    }

    async fn begin(&self) -> Result<Arc<dyn TxConnection>> {
        self.event("begin");
        Ok(Arc::new(MockTransaction {
            conn: self.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

/// Transaction over a [`MockConnection`]; shares its log.
pub struct MockTransaction {
    conn: MockConnection,
    closed: AtomicBool,
}

impl MockTransaction {
    fn check(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DbError::TransactionClosed);
        }
        Ok(())
    }

    fn close(&self, event: &str) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(DbError::TransactionClosed);
        }
        self.conn.event(event);
        Ok(())
    }
}

#[async_trait]
impl Connection for MockTransaction {
    async fn one(&self, stmt: &Statement) -> Result<Record> {
        self.check()?;
        self.conn.one(stmt).await
    }

    async fn one_or_none(&self, stmt: &Statement) -> Result<Option<Record>> {
        self.check()?;
        self.conn.one_or_none(stmt).await
    }

    async fn many_or_none(&self, stmt: &Statement) -> Result<Vec<Record>> {
        self.check()?;
        self.conn.many_or_none(stmt).await
    }

    async fn none(&self, stmt: &Statement) -> Result<u64> {
        self.check()?;
        self.conn.none(stmt).await
    }

    async fn for_each_row(&self, stmt: &Statement, sink: &mut dyn RowSink) -> Result<u64> {
        self.check()?;
        self.conn.for_each_row(stmt, sink).await
    }

    async fn begin(&self) -> Result<Arc<dyn TxConnection>> {
        self.check()?;
        self.conn.event("savepoint");
        Ok(Arc::new(MockTransaction {
            conn: self.conn.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

#[async_trait]
impl TxConnection for MockTransaction {
    async fn commit(&self) -> Result<()> {
        self.close("commit")
    }

    async fn rollback(&self) -> Result<()> {
        self.close("rollback")
    }

    fn into_connection(self: Arc<Self>) -> Arc<dyn Connection> {
        self
    }
}

/// Build a [`Record`] from a `json!` object literal.
pub fn record(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

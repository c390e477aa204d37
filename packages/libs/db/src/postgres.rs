//! PostgreSQL connection over sqlx
//!
//! [`PgPoolConnection`] executes against a pool; [`PgTransaction`] holds one
//! pooled connection inside `BEGIN`. Opening a transaction on a transaction
//! opens a savepoint scope on the same connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use futures::stream::BoxStream;
use futures::TryStreamExt;
use serde_json::Value as Json;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use rust_decimal::Decimal;
use sqlx::postgres::types::PgInterval;
use sqlx::postgres::{
    PgArgumentBuffer, PgArguments, PgColumn, PgPool, PgRow, PgTypeInfo, PgTypeKind,
};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row, TypeInfo};
use tokio::sync::{Mutex, MutexGuard};

use tk_core::{Value, INFINITY_TOKEN};
use tk_sql::Statement;

use crate::connection::{Connection, Record, RowSink, TxConnection};
use crate::error::{DbError, Result};

/// Microseconds between the Unix epoch and the PostgreSQL epoch (2000-01-01).
const PG_EPOCH_OFFSET_MICROS: i64 = 946_684_800_000_000;

/// Pool-backed connection. Concurrent calls run on separate pooled connections.
#[derive(Clone)]
pub struct PgPoolConnection {
    pool: PgPool,
}

impl PgPoolConnection {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Connection for PgPoolConnection {
    async fn one(&self, stmt: &Statement) -> Result<Record> {
        trace_statement(stmt);
        let rows = bind_values(stmt).fetch_all(&self.pool).await?;
        exactly_one(into_records(rows)?)
    }

    async fn one_or_none(&self, stmt: &Statement) -> Result<Option<Record>> {
        trace_statement(stmt);
        let rows = bind_values(stmt).fetch_all(&self.pool).await?;
        at_most_one(into_records(rows)?)
    }

    async fn many_or_none(&self, stmt: &Statement) -> Result<Vec<Record>> {
        trace_statement(stmt);
        let rows = bind_values(stmt).fetch_all(&self.pool).await?;
        into_records(rows)
    }

    async fn none(&self, stmt: &Statement) -> Result<u64> {
        trace_statement(stmt);
        let result = bind_values(stmt).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn for_each_row(&self, stmt: &Statement, sink: &mut dyn RowSink) -> Result<u64> {
        trace_statement(stmt);
        drain(bind_values(stmt).fetch(&self.pool), sink).await
    }

    async fn begin(&self) -> Result<Arc<dyn TxConnection>> {
        let tx = self.pool.begin().await?;
        tracing::debug!("transaction started");
        Ok(Arc::new(PgTransaction {
            inner: Arc::new(Mutex::new(Some(tx))),
            savepoint: None,
            depth: 0,
            closed: AtomicBool::new(false),
        }))
    }
}

type SharedTx = Arc<Mutex<Option<sqlx::Transaction<'static, Postgres>>>>;

/// Transaction-bound connection.
///
/// Statements are serialized on the single underlying connection.
pub struct PgTransaction {
    inner: SharedTx,
    savepoint: Option<String>,
    depth: usize,
    closed: AtomicBool,
}

impl PgTransaction {
    async fn lock(&self) -> Result<MutexGuard<'_, Option<sqlx::Transaction<'static, Postgres>>>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DbError::TransactionClosed);
        }
        let guard = self.inner.lock().await;
        if guard.is_none() {
            return Err(DbError::TransactionClosed);
        }
        Ok(guard)
    }

    /// Run a control statement (savepoint handling) on the shared connection.
    async fn control(&self, sql: &str) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let tx = guard.as_mut().ok_or(DbError::TransactionClosed)?;
        sqlx::query::<Postgres>(sql).execute(&mut **tx).await?;
        Ok(())
    }

    fn mark_closed(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(DbError::TransactionClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for PgTransaction {
    async fn one(&self, stmt: &Statement) -> Result<Record> {
        trace_statement(stmt);
        let mut guard = self.lock().await?;
        let tx = guard.as_mut().ok_or(DbError::TransactionClosed)?;
        let rows = bind_values(stmt).fetch_all(&mut **tx).await?;
        exactly_one(into_records(rows)?)
    }

    async fn one_or_none(&self, stmt: &Statement) -> Result<Option<Record>> {
        trace_statement(stmt);
        let mut guard = self.lock().await?;
        let tx = guard.as_mut().ok_or(DbError::TransactionClosed)?;
        let rows = bind_values(stmt).fetch_all(&mut **tx).await?;
        at_most_one(into_records(rows)?)
    }

    async fn many_or_none(&self, stmt: &Statement) -> Result<Vec<Record>> {
        trace_statement(stmt);
        let mut guard = self.lock().await?;
        let tx = guard.as_mut().ok_or(DbError::TransactionClosed)?;
        let rows = bind_values(stmt).fetch_all(&mut **tx).await?;
        into_records(rows)
    }

    async fn none(&self, stmt: &Statement) -> Result<u64> {
        trace_statement(stmt);
        let mut guard = self.lock().await?;
        let tx = guard.as_mut().ok_or(DbError::TransactionClosed)?;
        let result = bind_values(stmt).execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }

    async fn for_each_row(&self, stmt: &Statement, sink: &mut dyn RowSink) -> Result<u64> {
        trace_statement(stmt);
        let mut guard = self.lock().await?;
        let tx = guard.as_mut().ok_or(DbError::TransactionClosed)?;
        drain(bind_values(stmt).fetch(&mut **tx), sink).await
    }

    async fn begin(&self) -> Result<Arc<dyn TxConnection>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DbError::TransactionClosed);
        }
        let depth = self.depth + 1;
        let name = format!("tk_savepoint_{}", depth);
        self.control(&format!("savepoint {}", name)).await?;
        tracing::debug!(savepoint = %name, "savepoint started");

        Ok(Arc::new(PgTransaction {
            inner: self.inner.clone(),
            savepoint: Some(name),
            depth,
            closed: AtomicBool::new(false),
        }))
    }
}

#[async_trait]
impl TxConnection for PgTransaction {
    async fn commit(&self) -> Result<()> {
        self.mark_closed()?;
        match &self.savepoint {
            Some(name) => {
                self.control(&format!("release savepoint {}", name)).await?;
                tracing::debug!(savepoint = %name, "savepoint released");
            }
            None => {
                let tx = self
                    .inner
                    .lock()
                    .await
                    .take()
                    .ok_or(DbError::TransactionClosed)?;
                tx.commit().await?;
                tracing::debug!("transaction committed");
            }
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.mark_closed()?;
        match &self.savepoint {
            Some(name) => {
                self.control(&format!("rollback to savepoint {}", name)).await?;
                tracing::debug!(savepoint = %name, "rolled back to savepoint");
            }
            None => {
                let tx = self
                    .inner
                    .lock()
                    .await
                    .take()
                    .ok_or(DbError::TransactionClosed)?;
                tx.rollback().await?;
                tracing::debug!("transaction rolled back");
            }
        }
        Ok(())
    }

    fn into_connection(self: Arc<Self>) -> Arc<dyn Connection> {
        self
    }
}

fn trace_statement(stmt: &Statement) {
    tracing::debug!(sql = %stmt.sql, params = stmt.params.len(), "executing statement");
}

fn into_records(rows: Vec<PgRow>) -> Result<Vec<Record>> {
    rows.iter().map(row_to_json).collect()
}

async fn drain(
    mut rows: BoxStream<'_, std::result::Result<PgRow, sqlx::Error>>,
    sink: &mut dyn RowSink,
) -> Result<u64> {
    let mut count = 0u64;
    while let Some(row) = rows.try_next().await? {
        sink.accept(row_to_json(&row)?).await?;
        count += 1;
    }
    Ok(count)
}

fn exactly_one(mut rows: Vec<Record>) -> Result<Record> {
    match rows.len() {
        0 => Err(DbError::Database(sqlx::Error::RowNotFound)),
        1 => Ok(rows.remove(0)),
        count => Err(DbError::MultipleRows { count }),
    }
}

fn at_most_one(mut rows: Vec<Record>) -> Result<Option<Record>> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(Some(rows.remove(0))),
        count => Err(DbError::MultipleRows { count }),
    }
}

/// NULL sent with an unspecified parameter type, so PostgreSQL infers it from
/// the surrounding column instead of insisting on `text`.
struct UntypedNull;

impl sqlx::Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("unknown")
    }
}

impl<'q> sqlx::Encode<'q, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> std::result::Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

/// `infinity` as a binary timestamptz (i64::MAX microseconds).
struct InfinityTimestamp;

impl sqlx::Type<Postgres> for InfinityTimestamp {
    fn type_info() -> PgTypeInfo {
        <DateTime<Utc> as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'q> sqlx::Encode<'q, Postgres> for InfinityTimestamp {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> std::result::Result<IsNull, BoxDynError> {
        <i64 as sqlx::Encode<'q, Postgres>>::encode_by_ref(&i64::MAX, buf)
    }
}

fn bind_values(stmt: &Statement) -> Query<'_, Postgres, PgArguments> {
    let mut query = sqlx::query::<Postgres>(&stmt.sql);
    for value in &stmt.params {
        query = match value {
            Value::Null => query.bind(UntypedNull),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Decimal(d) => query.bind(*d),
            Value::Text(s) => query.bind(s.clone()),
            Value::Uuid(id) => query.bind(*id),
            Value::Timestamp(ts) => query.bind(*ts),
            Value::Infinity => query.bind(InfinityTimestamp),
            Value::Json(v) => query.bind(sqlx::types::Json(v.clone())),
        };
    }
    query
}

fn row_to_json(row: &PgRow) -> Result<Record> {
    let mut obj = Record::new();
    for column in row.columns() {
        let value = decode_column(row, column)?.unwrap_or(Json::Null);
        obj.insert(column.name().to_string(), value);
    }
    Ok(obj)
}

/// Decode one column to JSON. `Ok(None)` is SQL NULL; a type without a
/// mapping is an error rather than a silent null.
fn decode_column(row: &PgRow, column: &PgColumn) -> Result<Option<Json>> {
    let idx = column.ordinal();
    let type_info = column.type_info();
    let value = match type_info.name().to_ascii_uppercase().as_str() {
        "INT2" => row.try_get::<Option<i16>, _>(idx)?.map(Json::from),
        "INT4" => row.try_get::<Option<i32>, _>(idx)?.map(Json::from),
        "INT8" => row.try_get::<Option<i64>, _>(idx)?.map(Json::from),
        "FLOAT4" => row.try_get::<Option<f32>, _>(idx)?.map(|v| float_to_json(v as f64)),
        "FLOAT8" => row.try_get::<Option<f64>, _>(idx)?.map(float_to_json),
        "NUMERIC" => row.try_get::<Option<Decimal>, _>(idx)?.map(decimal_to_json),
        "BOOL" => row.try_get::<Option<bool>, _>(idx)?.map(Json::Bool),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" | "CITEXT" => {
            row.try_get::<Option<String>, _>(idx)?.map(Json::String)
        }
        "JSON" | "JSONB" => row.try_get::<Option<Json>, _>(idx)?,
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(idx)?
            .map(|v| Json::String(v.to_string())),
        // Timestamps are read as raw microseconds so that `infinity` survives.
        "TIMESTAMPTZ" => row
            .try_get_unchecked::<Option<i64>, _>(idx)?
            .and_then(|us| timestamp_to_json(us, true)),
        "TIMESTAMP" => row
            .try_get_unchecked::<Option<i64>, _>(idx)?
            .and_then(|us| timestamp_to_json(us, false)),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(idx)?
            .map(|v| Json::String(v.to_string())),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(idx)?
            .map(|v| Json::String(v.to_string())),
        "INTERVAL" => row.try_get::<Option<PgInterval>, _>(idx)?.map(interval_to_json),
        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(idx)?
            .map(|v| Json::String(bytea_to_hex(&v))),
        "INT2[]" => row.try_get::<Option<Vec<i16>>, _>(idx)?.map(Json::from),
        "INT4[]" => row.try_get::<Option<Vec<i32>>, _>(idx)?.map(Json::from),
        "INT8[]" => row.try_get::<Option<Vec<i64>>, _>(idx)?.map(Json::from),
        "FLOAT8[]" => row
            .try_get::<Option<Vec<f64>>, _>(idx)?
            .map(|v| Json::Array(v.into_iter().map(float_to_json).collect())),
        "BOOL[]" => row.try_get::<Option<Vec<bool>>, _>(idx)?.map(Json::from),
        "TEXT[]" | "VARCHAR[]" => row.try_get::<Option<Vec<String>>, _>(idx)?.map(Json::from),
        "UUID[]" => row
            .try_get::<Option<Vec<uuid::Uuid>>, _>(idx)?
            .map(|v| Json::Array(v.iter().map(|id| Json::String(id.to_string())).collect())),
        // Enum labels travel as their text.
        _ if matches!(type_info.kind(), PgTypeKind::Enum(_)) => row
            .try_get_unchecked::<Option<String>, _>(idx)?
            .map(Json::String),
        other => {
            return Err(DbError::UnsupportedType {
                column: column.name().to_string(),
                type_name: other.to_string(),
            })
        }
    };
    Ok(value)
}

fn float_to_json(v: f64) -> Json {
    serde_json::Number::from_f64(v)
        .map(Json::Number)
        .unwrap_or_else(|| Json::String(v.to_string()))
}

/// A JSON number when that is exact, otherwise the decimal text.
fn decimal_to_json(d: Decimal) -> Json {
    let text = d.normalize().to_string();
    if let Ok(i) = text.parse::<i64>() {
        return Json::from(i);
    }
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() && f.to_string() == text => float_to_json(f),
        _ => Json::String(text),
    }
}

/// ISO 8601 duration, e.g. `P1M2DT3.5S`
fn interval_to_json(interval: PgInterval) -> Json {
    let mut text = format!("P{}M{}D", interval.months, interval.days);
    if interval.microseconds != 0 {
        let secs = interval.microseconds as f64 / 1_000_000.0;
        text.push_str(&format!("T{}S", secs));
    }
    Json::String(text)
}

/// PostgreSQL hex format, `\x0a1b`
fn bytea_to_hex(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(2 + bytes.len() * 2);
    text.push_str("\\x");
    for b in bytes {
        text.push_str(&format!("{:02x}", b));
    }
    text
}

fn timestamp_to_json(micros: i64, with_zone: bool) -> Option<Json> {
    match micros {
        i64::MAX => Some(Json::String(INFINITY_TOKEN.to_string())),
        i64::MIN => Some(Json::String(format!("-{}", INFINITY_TOKEN))),
        _ => {
            let unix = micros.checked_add(PG_EPOCH_OFFSET_MICROS)?;
            let ts = DateTime::<Utc>::from_timestamp(
                unix.div_euclid(1_000_000),
                (unix.rem_euclid(1_000_000) * 1_000) as u32,
            )?;
            let text = if with_zone {
                ts.to_rfc3339()
            } else {
                ts.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string()
            };
            Some(Json::String(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timestamp_infinity_markers() {
        assert_eq!(
            timestamp_to_json(i64::MAX, true),
            Some(Json::String("infinity".to_string()))
        );
        assert_eq!(
            timestamp_to_json(i64::MIN, false),
            Some(Json::String("-infinity".to_string()))
        );
    }

    #[test]
    fn test_timestamp_epoch_conversion() {
        // 2000-01-01T00:00:00 is zero in PostgreSQL's epoch
        assert_eq!(
            timestamp_to_json(0, true),
            Some(Json::String("2000-01-01T00:00:00+00:00".to_string()))
        );
        assert_eq!(
            timestamp_to_json(1_500_000, false),
            Some(Json::String("2000-01-01T00:00:01.500".to_string()))
        );
    }

    #[test]
    fn test_decimal_rendering() {
        assert_eq!(decimal_to_json(Decimal::new(1250, 2)), json!(12.5));
        assert_eq!(decimal_to_json(Decimal::new(4200, 2)), json!(42));
        // beyond f64 precision the exact text is kept
        let precise: Decimal = "12345678901234567890.123456789".parse().unwrap();
        assert_eq!(
            decimal_to_json(precise),
            json!("12345678901234567890.123456789")
        );
    }

    #[test]
    fn test_interval_and_bytea_rendering() {
        let interval = PgInterval {
            months: 1,
            days: 2,
            microseconds: 3_500_000,
        };
        assert_eq!(interval_to_json(interval), json!("P1M2DT3.5S"));
        assert_eq!(bytea_to_hex(&[0x0a, 0x1b]), "\\x0a1b");
    }

    #[test]
    fn test_row_count_contracts() {
        assert!(matches!(
            exactly_one(vec![]),
            Err(DbError::Database(sqlx::Error::RowNotFound))
        ));
        assert!(matches!(
            exactly_one(vec![Record::new(), Record::new()]),
            Err(DbError::MultipleRows { count: 2 })
        ));
        assert!(at_most_one(vec![]).unwrap().is_none());
        assert!(at_most_one(vec![Record::new()]).unwrap().is_some());
    }
}

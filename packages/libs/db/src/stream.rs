//! Streaming JSON export
//!
//! Rows are pulled from a server-side cursor and written one at a time, so
//! memory stays bounded to a single row whatever the result size. A slow
//! writer slows the cursor down with it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use tk_core::Value;
use tk_sql::Statement;

use crate::connection::{Connection, Record, RowSink};
use crate::error::Result;

/// Output layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonFormat {
    /// One JSON array: `[{...},{...}]`
    #[default]
    Array,
    /// Newline-delimited JSON, one object per line
    Lines,
}

/// [`RowSink`] that serializes each row into a writer.
pub struct JsonSink<W> {
    out: W,
    format: JsonFormat,
    written: u64,
}

impl<W> JsonSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(out: W, format: JsonFormat) -> Self {
        Self {
            out,
            format,
            written: 0,
        }
    }

    async fn open(&mut self) -> Result<()> {
        if self.format == JsonFormat::Array {
            self.out.write_all(b"[").await?;
        }
        Ok(())
    }

    /// Close the document and flush. Returns the writer.
    pub async fn finish(mut self) -> Result<W> {
        if self.format == JsonFormat::Array {
            self.out.write_all(b"]\n").await?;
        }
        self.out.flush().await?;
        Ok(self.out)
    }
}

#[async_trait]
impl<W> RowSink for JsonSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn accept(&mut self, row: Record) -> Result<()> {
        let mut bytes = serde_json::to_vec(&row)?;
        match self.format {
            JsonFormat::Array if self.written > 0 => self.out.write_all(b",").await?,
            JsonFormat::Array => {}
            JsonFormat::Lines => bytes.push(b'\n'),
        }
        self.out.write_all(&bytes).await?;
        self.written += 1;
        Ok(())
    }
}

/// Run `sql` with `params` and stream every row into `out` as JSON.
///
/// Returns the number of rows written. An empty result is still a valid
/// document (`[]` for [`JsonFormat::Array`], nothing for lines).
pub async fn stream_json<W>(
    conn: &dyn Connection,
    sql: &str,
    params: Vec<Value>,
    out: W,
    format: JsonFormat,
) -> Result<u64>
where
    W: AsyncWrite + Unpin + Send,
{
    let stmt = Statement::new(sql, params);
    let mut sink = JsonSink::new(out, format);
    sink.open().await?;
    let rows = conn.for_each_row(&stmt, &mut sink).await?;
    sink.finish().await?;

    tracing::info!(rows, ?format, "json export finished");
    Ok(rows)
}

//! Bulk copy into PostgreSQL via `COPY ... FROM STDIN`.
//!
//! The transport side of the adapter: drives any [`RowSource`] forward one
//! row at a time, encodes each row into COPY text format, and streams the
//! result to the destination table. The COPY statement lists the source
//! columns explicitly, so rows land in the right destination columns by
//! name regardless of destination column order.

use std::time::Duration;

use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};

use rowfeed_core::{Record, RowCursor, RowSource};

use crate::encode;

/// Flush the encode buffer to the server once it reaches this size.
const SEND_THRESHOLD: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Bulk copy configuration. None of these affect how rows are produced;
/// they pass through to the transport untouched.
#[derive(Debug, Clone)]
pub struct BulkCopyOptions {
    /// Destination table. Defaults to the record type's table name.
    pub destination_table: Option<String>,
    /// Rows per COPY statement. `0` loads everything in a single batch.
    pub batch_size: usize,
    /// Overall operation timeout. `Duration::ZERO` waits indefinitely.
    pub timeout: Duration,
    /// Issue `COPY ... WITH (FREEZE true)`; requires the table to have been
    /// created or truncated in the current transaction.
    pub freeze: bool,
}

impl Default for BulkCopyOptions {
    fn default() -> Self {
        Self {
            destination_table: None,
            batch_size: 0,
            timeout: Duration::from_secs(30),
            freeze: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Bulk copy a record sequence into Postgres.
///
/// Builds a [`RowCursor`] over `records`, acquires a connection from the
/// pool, and streams every row to the destination table (defaulting to
/// [`Record::TABLE`]). Returns the number of rows processed.
pub async fn bulk_copy<T, I>(
    pool: &PgPool,
    records: I,
    options: &BulkCopyOptions,
) -> anyhow::Result<i64>
where
    T: Record,
    I: IntoIterator<Item = T>,
    I::IntoIter: Send + 'static,
{
    let table = options
        .destination_table
        .clone()
        .unwrap_or_else(|| T::TABLE.to_string());
    let mut conn = pool.acquire().await.context("acquiring connection")?;
    let mut cursor = RowCursor::new(records);
    bulk_copy_rows(&mut conn, &mut cursor, &table, options).await
}

/// Bulk copy from any row source on an existing connection.
///
/// Works inside a caller-supplied transaction: a `Transaction` dereferences
/// to `PgConnection`, so pass `&mut *tx`. The source is released on every
/// exit path; on failure no retry is attempted here.
pub async fn bulk_copy_rows<R: RowSource>(
    conn: &mut PgConnection,
    source: &mut R,
    table: &str,
    options: &BulkCopyOptions,
) -> anyhow::Result<i64> {
    let result = if options.timeout.is_zero() {
        run_copy(conn, source, table, options).await
    } else {
        match tokio::time::timeout(options.timeout, run_copy(conn, source, table, options)).await {
            Ok(inner) => inner,
            Err(_) => Err(anyhow::anyhow!(
                "bulk copy into '{}' timed out after {:?}",
                table,
                options.timeout
            )),
        }
    };
    source.release();
    result
}

async fn run_copy<R: RowSource>(
    conn: &mut PgConnection,
    source: &mut R,
    table: &str,
    options: &BulkCopyOptions,
) -> anyhow::Result<i64> {
    anyhow::ensure!(
        !source.schema().is_empty(),
        "record type projects no columns; nothing to copy into '{}'",
        table
    );

    let statement = copy_statement(table, source, options.freeze);
    info!(
        "Bulk copy into '{}': {} columns, batch_size={}",
        table,
        source.column_count(),
        options.batch_size
    );

    let mut buf = String::with_capacity(SEND_THRESHOLD);
    let mut batches = 0u64;
    let mut exhausted = false;

    while !exhausted {
        // Pull the batch's first row before opening a COPY so an exhausted
        // source never starts an empty one.
        if !source.advance()? {
            break;
        }

        let mut copy = conn
            .copy_in_raw(&statement)
            .await
            .with_context(|| format!("starting COPY into '{}'", table))?;
        let mut in_batch = 0usize;

        loop {
            encode::encode_row(&mut buf, source);
            in_batch += 1;
            if buf.len() >= SEND_THRESHOLD {
                copy.send(buf.as_bytes()).await?;
                buf.clear();
            }
            if options.batch_size > 0 && in_batch == options.batch_size {
                break;
            }
            match source.advance() {
                Ok(true) => {}
                Ok(false) => {
                    exhausted = true;
                    break;
                }
                Err(err) => {
                    // Tell the server the COPY is dead before surfacing the
                    // source failure.
                    let _ = copy.abort("record source failed").await;
                    return Err(err);
                }
            }
        }

        if !buf.is_empty() {
            copy.send(buf.as_bytes()).await?;
            buf.clear();
        }
        copy.finish()
            .await
            .with_context(|| format!("finishing COPY into '{}'", table))?;
        batches += 1;
        debug!("Batch {} complete ({} rows)", batches, in_batch);
    }

    let rows = source.rows_processed();
    info!("Bulk copy into '{}' done: {} rows in {} batches", table, rows, batches);
    Ok(rows)
}

/// Builds the COPY statement with an explicit column list in schema order.
fn copy_statement<R: RowSource + ?Sized>(table: &str, source: &R, freeze: bool) -> String {
    let columns = source
        .schema()
        .columns()
        .iter()
        .map(|c| format!("\"{}\"", c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let mut statement = format!("COPY \"{}\" ({}) FROM STDIN WITH (FORMAT text", table, columns);
    if freeze {
        statement.push_str(", FREEZE true");
    }
    statement.push(')');
    statement
}

// ===========================================================================
// Tests
// ===========================================================================

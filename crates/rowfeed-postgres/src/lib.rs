//! rowfeed-postgres — PostgreSQL bulk-load transport.
//!
//! Consumes any [`rowfeed_core::RowSource`] and writes its rows to a
//! destination table with `COPY ... FROM STDIN (FORMAT text)`, mapping
//! source columns to destination columns by name.

pub mod copy;
mod encode;

pub use copy::{bulk_copy, bulk_copy_rows, BulkCopyOptions};

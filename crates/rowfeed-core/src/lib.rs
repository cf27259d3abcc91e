//! rowfeed core — streaming record-to-row adapter.
//!
//! Adapts an in-memory sequence of typed records into a row-oriented source
//! a bulk-loading transport can pull from lazily, one row at a time:
//!
//! - [`schema`]: per-type column schema derivation (cached for the process
//!   lifetime) and the record-to-row projector.
//! - [`cursor`]: the forward-only [`RowCursor`] and the [`RowSource`]
//!   capability set transports consume.
//! - [`types`]: storage [`TypeTag`]s and the tagged [`Value`] union with its
//!   typed accessors.
//!
//! This crate does no I/O, no logging, and no retries; transports own those.

pub mod cursor;
pub mod error;
pub mod schema;
pub mod types;

pub use cursor::{RowCursor, RowSource};
pub use error::AccessError;
pub use schema::{project, schema_of, ColumnDescriptor, ColumnSchema, FieldDef, Record};
pub use types::{Column, Decimal, TypeTag, Value};

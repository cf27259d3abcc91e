//! Forward-only, pull-based row cursor over a record sequence.
//!
//! [`RowCursor`] presents a sequence of records as a single-pass row source:
//! each `advance` pulls exactly one record and projects it into the current
//! row buffer, which the consumer must fully read before the next advance —
//! no history is retained and no read-ahead happens, so memory use is one
//! row regardless of sequence length. The [`RowSource`] trait is the seam a
//! bulk-load transport consumes; its typed reads and partial reads are
//! provided methods over `value()`.
//!
//! The cursor is driven by exactly one logical consumer; concurrent
//! advance/read calls are not a supported mode. Failures surface
//! synchronously and are never retried here — retry policy belongs to the
//! caller.

use crate::error::AccessError;
use crate::schema::{self, ColumnSchema, Record};
use crate::types::{Decimal, TypeTag, Value};

// ---------------------------------------------------------------------------
// RowSource — the capability set a bulk-load transport pulls from
// ---------------------------------------------------------------------------

/// A positional row source: advance, typed column reads, schema
/// introspection, and a completion count.
///
/// Out-of-range column indexes and reads before the first successful advance
/// are contract violations and panic; argument errors in the partial reads
/// and type mismatches in the typed reads return [`AccessError`].
pub trait RowSource {
    /// Pulls the next record and replaces the current row with its
    /// projection. Returns `Ok(false)` once the sequence is exhausted
    /// (further calls are no-ops returning `Ok(false)`). A failure of the
    /// underlying sequence propagates unchanged; the source stays safe to
    /// release. The underlying sequence is polled at most once per call.
    ///
    /// # Panics
    ///
    /// Panics if called after [`release`](RowSource::release).
    fn advance(&mut self) -> anyhow::Result<bool>;

    /// The full ordered column list, usable to build an explicit
    /// source-column to destination-column mapping by name.
    fn schema(&self) -> &ColumnSchema;

    /// The value at `index` in the current row.
    ///
    /// # Panics
    ///
    /// Panics if no row is current (before the first successful advance) or
    /// if `index` is out of range.
    fn value(&self, index: usize) -> &Value;

    /// Rows advanced so far; the pass's result count once consumption ends.
    fn rows_processed(&self) -> i64;

    /// Releases the underlying sequence's iteration resource. Idempotent and
    /// safe in any state, including after a failed advance or before the
    /// first one.
    fn release(&mut self);

    fn column_count(&self) -> usize {
        self.schema().len()
    }

    fn column_name(&self, index: usize) -> &'static str {
        self.schema().column(index).name
    }

    fn column_type(&self, index: usize) -> TypeTag {
        self.schema().column(index).storage
    }

    /// Position of the named column, `None` if absent.
    fn column_index(&self, name: &str) -> Option<usize> {
        self.schema().index_of(name)
    }

    fn is_null(&self, index: usize) -> bool {
        self.value(index).is_null()
    }

    fn read_bool(&self, index: usize) -> Result<bool, AccessError> {
        self.value(index).as_bool()
    }

    fn read_i16(&self, index: usize) -> Result<i16, AccessError> {
        self.value(index).as_i16()
    }

    fn read_i32(&self, index: usize) -> Result<i32, AccessError> {
        self.value(index).as_i32()
    }

    fn read_i64(&self, index: usize) -> Result<i64, AccessError> {
        self.value(index).as_i64()
    }

    fn read_f32(&self, index: usize) -> Result<f32, AccessError> {
        self.value(index).as_f32()
    }

    fn read_f64(&self, index: usize) -> Result<f64, AccessError> {
        self.value(index).as_f64()
    }

    fn read_decimal(&self, index: usize) -> Result<Decimal, AccessError> {
        self.value(index).as_decimal()
    }

    fn read_str(&self, index: usize) -> Result<&str, AccessError> {
        self.value(index).as_str()
    }

    fn read_bytes(&self, index: usize) -> Result<&[u8], AccessError> {
        self.value(index).as_bytes()
    }

    fn read_datetime(&self, index: usize) -> Result<chrono::NaiveDateTime, AccessError> {
        self.value(index).as_datetime()
    }

    fn read_uuid(&self, index: usize) -> Result<uuid::Uuid, AccessError> {
        self.value(index).as_uuid()
    }

    /// Partial/chunked read of a binary column.
    ///
    /// With no destination buffer this is a capability probe returning the
    /// total byte length without copying. Otherwise copies
    /// `min(length, total_len - dest_offset)` bytes — clamped to what both
    /// slices can actually supply and hold — from `source_offset` in the
    /// stored bytes into `dest` at `dest_offset`, returning the count; a
    /// clamped count of zero copies nothing. A `dest_offset` at or beyond the
    /// destination capacity is an invalid-argument error.
    fn read_bytes_partial(
        &self,
        index: usize,
        source_offset: usize,
        dest: Option<&mut [u8]>,
        dest_offset: usize,
        length: usize,
    ) -> Result<usize, AccessError> {
        partial_copy(
            self.value(index).as_bytes()?,
            source_offset,
            dest,
            dest_offset,
            length,
        )
    }

    /// Partial/chunked read of a text column, by character. Same contract as
    /// [`read_bytes_partial`](RowSource::read_bytes_partial).
    fn read_chars_partial(
        &self,
        index: usize,
        source_offset: usize,
        dest: Option<&mut [char]>,
        dest_offset: usize,
        length: usize,
    ) -> Result<usize, AccessError> {
        let chars: Vec<char> = self.value(index).as_str()?.chars().collect();
        partial_copy(&chars, source_offset, dest, dest_offset, length)
    }
}

fn partial_copy<T: Copy>(
    src: &[T],
    source_offset: usize,
    dest: Option<&mut [T]>,
    dest_offset: usize,
    length: usize,
) -> Result<usize, AccessError> {
    let Some(dest) = dest else {
        // Capability probe: report total length, copy nothing.
        return Ok(src.len());
    };
    if dest_offset >= dest.len() {
        return Err(AccessError::InvalidArgument(format!(
            "destination offset {} is beyond the destination buffer capacity {}",
            dest_offset,
            dest.len()
        )));
    }
    let count = length
        .min(src.len().saturating_sub(dest_offset))
        .min(src.len().saturating_sub(source_offset))
        .min(dest.len() - dest_offset);
    if count == 0 {
        return Ok(0);
    }
    dest[dest_offset..dest_offset + count]
        .copy_from_slice(&src[source_offset..source_offset + count]);
    Ok(count)
}

// ---------------------------------------------------------------------------
// RowCursor
// ---------------------------------------------------------------------------

/// Single-pass row cursor over a sequence of records of one type.
///
/// State machine: created, then zero or more successful advances, then
/// exhausted; released is reachable from any state via [`RowSource::release`]
/// and is terminal. The current row buffer is overwritten in place on each
/// advance.
pub struct RowCursor<T: Record> {
    source: Option<Box<dyn Iterator<Item = anyhow::Result<T>> + Send>>,
    schema: &'static ColumnSchema,
    row: Vec<Value>,
    position: i64,
    exhausted: bool,
    released: bool,
}

impl<T: Record> RowCursor<T> {
    /// Cursor over an infallible record sequence.
    pub fn new<I>(records: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::from_fallible(records.into_iter().map(Ok))
    }

    /// Cursor over a sequence whose items can fail mid-iteration; an item
    /// error propagates unchanged out of `advance`.
    pub fn from_fallible<I>(records: I) -> Self
    where
        I: Iterator<Item = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            source: Some(Box::new(records)),
            schema: schema::schema_of::<T>(),
            row: Vec::new(),
            position: 0,
            exhausted: false,
            released: false,
        }
    }
}

impl<T: Record> RowSource for RowCursor<T> {
    fn advance(&mut self) -> anyhow::Result<bool> {
        assert!(!self.released, "advance called on a released cursor");
        if self.exhausted {
            return Ok(false);
        }
        let source = self.source.as_mut().expect("source held until release");
        match source.next() {
            None => {
                self.exhausted = true;
                Ok(false)
            }
            Some(Err(err)) => {
                // Stop iterating; the cursor stays releasable.
                self.exhausted = true;
                Err(err)
            }
            Some(Ok(record)) => {
                schema::project_into(&record, &mut self.row);
                self.position += 1;
                Ok(true)
            }
        }
    }

    fn schema(&self) -> &ColumnSchema {
        self.schema
    }

    fn value(&self, index: usize) -> &Value {
        &self.row[index]
    }

    fn rows_processed(&self) -> i64 {
        self.position
    }

    fn release(&mut self) {
        self.released = true;
        self.source = None;
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{column_enum, impl_record};
    use chrono::NaiveDateTime;

    struct Person {
        id: i64,
        name: String,
        age: i32,
        create_time: Option<NaiveDateTime>,
        sex: Gender,
    }

    #[derive(Clone, Copy)]
    enum Gender {
        Man = 0,
        Woman = 1,
    }

    column_enum!(Gender as i32);

    impl_record!(Person as "person" {
        id: i64,
        name: String,
        age: i32,
        create_time: Option<NaiveDateTime>,
        sex: Gender,
    });

    struct Blob {
        payload: Vec<u8>,
        label: String,
    }

    impl_record!(Blob {
        payload: Vec<u8>,
        label: String,
    });

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn people() -> Vec<Person> {
        vec![
            Person {
                id: 1,
                name: "A".to_string(),
                age: 30,
                create_time: None,
                sex: Gender::Man,
            },
            Person {
                id: 2,
                name: "B".to_string(),
                age: 40,
                create_time: Some(ts("2024-06-01 12:00:00")),
                sex: Gender::Woman,
            },
            Person {
                id: 3,
                name: "C".to_string(),
                age: 50,
                create_time: None,
                sex: Gender::Man,
            },
        ]
    }

    // -- full-pass scenario ----------------------------------------------------

    #[test]
    fn test_full_pass_projects_every_record() {
        let mut cursor = RowCursor::new(people());

        let described: Vec<(&str, TypeTag)> = cursor
            .schema()
            .columns()
            .iter()
            .map(|c| (c.name, c.storage))
            .collect();
        assert_eq!(
            described,
            vec![
                ("id", TypeTag::Int64),
                ("name", TypeTag::Text),
                ("age", TypeTag::Int32),
                ("create_time", TypeTag::DateTime),
                ("sex", TypeTag::Int32),
            ]
        );

        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.read_i64(0), Ok(1));
        assert_eq!(cursor.read_str(1), Ok("A"));
        assert_eq!(cursor.read_i32(2), Ok(30));
        assert!(cursor.is_null(3));
        assert_eq!(cursor.read_i32(4), Ok(0));

        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.read_i64(0), Ok(2));
        assert_eq!(cursor.read_str(1), Ok("B"));
        assert_eq!(cursor.read_i32(2), Ok(40));
        assert!(!cursor.is_null(3));
        assert_eq!(cursor.read_datetime(3), Ok(ts("2024-06-01 12:00:00")));
        assert_eq!(cursor.read_i32(4), Ok(1));

        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.read_i64(0), Ok(3));
        assert_eq!(cursor.read_i32(4), Ok(0));

        assert!(!cursor.advance().unwrap());
        assert_eq!(cursor.rows_processed(), 3);
    }

    #[test]
    fn test_empty_sequence_exhausts_immediately() {
        let mut cursor = RowCursor::new(Vec::<Person>::new());
        assert!(!cursor.advance().unwrap());
        assert_eq!(cursor.rows_processed(), 0);
    }

    #[test]
    fn test_advance_after_exhaustion_is_a_noop() {
        let mut cursor = RowCursor::new(vec![people().remove(0)]);
        assert!(cursor.advance().unwrap());
        assert!(!cursor.advance().unwrap());
        assert!(!cursor.advance().unwrap());
        assert_eq!(cursor.rows_processed(), 1);
    }

    #[test]
    fn test_row_overwritten_in_place() {
        let mut cursor = RowCursor::new(people());
        cursor.advance().unwrap();
        assert_eq!(cursor.read_i64(0), Ok(1));
        cursor.advance().unwrap();
        // Only the new row is visible; no history is kept.
        assert_eq!(cursor.read_i64(0), Ok(2));
        assert_eq!(cursor.column_count(), 5);
    }

    // -- schema introspection ----------------------------------------------------

    #[test]
    fn test_column_lookups() {
        let cursor = RowCursor::new(people());
        assert_eq!(cursor.column_count(), 5);
        assert_eq!(cursor.column_name(1), "name");
        assert_eq!(cursor.column_type(0), TypeTag::Int64);
        assert_eq!(cursor.column_index("create_time"), Some(3));
        assert_eq!(cursor.column_index("CREATE_TIME"), None);
        assert_eq!(cursor.column_index("no_such_column"), None);
    }

    #[test]
    fn test_schema_identical_across_cursors() {
        let a = RowCursor::new(people());
        let b = RowCursor::new(Vec::<Person>::new());
        assert!(std::ptr::eq(a.schema(), b.schema()));
    }

    // -- contract violations ----------------------------------------------------

    #[test]
    #[should_panic]
    fn test_read_before_first_advance_panics() {
        let cursor = RowCursor::new(people());
        let _ = cursor.value(0);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_index_panics() {
        let mut cursor = RowCursor::new(people());
        cursor.advance().unwrap();
        let _ = cursor.value(5);
    }

    #[test]
    #[should_panic(expected = "released")]
    fn test_advance_after_release_panics() {
        let mut cursor = RowCursor::new(people());
        cursor.release();
        let _ = cursor.advance();
    }

    #[test]
    fn test_typed_read_mismatch_is_an_error_not_a_panic() {
        let mut cursor = RowCursor::new(people());
        cursor.advance().unwrap();
        assert!(cursor.read_str(0).is_err());
        assert!(cursor.read_bool(1).is_err());
    }

    // -- release ------------------------------------------------------------------

    #[test]
    fn test_release_is_idempotent_and_safe_before_advance() {
        let mut cursor = RowCursor::new(people());
        cursor.release();
        cursor.release();
    }

    #[test]
    fn test_release_after_full_pass() {
        let mut cursor = RowCursor::new(people());
        while cursor.advance().unwrap() {}
        cursor.release();
        assert_eq!(cursor.rows_processed(), 3);
    }

    // -- underlying-sequence failure -----------------------------------------------

    #[test]
    fn test_source_failure_propagates_and_leaves_cursor_releasable() {
        let items: Vec<anyhow::Result<Person>> = vec![
            Ok(people().remove(0)),
            Err(anyhow::anyhow!("source broke mid-iteration")),
        ];
        let mut cursor = RowCursor::from_fallible(items.into_iter());
        assert!(cursor.advance().unwrap());
        let err = cursor.advance().unwrap_err();
        assert!(err.to_string().contains("source broke"));
        // After a failure the cursor no longer pulls from the source.
        assert!(!cursor.advance().unwrap());
        cursor.release();
    }

    // -- partial reads ------------------------------------------------------------

    fn blob_cursor() -> RowCursor<Blob> {
        let mut cursor = RowCursor::new(vec![Blob {
            payload: vec![10, 11, 12, 13, 14, 15],
            label: "héllo".to_string(),
        }]);
        cursor.advance().unwrap();
        cursor
    }

    #[test]
    fn test_bytes_probe_returns_total_length() {
        let cursor = blob_cursor();
        let mut untouched = [0u8; 4];
        assert_eq!(cursor.read_bytes_partial(0, 0, None, 0, 0), Ok(6));
        assert_eq!(untouched, [0u8; 4]);
        // Probe ignores offsets entirely.
        assert_eq!(cursor.read_bytes_partial(0, 99, None, 99, 99), Ok(6));
        let copied = cursor
            .read_bytes_partial(0, 0, Some(&mut untouched), 0, 4)
            .unwrap();
        assert_eq!(copied, 4);
        assert_eq!(untouched, [10, 11, 12, 13]);
    }

    #[test]
    fn test_bytes_copy_from_source_offset() {
        let cursor = blob_cursor();
        let mut dest = [0u8; 3];
        let copied = cursor
            .read_bytes_partial(0, 2, Some(&mut dest), 0, 3)
            .unwrap();
        assert_eq!(copied, 3);
        assert_eq!(dest, [12, 13, 14]);
    }

    #[test]
    fn test_bytes_copy_into_dest_offset() {
        let cursor = blob_cursor();
        let mut dest = [0u8; 5];
        let copied = cursor
            .read_bytes_partial(0, 0, Some(&mut dest), 2, 3)
            .unwrap();
        assert_eq!(copied, 3);
        assert_eq!(dest, [0, 0, 10, 11, 12]);
    }

    #[test]
    fn test_bytes_dest_offset_beyond_capacity_is_invalid_argument() {
        let cursor = blob_cursor();
        let mut dest = [0u8; 4];
        let err = cursor
            .read_bytes_partial(0, 0, Some(&mut dest), 4, 1)
            .unwrap_err();
        assert!(matches!(err, AccessError::InvalidArgument(_)));
        assert!(err.to_string().contains("destination offset"));
    }

    #[test]
    fn test_bytes_clamped_to_zero_copies_nothing() {
        let cursor = blob_cursor();
        let mut dest = [0u8; 8];
        // Source offset past the end of the stored bytes.
        assert_eq!(cursor.read_bytes_partial(0, 6, Some(&mut dest), 0, 4), Ok(0));
        // Zero requested length.
        assert_eq!(cursor.read_bytes_partial(0, 0, Some(&mut dest), 0, 0), Ok(0));
        assert_eq!(dest, [0u8; 8]);
    }

    #[test]
    fn test_bytes_length_clamped_to_remaining() {
        let cursor = blob_cursor();
        let mut dest = [0u8; 16];
        let copied = cursor
            .read_bytes_partial(0, 4, Some(&mut dest), 0, 100)
            .unwrap();
        assert_eq!(copied, 2);
        assert_eq!(&dest[..2], &[14, 15]);
    }

    #[test]
    fn test_bytes_partial_on_text_column_is_type_mismatch() {
        let cursor = blob_cursor();
        assert!(matches!(
            cursor.read_bytes_partial(1, 0, None, 0, 0),
            Err(AccessError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_chars_probe_counts_characters_not_bytes() {
        let cursor = blob_cursor();
        // "héllo" is 5 characters, 6 bytes.
        assert_eq!(cursor.read_chars_partial(1, 0, None, 0, 0), Ok(5));
    }

    #[test]
    fn test_chars_partial_copy() {
        let cursor = blob_cursor();
        let mut dest = ['\0'; 3];
        let copied = cursor
            .read_chars_partial(1, 1, Some(&mut dest), 0, 3)
            .unwrap();
        assert_eq!(copied, 3);
        assert_eq!(dest, ['é', 'l', 'l']);
    }

    #[test]
    fn test_chars_dest_offset_beyond_capacity_is_invalid_argument() {
        let cursor = blob_cursor();
        let mut dest = ['\0'; 2];
        assert!(cursor
            .read_chars_partial(1, 0, Some(&mut dest), 2, 1)
            .is_err());
    }
}

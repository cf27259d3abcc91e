//! COPY text-format encoding of projected row values.
//!
//! One row per line, fields separated by tabs, terminated by a newline.
//! Nulls are `\N`, backslash and the separator characters are escaped in
//! text fields, and binary fields use the bytea hex form with the leading
//! backslash doubled for the COPY stream.

use std::fmt::Write;

use rowfeed_core::{RowSource, Value};

/// Appends the source's current row to `buf` as one COPY text line.
pub(crate) fn encode_row<R: RowSource + ?Sized>(buf: &mut String, source: &R) {
    for index in 0..source.column_count() {
        if index > 0 {
            buf.push('\t');
        }
        encode_field(buf, source.value(index));
    }
    buf.push('\n');
}

pub(crate) fn encode_field(buf: &mut String, value: &Value) {
    match value {
        Value::Null => buf.push_str("\\N"),
        Value::Bool(true) => buf.push('t'),
        Value::Bool(false) => buf.push('f'),
        Value::Int16(v) => write!(buf, "{}", v).expect("write to String cannot fail"),
        Value::Int32(v) => write!(buf, "{}", v).expect("write to String cannot fail"),
        Value::Int64(v) => write!(buf, "{}", v).expect("write to String cannot fail"),
        Value::Float32(v) => {
            if v.is_nan() {
                buf.push_str("NaN");
            } else if v.is_infinite() {
                buf.push_str(if *v > 0.0 { "Infinity" } else { "-Infinity" });
            } else {
                write!(buf, "{}", v).expect("write to String cannot fail");
            }
        }
        Value::Float64(v) => {
            if v.is_nan() {
                buf.push_str("NaN");
            } else if v.is_infinite() {
                buf.push_str(if *v > 0.0 { "Infinity" } else { "-Infinity" });
            } else {
                write!(buf, "{}", v).expect("write to String cannot fail");
            }
        }
        Value::Decimal(v) => write!(buf, "{}", v).expect("write to String cannot fail"),
        Value::Text(v) => encode_text(buf, v),
        Value::Bytes(v) => {
            buf.push_str("\\\\x");
            for byte in v {
                write!(buf, "{:02x}", byte).expect("write to String cannot fail");
            }
        }
        Value::DateTime(v) => {
            write!(buf, "{}", v.format("%Y-%m-%d %H:%M:%S%.6f")).expect("write to String cannot fail")
        }
        Value::Uuid(v) => write!(buf, "{}", v.hyphenated()).expect("write to String cannot fail"),
    }
}

fn encode_text(buf: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '\\' => buf.push_str("\\\\"),
            '\t' => buf.push_str("\\t"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            other => buf.push(other),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

//! Storage type tags and the runtime row value representation.
//!
//! A projected row is a `Vec<Value>`. `Value` is a tagged union over the
//! supported storage kinds, so typed accessors are safe variant unwraps that
//! fail with [`AccessError::TypeMismatch`] instead of relying on unchecked
//! casts. The only value-level conversions in this crate happen at projection
//! time (enum to its underlying integral, `Option` to inner value or
//! [`Value::Null`]); the accessors here perform no further coercion.

use std::fmt;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::error::AccessError;

// ---------------------------------------------------------------------------
// TypeTag
// ---------------------------------------------------------------------------

/// Effective storage type of a column after enum/optional normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Bool,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    Text,
    Bytes,
    DateTime,
    Uuid,
}

impl TypeTag {
    /// Lowercase name used in error messages and logs.
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Bool => "bool",
            TypeTag::Int16 => "int16",
            TypeTag::Int32 => "int32",
            TypeTag::Int64 => "int64",
            TypeTag::Float32 => "float32",
            TypeTag::Float64 => "float64",
            TypeTag::Decimal => "decimal",
            TypeTag::Text => "text",
            TypeTag::Bytes => "bytes",
            TypeTag::DateTime => "datetime",
            TypeTag::Uuid => "uuid",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Decimal
// ---------------------------------------------------------------------------

/// Scaled-integer decimal: `digits * 10^(-scale)`.
///
/// Exact representation for fixed-point columns; arithmetic is out of scope,
/// the transport only needs `Display`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    digits: i128,
    scale: u8,
}

impl Decimal {
    pub const fn new(digits: i128, scale: u8) -> Self {
        Self { digits, scale }
    }

    pub fn digits(self) -> i128 {
        self.digits
    }

    pub fn scale(self) -> u8 {
        self.scale
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.digits);
        }
        let sign = if self.digits < 0 { "-" } else { "" };
        let abs = self.digits.unsigned_abs().to_string();
        let scale = self.scale as usize;
        if abs.len() > scale {
            let (int_part, frac_part) = abs.split_at(abs.len() - scale);
            write!(f, "{}{}.{}", sign, int_part, frac_part)
        } else {
            // All digits are fractional; pad with leading zeros.
            write!(f, "{}0.{}{}", sign, "0".repeat(scale - abs.len()), abs)
        }
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// One projected column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
    Uuid(Uuid),
}

impl Value {
    /// True if this value is the null/absent sentinel.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Lowercase name of the stored variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => TypeTag::Bool.name(),
            Value::Int16(_) => TypeTag::Int16.name(),
            Value::Int32(_) => TypeTag::Int32.name(),
            Value::Int64(_) => TypeTag::Int64.name(),
            Value::Float32(_) => TypeTag::Float32.name(),
            Value::Float64(_) => TypeTag::Float64.name(),
            Value::Decimal(_) => TypeTag::Decimal.name(),
            Value::Text(_) => TypeTag::Text.name(),
            Value::Bytes(_) => TypeTag::Bytes.name(),
            Value::DateTime(_) => TypeTag::DateTime.name(),
            Value::Uuid(_) => TypeTag::Uuid.name(),
        }
    }

    fn mismatch(&self, expected: TypeTag) -> AccessError {
        AccessError::TypeMismatch {
            expected,
            actual: self.kind(),
        }
    }

    pub fn as_bool(&self) -> Result<bool, AccessError> {
        match self {
            Value::Bool(v) => Ok(*v),
            other => Err(other.mismatch(TypeTag::Bool)),
        }
    }

    pub fn as_i16(&self) -> Result<i16, AccessError> {
        match self {
            Value::Int16(v) => Ok(*v),
            other => Err(other.mismatch(TypeTag::Int16)),
        }
    }

    pub fn as_i32(&self) -> Result<i32, AccessError> {
        match self {
            Value::Int32(v) => Ok(*v),
            other => Err(other.mismatch(TypeTag::Int32)),
        }
    }

    pub fn as_i64(&self) -> Result<i64, AccessError> {
        match self {
            Value::Int64(v) => Ok(*v),
            other => Err(other.mismatch(TypeTag::Int64)),
        }
    }

    pub fn as_f32(&self) -> Result<f32, AccessError> {
        match self {
            Value::Float32(v) => Ok(*v),
            other => Err(other.mismatch(TypeTag::Float32)),
        }
    }

    pub fn as_f64(&self) -> Result<f64, AccessError> {
        match self {
            Value::Float64(v) => Ok(*v),
            other => Err(other.mismatch(TypeTag::Float64)),
        }
    }

    pub fn as_decimal(&self) -> Result<Decimal, AccessError> {
        match self {
            Value::Decimal(v) => Ok(*v),
            other => Err(other.mismatch(TypeTag::Decimal)),
        }
    }

    pub fn as_str(&self) -> Result<&str, AccessError> {
        match self {
            Value::Text(v) => Ok(v),
            other => Err(other.mismatch(TypeTag::Text)),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8], AccessError> {
        match self {
            Value::Bytes(v) => Ok(v),
            other => Err(other.mismatch(TypeTag::Bytes)),
        }
    }

    pub fn as_datetime(&self) -> Result<NaiveDateTime, AccessError> {
        match self {
            Value::DateTime(v) => Ok(*v),
            other => Err(other.mismatch(TypeTag::DateTime)),
        }
    }

    pub fn as_uuid(&self) -> Result<Uuid, AccessError> {
        match self {
            Value::Uuid(v) => Ok(*v),
            other => Err(other.mismatch(TypeTag::Uuid)),
        }
    }
}

// ---------------------------------------------------------------------------
// Column — field type to storage kind mapping
// ---------------------------------------------------------------------------

/// A Rust type that can appear as a record field.
///
/// `TAG` is the field's effective storage type and `to_value` produces the
/// projected value. Optional fields normalize to their inner type:
/// `Option<C>` reuses `C::TAG` and projects `None` as [`Value::Null`].
/// Fieldless enums normalize to their underlying integral type via the
/// [`column_enum!`](crate::column_enum) macro.
pub trait Column {
    const TAG: TypeTag;

    fn to_value(&self) -> Value;
}

macro_rules! primitive_column {
    ($rust:ty, $tag:expr, $variant:ident) => {
        impl Column for $rust {
            const TAG: TypeTag = $tag;

            fn to_value(&self) -> Value {
                Value::$variant(*self)
            }
        }
    };
}

primitive_column!(bool, TypeTag::Bool, Bool);
primitive_column!(i16, TypeTag::Int16, Int16);
primitive_column!(i32, TypeTag::Int32, Int32);
primitive_column!(i64, TypeTag::Int64, Int64);
primitive_column!(f32, TypeTag::Float32, Float32);
primitive_column!(f64, TypeTag::Float64, Float64);
primitive_column!(Decimal, TypeTag::Decimal, Decimal);
primitive_column!(NaiveDateTime, TypeTag::DateTime, DateTime);
primitive_column!(Uuid, TypeTag::Uuid, Uuid);

impl Column for String {
    const TAG: TypeTag = TypeTag::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl Column for Vec<u8> {
    const TAG: TypeTag = TypeTag::Bytes;

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl<C: Column> Column for Option<C> {
    const TAG: TypeTag = C::TAG;

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

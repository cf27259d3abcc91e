//! Typed errors for column access.

use crate::types::TypeTag;

/// Errors raised when reading a column from the current row.
///
/// Contract violations (reading before any advance, out-of-range column
/// indexes, advancing a released cursor) are caller bugs and panic instead of
/// returning one of these variants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// The stored value does not match the type requested by a typed accessor.
    #[error("column holds {actual}, not {expected}")]
    TypeMismatch {
        expected: TypeTag,
        actual: &'static str,
    },
    /// A partial-read argument violated its constraint.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

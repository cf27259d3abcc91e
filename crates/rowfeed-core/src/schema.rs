//! Column schema derivation and the per-type projector.
//!
//! A record type describes its readable fields once, as a static
//! field-descriptor table ([`Record::fields`]); the [`impl_record!`] macro
//! generates that table from a field list. [`schema_of`] derives the ordered
//! [`ColumnSchema`] from the table on first use and caches it for the process
//! lifetime keyed by `TypeId`, so every cursor over the same record type
//! shares the identical schema. [`project`] applies the descriptor table in a
//! fixed loop — O(fields) per record with no per-row type lookup.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::types::{TypeTag, Value};

// ---------------------------------------------------------------------------
// Field descriptors
// ---------------------------------------------------------------------------

/// One readable field of a record type: column name, effective storage type,
/// and the accessor producing the projected value.
pub struct FieldDef<T> {
    /// Column name, equal to the field name verbatim.
    pub name: &'static str,
    /// Effective storage type after enum/optional normalization.
    pub storage: TypeTag,
    /// Projects the field's value out of a record. Must not mutate the record;
    /// enum and optional unwrapping happens here, at value level.
    pub get: fn(&T) -> Value,
}

/// A typed, in-memory record that can be projected into positional rows.
///
/// Implement via [`impl_record!`], or by hand for the degenerate zero-field
/// case (an empty descriptor table yields an empty schema, which is valid).
pub trait Record: Sized + 'static {
    /// Default destination table name for transports that want one.
    const TABLE: &'static str;

    /// The static field-descriptor table, in declaration order.
    fn fields() -> &'static [FieldDef<Self>];
}

// ---------------------------------------------------------------------------
// Column schema
// ---------------------------------------------------------------------------

/// Name and effective storage type of one column. Position in the owning
/// [`ColumnSchema`] equals the row-buffer index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: &'static str,
    pub storage: TypeTag,
}

/// Ordered, immutable column list for a record type.
///
/// Created once per type by [`schema_of`] and shared read-only by every
/// cursor over that type; safe to read concurrently.
#[derive(Debug, PartialEq, Eq)]
pub struct ColumnSchema {
    columns: Vec<ColumnDescriptor>,
}

impl ColumnSchema {
    fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Positional lookup.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range — an out-of-range column index is a
    /// caller contract violation.
    pub fn column(&self, index: usize) -> &ColumnDescriptor {
        &self.columns[index]
    }

    /// Position of the column with exactly this name (case-sensitive), or
    /// `None` — callers routinely probe for optional columns, so a missing
    /// name is not an error.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }
}

// ---------------------------------------------------------------------------
// Process-wide schema cache
// ---------------------------------------------------------------------------

static SCHEMAS: OnceLock<RwLock<HashMap<TypeId, &'static ColumnSchema>>> = OnceLock::new();

/// The column schema for `T`, derived on first use and cached for the process
/// lifetime. Every call — from any cursor, on any thread — returns the same
/// `&'static` reference. Pure derived data, never mutated, no teardown.
pub fn schema_of<T: Record>() -> &'static ColumnSchema {
    let cache = SCHEMAS.get_or_init(|| RwLock::new(HashMap::new()));

    if let Some(schema) = cache
        .read()
        .expect("schema cache poisoned")
        .get(&TypeId::of::<T>())
        .copied()
    {
        return schema;
    }

    let mut cache = cache.write().expect("schema cache poisoned");
    *cache.entry(TypeId::of::<T>()).or_insert_with(|| {
        let columns = T::fields()
            .iter()
            .map(|field| ColumnDescriptor {
                name: field.name,
                storage: field.storage,
            })
            .collect();
        Box::leak(Box::new(ColumnSchema::new(columns)))
    })
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Projects one record into a positional row buffer, index i holding the
/// value of the i-th field. Side-effect-free.
pub fn project<T: Record>(record: &T) -> Vec<Value> {
    T::fields().iter().map(|field| (field.get)(record)).collect()
}

/// In-place variant used by the cursor to reuse its row allocation.
pub(crate) fn project_into<T: Record>(record: &T, row: &mut Vec<Value>) {
    row.clear();
    row.extend(T::fields().iter().map(|field| (field.get)(record)));
}

// ---------------------------------------------------------------------------
// Macros
// ---------------------------------------------------------------------------

/// Implements [`Record`] for a struct from an explicit field list.
///
/// Field types must implement [`Column`](crate::Column); `Option<C>` fields
/// normalize to `C`'s storage type and project absent values as null. The
/// destination table name defaults to the type name; override with
/// `as "table_name"`.
///
/// ```
/// use rowfeed_core::impl_record;
///
/// struct Invoice {
///     id: i64,
///     total: f64,
/// }
///
/// impl_record!(Invoice as "invoices" {
///     id: i64,
///     total: f64,
/// });
/// ```
#[macro_export]
macro_rules! impl_record {
    ($ty:ident { $($field:ident : $ftype:ty),* $(,)? }) => {
        $crate::impl_record!(@impl $ty, stringify!($ty), $($field : $ftype),*);
    };
    ($ty:ident as $table:literal { $($field:ident : $ftype:ty),* $(,)? }) => {
        $crate::impl_record!(@impl $ty, $table, $($field : $ftype),*);
    };
    (@impl $ty:ident, $table:expr, $($field:ident : $ftype:ty),*) => {
        impl $crate::Record for $ty {
            const TABLE: &'static str = $table;

            fn fields() -> &'static [$crate::FieldDef<Self>] {
                static FIELDS: ::std::sync::OnceLock<Vec<$crate::FieldDef<$ty>>> =
                    ::std::sync::OnceLock::new();
                FIELDS
                    .get_or_init(|| {
                        vec![
                            $(
                                $crate::FieldDef {
                                    name: stringify!($field),
                                    storage: <$ftype as $crate::Column>::TAG,
                                    get: |record: &$ty| {
                                        $crate::Column::to_value(&record.$field)
                                    },
                                },
                            )*
                        ]
                    })
                    .as_slice()
            }
        }
    };
}

/// Implements [`Column`](crate::Column) for a fieldless `Copy` enum,
/// normalizing it to its underlying integral representation.
///
/// ```
/// use rowfeed_core::column_enum;
///
/// #[derive(Clone, Copy)]
/// enum Gender {
///     Man = 0,
///     Woman = 1,
/// }
///
/// column_enum!(Gender as i32);
/// ```
#[macro_export]
macro_rules! column_enum {
    ($ty:ty as $repr:ty) => {
        impl $crate::Column for $ty {
            const TAG: $crate::TypeTag = <$repr as $crate::Column>::TAG;

            fn to_value(&self) -> $crate::Value {
                $crate::Column::to_value(&(*self as $repr))
            }
        }
    };
}

// ===========================================================================
// Tests
// ===========================================================================

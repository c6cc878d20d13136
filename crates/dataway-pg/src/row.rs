//! Row mapping traits and utilities

use crate::error::PgResult;
use tokio_postgres::Row;

/// Trait for converting a database row into a Rust struct.
///
/// This trait should typically be derived using `#[derive(FromRow)]`
/// from the `dataway-derive` crate.
///
/// # Example
///
/// ```ignore
/// use dataway_pg::FromRow;
///
/// #[derive(FromRow)]
/// struct User {
///     id: i64,
///     username: String,
///     email: Option<String>,
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> PgResult<Self>;
}

/// Names the PostgreSQL array type corresponding to a Rust type, for types
/// the driver doesn't cover via `tokio_postgres::types::Type` lookup (e.g.
/// range types, which share one OID family per element type).
pub trait PgType {
    fn pg_array_type() -> &'static str;
}

/// Exposes a model's primary key value, typed.
///
/// Generated by `#[derive(Model)]` for the field marked `#[orm(id)]`. Used by
/// [`crate::eager`]'s map-style preload helpers to key results by parent id.
pub trait ModelPk {
    type Id;

    fn pk(&self) -> &Self::Id;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning PgError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> PgResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> PgResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| crate::error::PgError::decode(column, e.to_string()))
    }
}

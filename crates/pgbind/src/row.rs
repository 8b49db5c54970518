//! Row mapping traits and utilities

use crate::error::{BindError, BindResult};
use tokio_postgres::Row;

/// Trait for converting a database row into a Rust struct.
///
/// This trait should typically be derived using `#[derive(FromRow)]`
/// from the `pgbind-derive` crate.
///
/// # Example
///
/// ```ignore
/// use pgbind::FromRow;
///
/// #[derive(FromRow)]
/// struct User {
///     id: i64,
///     username: String,
///     #[pgbind(column = "email_address")]
///     email: Option<String>,
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> BindResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning BindError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> BindResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> BindResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| BindError::decode(column, e.to_string()))
    }
}

macro_rules! impl_from_row_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            /// Single-column rows map straight to the scalar.
            impl FromRow for $t {
                fn from_row(row: &Row) -> BindResult<Self> {
                    row.try_get(0).map_err(|e| BindError::decode("0", e.to_string()))
                }
            }
        )*
    };
}

impl_from_row_scalar!(bool, i16, i32, i64, f32, f64, String, Vec<u8>);

impl<T> FromRow for Option<T>
where
    T: for<'a> tokio_postgres::types::FromSql<'a>,
{
    fn from_row(row: &Row) -> BindResult<Self> {
        row.try_get(0).map_err(|e| BindError::decode("0", e.to_string()))
    }
}

//! SQL fragment and clause builders.
//!
//! - [`Sql`] composes SQL pieces without tracking placeholder indices by hand.
//! - [`named`] turns a `:name` template into an [`Sql`] of named placeholders.
//! - [`Select`] assembles a SELECT statement clause by clause.
//!
//! All of them implement [`Render`](crate::Render) and can be handed to
//! [`prepare_bound`](crate::prepare_bound) and friends.
//!
//! # Example
//!
//! ```ignore
//! use pgbind::sql;
//!
//! let mut q = sql("SELECT id, username FROM users WHERE status = ");
//! q.push_arg("status").push(" ORDER BY created_at DESC");
//! assert_eq!(q.to_sql(), "SELECT id, username FROM users WHERE status = $1 ORDER BY created_at DESC");
//! ```

mod builder;
mod named;
mod select;
mod stream;


pub use builder::Sql;
pub use named::named;
pub use select::{Select, select};
pub use stream::FromRowStream;

/// Start building a SQL statement.
pub fn sql(initial_sql: impl Into<String>) -> Sql {
    Sql::new(initial_sql)
}

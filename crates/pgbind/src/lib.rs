//! # pgbind
//!
//! Named-argument prepared statements for PostgreSQL.
//!
//! ## Features
//!
//! - **Named placeholders**: write `:name` in SQL (or use the [`Sql`] / [`Select`] builders)
//! - **Struct arguments**: each placeholder is fed from the same-named field of a `#[derive(BindArgs)]` struct
//! - **Fail early**: unknown names and positional placeholders are rejected before anything reaches the server
//! - **Typed rows**: Row → Struct via `FromRow`
//! - **Transaction-friendly**: re-prepare any bound statement on a transaction with `in_tx`
//!
//! ## Example
//!
//! ```ignore
//! use pgbind::{BindArgs, FromRow, named, prepare_bound_query};
//!
//! #[derive(BindArgs)]
//! pub struct ActiveUsers {
//!     pub status: String,
//!     pub limit: i64,
//! }
//!
//! #[derive(FromRow)]
//! struct User {
//!     id: i64,
//!     username: String,
//! }
//!
//! let stmt = prepare_bound_query::<ActiveUsers, User, _, _>(
//!     &client,
//!     &named("SELECT id, username FROM users WHERE status = :status LIMIT :limit"),
//! )
//! .await?;
//!
//! let users = stmt
//!     .all(&ActiveUsers { status: "active".into(), limit: 10 })
//!     .await?;
//! ```
//!
//! ## Logging
//!
//! Events are emitted with [`tracing`] under the `pgbind.bind` (binding and
//! rebinding) and `pgbind.sql` (execution) targets. No subscriber is installed.

pub mod binder;
pub mod bound;
pub mod client;
pub mod config;
pub mod error;
pub mod mapping;
pub mod render;
pub mod row;
pub mod sql;
pub mod transaction;

pub use binder::{Binder, named_args};
pub use bound::{
    BoundQueryStmt, BoundStmt, prepare_bound, prepare_bound_query, prepare_bound_query_as,
    prepare_bound_query_with, prepare_bound_with,
};
pub use client::{GenericClient, RowStream, StreamingClient};
pub use config::StmtConfig;
pub use error::{BindError, BindResult};
pub use mapping::{BindArgs, FieldCache, FieldMap};
pub use render::{Placeholder, Render, Rendered};
pub use row::{FromRow, RowExt};
pub use sql::{FromRowStream, Select, Sql, named, select, sql};

// Re-export derive macros when the derive feature is enabled
#[cfg(feature = "derive")]
pub use pgbind_derive::{BindArgs, FromRow};

// Re-export tokio_postgres types for convenience
pub use tokio_postgres;
pub use tokio_postgres::types::ToSql;
pub use tokio_postgres::{Row, Statement};

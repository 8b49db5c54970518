//! Error types for pgbind

use crate::render::Placeholder;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for pgbind operations
pub type BindResult<T> = Result<T, BindError>;

/// Error types for binding and executing statements
#[derive(Debug, Error)]
pub enum BindError {
    /// A placeholder in a bound query has no name
    #[error("named argument required: placeholder {placeholder} is positional")]
    NamedArgRequired { placeholder: Placeholder },

    /// A named placeholder has no matching field on the argument type
    #[error("missing argument: no field named '{name}'")]
    MissingArg { name: String },

    /// The argument value was `None`
    #[error("object is nil")]
    NilArgument,

    /// A `BindArgs` implementation lists the same field name twice
    #[error("duplicate bindable field '{name}' on {type_name}")]
    DuplicateField {
        type_name: &'static str,
        name: &'static str,
    },

    /// The bound statement was closed
    #[error("statement is closed")]
    Closed,

    /// The statement handle could not be (re)prepared; reported at the point of use.
    ///
    /// Holds the error that made it unavailable. Derived statements share it.
    #[error("statement unavailable: {0}")]
    StatementUnavailable(#[source] Arc<BindError>),

    /// Query execution error
    #[error("Query error: {}", server_message(.0))]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

/// The server's own message when there is one; the driver's `Display` alone
/// only says "db error".
fn server_message(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => db.to_string(),
        None => err.to_string(),
    }
}

impl BindError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a missing argument error
    pub fn missing_arg(name: impl Into<String>) -> Self {
        Self::MissingArg { name: name.into() }
    }

    /// Check if this error came from matching placeholders against an argument
    /// (as opposed to the database or the statement lifecycle).
    pub fn is_binding_error(&self) -> bool {
        matches!(
            self,
            Self::NamedArgRequired { .. }
                | Self::MissingArg { .. }
                | Self::NilArgument
                | Self::DuplicateField { .. }
        )
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a closed-statement error
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

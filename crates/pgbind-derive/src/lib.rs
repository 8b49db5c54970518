//! Derive macros for pgbind
//!
//! Provides `#[derive(BindArgs)]` and `#[derive(FromRow)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod bind_args;
mod from_row;

/// Derive `BindArgs` for a struct, so its fields can feed named placeholders.
///
/// Only `pub` fields are bindable. Each is bound under its declared name
/// unless renamed.
///
/// # Example
///
/// ```ignore
/// use pgbind::BindArgs;
///
/// #[derive(BindArgs)]
/// #[pgbind(rename_all = "camelCase")]
/// pub struct NewUser {
///     pub user_name: String,          // bound as :userName
///     #[pgbind(rename = "mail")]
///     pub email: Option<String>,      // bound as :mail
///     #[pgbind(skip)]
///     pub draft: bool,                // not bindable
///     internal: u32,                  // private: not bindable
/// }
/// ```
///
/// # Attributes
///
/// - `#[pgbind(rename_all = "...")]` (container) - `lowercase`, `UPPERCASE`,
///   `snake_case`, `SCREAMING_SNAKE_CASE`, `kebab-case`, `camelCase`, `PascalCase`
/// - `#[pgbind(rename = "name")]` - Bind the field under a different name
/// - `#[pgbind(skip)]` - Exclude the field
///
/// Two fields resolving to the same name is a compile error.
#[proc_macro_derive(BindArgs, attributes(pgbind))]
pub fn derive_bind_args(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    bind_args::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `FromRow` trait for a struct.
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
///
/// # Attributes
///
/// - `#[pgbind(column = "name")]` - Map field to a different column name
#[proc_macro_derive(FromRow, attributes(pgbind))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

use crate::client::GenericClient;
use crate::error::{BindError, BindResult};
use crate::render::{Placeholder, Render};
use crate::row::FromRow;
use std::sync::Arc;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

#[derive(Debug, Clone)]
enum SqlPart {
    Raw(String),
    /// Positional placeholder; its value lives in `Sql::params`.
    Bind,
    /// Named placeholder; the value is supplied by a bound statement's argument.
    Arg(String),
}

/// A parameter-safe SQL fragment builder.
///
/// `Sql` stores SQL pieces, named arguments and inline parameters separately,
/// and generates `$1, $2, ...` placeholders when rendered.
///
/// - [`Sql::push_arg`] declares a *named* placeholder. Queries made only of
///   named placeholders are what bound statements prepare.
/// - [`Sql::push_bind`] declares a *positional* placeholder carrying a value.
///   Such queries execute directly through [`Sql::execute`] and friends, but
///   cannot be bound to a struct argument.
#[must_use]
#[derive(Clone)]
pub struct Sql {
    parts: Vec<SqlPart>,
    params: Vec<Arc<dyn ToSql + Sync + Send>>,
}

impl Sql {
    /// Create a new builder with an initial SQL fragment.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        Self {
            parts: vec![SqlPart::Raw(initial_sql.into())],
            params: Vec::new(),
        }
    }

    /// Create an empty builder.
    pub fn empty() -> Self {
        Self {
            parts: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Whether nothing has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(|p| matches!(p, SqlPart::Raw(s) if s.is_empty()))
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }

        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
        self
    }

    /// Append a named placeholder.
    ///
    /// The same name may be pushed more than once; every occurrence becomes its
    /// own `$n` slot and is filled from the same argument field.
    pub fn push_arg(&mut self, name: impl Into<String>) -> &mut Self {
        self.parts.push(SqlPart::Arg(name.into()));
        self
    }

    /// Append a positional placeholder and bind its value.
    pub fn push_bind<T>(&mut self, value: T) -> &mut Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        self.parts.push(SqlPart::Bind);
        self.params.push(Arc::new(value));
        self
    }

    /// Append a comma-separated list of placeholders and bind all values.
    ///
    /// If `values` is empty, this appends `NULL` (so `IN (NULL)` is valid SQL
    /// but never matches a row).
    pub fn push_bind_list<T>(&mut self, values: impl IntoIterator<Item = T>) -> &mut Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        let mut iter = values.into_iter();
        let Some(first) = iter.next() else {
            return self.push("NULL");
        };

        self.push_bind(first);
        for v in iter {
            self.push(", ");
            self.push_bind(v);
        }
        self
    }

    /// Append another `Sql` fragment, consuming it.
    pub fn push_sql(&mut self, mut other: Sql) -> &mut Self {
        self.parts.append(&mut other.parts);
        self.params.append(&mut other.params);
        self
    }

    /// Append a SQL identifier (schema/table/column) safely.
    ///
    /// Identifiers cannot be parameterized, so each `.`-separated segment is
    /// validated against `[A-Za-z_][A-Za-z0-9_]*` instead.
    pub fn push_ident(&mut self, ident: &str) -> BindResult<&mut Self> {
        let invalid = || BindError::validation(format!("Sql::push_ident: invalid identifier '{ident}'"));

        if ident.is_empty() {
            return Err(BindError::validation("Sql::push_ident: empty identifier"));
        }

        for seg in ident.split('.') {
            let mut chars = seg.chars();
            let Some(first) = chars.next() else {
                return Err(invalid());
            };
            if !(first == '_' || first.is_ascii_alphabetic()) {
                return Err(invalid());
            }
            if !chars.all(|c| c == '_' || c.is_ascii_alphanumeric()) {
                return Err(invalid());
            }
        }

        Ok(self.push(ident))
    }

    /// Render SQL with `$1, $2, ...` placeholders.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.write_parts(&mut out, 0, |_| {});
        out
    }

    /// Inline parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect()
    }

    /// Names of the named placeholders, in order (duplicates kept).
    pub fn arg_names(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                SqlPart::Arg(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    fn write_parts(&self, out: &mut String, start: usize, mut on_slot: impl FnMut(Placeholder)) {
        use std::fmt::Write;

        let mut idx = start;
        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Bind => {
                    idx += 1;
                    let _ = write!(out, "${idx}");
                    on_slot(Placeholder::anonymous(idx));
                }
                SqlPart::Arg(name) => {
                    idx += 1;
                    let _ = write!(out, "${idx}");
                    on_slot(Placeholder::named(idx, name.clone()));
                }
            }
        }
    }

    /// Direct execution only works for fully positional SQL.
    fn ensure_positional(&self) -> BindResult<()> {
        if let Some(name) = self.arg_names().first() {
            return Err(BindError::validation(format!(
                "Sql: named placeholder ':{name}' needs a bound statement (see prepare_bound)"
            )));
        }
        Ok(())
    }

    // ==================== Execution ====================

    /// Execute the built SQL and return all rows.
    pub async fn fetch_all(&self, conn: &impl GenericClient) -> BindResult<Vec<Row>> {
        self.ensure_positional()?;
        conn.query(&self.to_sql(), &self.params_ref()).await
    }

    /// Execute the built SQL and return all rows mapped to `T`.
    pub async fn fetch_all_as<T: FromRow>(&self, conn: &impl GenericClient) -> BindResult<Vec<T>> {
        let rows = self.fetch_all(conn).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Execute the built SQL and return the **first** row mapped to `T`.
    ///
    /// 0 rows returns [`BindError::NotFound`]; extra rows are ignored.
    pub async fn fetch_one_as<T: FromRow>(&self, conn: &impl GenericClient) -> BindResult<T> {
        self.ensure_positional()?;
        let row = conn.query_one(&self.to_sql(), &self.params_ref()).await?;
        T::from_row(&row)
    }

    /// Execute the built SQL and return at most one row mapped to `T`.
    pub async fn fetch_opt_as<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> BindResult<Option<T>> {
        self.ensure_positional()?;
        let row = conn.query_opt(&self.to_sql(), &self.params_ref()).await?;
        row.as_ref().map(T::from_row).transpose()
    }

    /// Execute the built SQL and return affected row count.
    pub async fn execute(&self, conn: &impl GenericClient) -> BindResult<u64> {
        self.ensure_positional()?;
        conn.execute(&self.to_sql(), &self.params_ref()).await
    }
}

impl Render for Sql {
    fn render(&self, out: &mut String, start: usize) -> BindResult<Vec<Placeholder>> {
        let mut placeholders = Vec::new();
        self.write_parts(out, start, |p| placeholders.push(p));
        Ok(placeholders)
    }
}

impl std::fmt::Debug for Sql {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sql")
            .field("sql", &self.to_sql())
            .field("params", &self.params.len())
            .finish()
    }
}

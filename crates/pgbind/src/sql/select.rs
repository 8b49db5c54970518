//! SELECT clause builder.
//!
//! Clauses are stored as [`Sql`] fragments and rendered in SQL order, so named
//! and positional placeholders keep a single continuous `$n` numbering across
//! the whole statement.

use super::builder::Sql;
use crate::error::BindResult;
use crate::render::{Placeholder, Render, render_if};

/// SELECT query builder.
///
/// ```ignore
/// use pgbind::{select, sql};
///
/// let mut cond = sql("u.id = ");
/// cond.push_arg("id");
///
/// let q = select("u.id, u.name")
///     .from("users u")
///     .left_join("teams t", "t.id = u.team_id")
///     .where_(cond)
///     .order_by("u.id");
/// ```
#[must_use]
#[derive(Debug, Clone, Default)]
pub struct Select {
    ctes: Vec<(String, Sql)>,
    columns: Vec<String>,
    from: Option<String>,
    joins: Vec<String>,
    conditions: Vec<Sql>,
    group_by: Vec<String>,
    having: Vec<Sql>,
    order_by: Vec<String>,
    limit: Option<Sql>,
    offset: Option<Sql>,
}

/// Start a SELECT with a column list (`"*"` when empty).
pub fn select(columns: &str) -> Select {
    Select::new().columns(columns)
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `WITH name AS (...)` common table expression.
    pub fn with(mut self, name: &str, query: Sql) -> Self {
        self.ctes.push((name.to_string(), query));
        self
    }

    /// Append to the SELECT column list.
    pub fn columns(mut self, columns: &str) -> Self {
        if !columns.is_empty() {
            self.columns.push(columns.to_string());
        }
        self
    }

    /// Set the FROM expression.
    pub fn from(mut self, from: &str) -> Self {
        self.from = Some(from.to_string());
        self
    }

    /// Add INNER JOIN.
    pub fn join(mut self, table: &str, on: &str) -> Self {
        self.joins.push(format!("INNER JOIN {table} ON {on}"));
        self
    }

    /// Add LEFT JOIN.
    pub fn left_join(mut self, table: &str, on: &str) -> Self {
        self.joins.push(format!("LEFT JOIN {table} ON {on}"));
        self
    }

    /// Add a WHERE condition; multiple conditions are joined with AND.
    pub fn where_(mut self, condition: Sql) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Append to GROUP BY.
    pub fn group_by(mut self, expr: &str) -> Self {
        self.group_by.push(expr.to_string());
        self
    }

    /// Add a HAVING condition; multiple conditions are joined with AND.
    pub fn having(mut self, condition: Sql) -> Self {
        self.having.push(condition);
        self
    }

    /// Append to ORDER BY.
    pub fn order_by(mut self, expr: &str) -> Self {
        self.order_by.push(expr.to_string());
        self
    }

    /// Set LIMIT; typically `sql("").push_arg("limit")` or a bound value.
    pub fn limit(mut self, limit: Sql) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set OFFSET.
    pub fn offset(mut self, offset: Sql) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Render with `$1, $2, ...` numbering and drop the placeholder list.
    pub fn to_sql(&self) -> BindResult<String> {
        Ok(self.to_rendered()?.sql)
    }
}

/// AND-joined list of conditions, each wrapped in parentheses when there is more than one.
struct Conjunction<'a>(&'a [Sql]);

impl Render for Conjunction<'_> {
    fn render(&self, out: &mut String, start: usize) -> BindResult<Vec<Placeholder>> {
        let mut placeholders = Vec::new();
        let wrap = self.0.len() > 1;
        for (i, cond) in self.0.iter().enumerate() {
            if i > 0 {
                out.push_str(" AND ");
            }
            if wrap {
                out.push('(');
            }
            placeholders.extend(cond.render(out, start + placeholders.len())?);
            if wrap {
                out.push(')');
            }
        }
        Ok(placeholders)
    }
}

impl Render for Select {
    fn render(&self, out: &mut String, start: usize) -> BindResult<Vec<Placeholder>> {
        let mut placeholders: Vec<Placeholder> = Vec::new();

        if !self.ctes.is_empty() {
            out.push_str("WITH ");
            for (i, (name, query)) in self.ctes.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(name);
                out.push_str(" AS (");
                placeholders.extend(query.render(out, start + placeholders.len())?);
                out.push(')');
            }
            out.push(' ');
        }

        out.push_str("SELECT ");
        if self.columns.is_empty() {
            out.push('*');
        } else {
            out.push_str(&self.columns.join(", "));
        }

        if let Some(from) = &self.from {
            out.push_str(" FROM ");
            out.push_str(from);
        }
        for join in &self.joins {
            out.push(' ');
            out.push_str(join);
        }

        placeholders.extend(render_if(
            out,
            start + placeholders.len(),
            &Conjunction(&self.conditions),
            !self.conditions.is_empty(),
            " WHERE ",
            "",
        )?);

        if !self.group_by.is_empty() {
            out.push_str(" GROUP BY ");
            out.push_str(&self.group_by.join(", "));
        }

        placeholders.extend(render_if(
            out,
            start + placeholders.len(),
            &Conjunction(&self.having),
            !self.having.is_empty(),
            " HAVING ",
            "",
        )?);

        if !self.order_by.is_empty() {
            out.push_str(" ORDER BY ");
            out.push_str(&self.order_by.join(", "));
        }

        if let Some(limit) = &self.limit {
            placeholders.extend(render_if(out, start + placeholders.len(), limit, true, " LIMIT ", "")?);
        }
        if let Some(offset) = &self.offset {
            placeholders.extend(render_if(out, start + placeholders.len(), offset, true, " OFFSET ", "")?);
        }

        Ok(placeholders)
    }
}

//! Rendering queries into SQL text plus placeholder descriptors.
//!
//! Anything that can be prepared implements [`Render`]: it writes its SQL into
//! an output buffer, numbering placeholders from a starting offset, and reports
//! each placeholder it emitted, named or anonymous, in order of appearance.

use crate::error::BindResult;
use std::fmt;

/// One parameter slot (`$n`) in rendered SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// 1-based position of the slot in the final SQL (`$position`).
    pub position: usize,
    /// Name the slot was declared with, or `None` for a positional slot.
    pub name: Option<String>,
}

impl Placeholder {
    /// A slot declared by name.
    pub fn named(position: usize, name: impl Into<String>) -> Self {
        Self {
            position,
            name: Some(name.into()),
        }
    }

    /// A purely positional slot.
    pub fn anonymous(position: usize) -> Self {
        Self {
            position,
            name: None,
        }
    }

    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "${} (:{})", self.position, name),
            None => write!(f, "${}", self.position),
        }
    }
}

/// The output of rendering a query from offset zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub sql: String,
    pub placeholders: Vec<Placeholder>,
}

/// A query expression that can be written out as PostgreSQL text.
pub trait Render {
    /// Write SQL into `out`, numbering placeholders from `start + 1`.
    ///
    /// Returns the placeholders written, in order.
    fn render(&self, out: &mut String, start: usize) -> BindResult<Vec<Placeholder>>;

    /// Render from offset zero into a fresh buffer.
    fn to_rendered(&self) -> BindResult<Rendered> {
        let mut sql = String::new();
        let placeholders = self.render(&mut sql, 0)?;
        Ok(Rendered { sql, placeholders })
    }
}

impl<R: Render + ?Sized> Render for &R {
    fn render(&self, out: &mut String, start: usize) -> BindResult<Vec<Placeholder>> {
        (**self).render(out, start)
    }
}

impl<R: Render + ?Sized> Render for Box<R> {
    fn render(&self, out: &mut String, start: usize) -> BindResult<Vec<Placeholder>> {
        (**self).render(out, start)
    }
}

/// Render `part` into `out` only when `cond` holds, wrapped in `prefix`/`suffix`.
///
/// Used by clause builders to skip empty clauses while keeping placeholder
/// numbering continuous.
pub(crate) fn render_if<R: Render + ?Sized>(
    out: &mut String,
    start: usize,
    part: &R,
    cond: bool,
    prefix: &str,
    suffix: &str,
) -> BindResult<Vec<Placeholder>> {
    if !cond {
        return Ok(Vec::new());
    }
    out.push_str(prefix);
    let placeholders = part.render(out, start)?;
    out.push_str(suffix);
    Ok(placeholders)
}

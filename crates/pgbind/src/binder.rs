//! Matching named placeholders against argument fields.

use crate::error::{BindError, BindResult};
use crate::mapping::{BindArgs, FieldCache};
use crate::render::Placeholder;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// Names of `placeholders`, in order.
///
/// Binding is all-or-nothing: a single positional placeholder fails the whole
/// list with [`BindError::NamedArgRequired`] carrying that placeholder.
pub fn named_args(placeholders: &[Placeholder]) -> BindResult<Vec<String>> {
    placeholders
        .iter()
        .map(|p| match &p.name {
            Some(name) => Ok(name.clone()),
            None => Err(BindError::NamedArgRequired {
                placeholder: p.clone(),
            }),
        })
        .collect()
}

#[derive(Debug)]
struct Slots {
    args: Vec<String>,
    fields: Vec<&'static str>,
    positions: Vec<usize>,
}

/// Positional mapping from a query's named placeholders to the fields of `A`.
///
/// `args()[i]` is the name of placeholder `$i+1` and `fields()[i]` the field
/// that supplies it. Immutable once built; clones share the same mapping.
pub struct Binder<A> {
    slots: Arc<Slots>,
    _marker: PhantomData<fn(&A)>,
}

impl<A> Clone for Binder<A> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
            _marker: PhantomData,
        }
    }
}

impl<A> fmt::Debug for Binder<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("args", &self.slots.args)
            .field("fields", &self.slots.fields)
            .finish()
    }
}

impl<A: BindArgs + 'static> Binder<A> {
    /// Build a binder for `placeholders` against the fields of `A`.
    ///
    /// Fails on the first positional placeholder, then on the first name (in
    /// placeholder order) with no exactly matching field.
    pub fn new(placeholders: &[Placeholder], cache: &FieldCache) -> BindResult<Self> {
        let args = named_args(placeholders)?;
        let map = cache.field_map::<A>()?;

        let mut fields = Vec::with_capacity(args.len());
        let mut positions = Vec::with_capacity(args.len());
        for name in &args {
            let Some(pos) = map.position(name) else {
                return Err(BindError::missing_arg(name.as_str()));
            };
            fields.push(map.names()[pos]);
            positions.push(pos);
        }

        tracing::debug!(
            target: "pgbind.bind",
            type_name = map.type_name(),
            args = ?args,
            "built binder"
        );

        Ok(Self {
            slots: Arc::new(Slots {
                args,
                fields,
                positions,
            }),
            _marker: PhantomData,
        })
    }
}

impl<A> Binder<A> {
    /// Placeholder names, in placeholder order.
    pub fn args(&self) -> &[String] {
        &self.slots.args
    }

    /// Field supplying each placeholder, index-aligned with [`Binder::args`].
    pub fn fields(&self) -> &[&'static str] {
        &self.slots.fields
    }

    pub fn len(&self) -> usize {
        self.slots.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.args.is_empty()
    }
}

impl<A: BindArgs> Binder<A> {
    /// Extract the positional parameter list for one execution.
    ///
    /// A nil argument fails with [`BindError::NilArgument`]; no partial list is
    /// ever returned. The argument is only read.
    pub fn to_args<'a>(&self, arg: &'a A) -> BindResult<Vec<&'a (dyn ToSql + Sync)>> {
        if arg.is_nil() {
            return Err(BindError::NilArgument);
        }

        let slots = &*self.slots;
        let mut values = Vec::with_capacity(slots.args.len());
        for (name, &pos) in slots.args.iter().zip(&slots.positions) {
            let Some(value) = arg.field_value(pos) else {
                return Err(BindError::missing_arg(name.as_str()));
            };
            values.push(value);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Person {
        name: String,
        id: i32,
    }

    impl BindArgs for Person {
        fn field_names() -> &'static [&'static str] {
            &["name", "id"]
        }

        fn field_value(&self, index: usize) -> Option<&(dyn ToSql + Sync)> {
            match index {
                0 => Some(&self.name),
                1 => Some(&self.id),
                _ => None,
            }
        }
    }

    /// Claims a field it cannot produce.
    struct Liar;

    impl BindArgs for Liar {
        fn field_names() -> &'static [&'static str] {
            &["ghost"]
        }

        fn field_value(&self, _: usize) -> Option<&(dyn ToSql + Sync)> {
            None
        }
    }

    fn named(names: &[&str]) -> Vec<Placeholder> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Placeholder::named(i + 1, *n))
            .collect()
    }

    fn debug_values(values: &[&(dyn ToSql + Sync)]) -> Vec<String> {
        values.iter().map(|v| format!("{v:?}")).collect()
    }

    #[test]
    fn named_args_collects_names() {
        let names = named_args(&named(&["id", "name", "id"])).unwrap();
        assert_eq!(names, vec!["id", "name", "id"]);
    }

    #[test]
    fn named_args_rejects_any_anonymous() {
        let placeholders = vec![
            Placeholder::named(1, "id"),
            Placeholder::anonymous(2),
            Placeholder::named(3, "name"),
        ];
        let err = named_args(&placeholders).unwrap_err();
        match err {
            BindError::NamedArgRequired { placeholder } => {
                assert_eq!(placeholder, Placeholder::anonymous(2))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn binder_aligns_args_and_fields() {
        let cache = FieldCache::new();
        let binder = Binder::<Person>::new(&named(&["id", "name"]), &cache).unwrap();
        assert_eq!(binder.args(), &["id", "name"]);
        assert_eq!(binder.fields(), &["id", "name"]);
        assert_eq!(binder.len(), 2);
    }

    #[test]
    fn to_args_reads_fields_by_name() {
        let cache = FieldCache::new();
        let binder = Binder::<Person>::new(&named(&["id", "name"]), &cache).unwrap();
        let person = Person {
            id: 7,
            name: "x".to_string(),
        };
        let values = binder.to_args(&person).unwrap();
        assert_eq!(debug_values(&values), vec!["7", "\"x\""]);
    }

    #[test]
    fn repeated_placeholder_reuses_field() {
        let cache = FieldCache::new();
        let binder = Binder::<Person>::new(&named(&["id", "id"]), &cache).unwrap();
        assert_eq!(binder.fields(), &["id", "id"]);
        let person = Person {
            id: 3,
            name: String::new(),
        };
        assert_eq!(debug_values(&binder.to_args(&person).unwrap()), vec!["3", "3"]);
    }

    #[test]
    fn missing_field_reports_first_unmatched_name() {
        let cache = FieldCache::new();
        let err = Binder::<Person>::new(&named(&["id", "missing", "other"]), &cache).unwrap_err();
        match err {
            BindError::MissingArg { name } => assert_eq!(name, "missing"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn field_names_are_case_sensitive() {
        let cache = FieldCache::new();
        let err = Binder::<Person>::new(&named(&["ID"]), &cache).unwrap_err();
        assert!(matches!(err, BindError::MissingArg { name } if name == "ID"));
    }

    #[test]
    fn anonymous_wins_over_valid_names() {
        let cache = FieldCache::new();
        let placeholders = vec![Placeholder::named(1, "id"), Placeholder::anonymous(2)];
        let err = Binder::<Person>::new(&placeholders, &cache).unwrap_err();
        assert!(matches!(err, BindError::NamedArgRequired { .. }));
        // No mapping was needed to reject the query.
        assert!(cache.is_empty());
    }

    #[test]
    fn no_placeholders_bind_to_nothing() {
        let cache = FieldCache::new();
        let binder = Binder::<Person>::new(&[], &cache).unwrap();
        assert!(binder.is_empty());
        let person = Person {
            id: 1,
            name: "a".into(),
        };
        assert!(binder.to_args(&person).unwrap().is_empty());
    }

    #[test]
    fn nil_argument_is_rejected() {
        let cache = FieldCache::new();
        let binder = Binder::<Option<Person>>::new(&named(&["name"]), &cache).unwrap();
        let err = binder.to_args(&None).unwrap_err();
        assert!(matches!(err, BindError::NilArgument));

        let some = Some(Person {
            id: 1,
            name: "a".into(),
        });
        assert_eq!(debug_values(&binder.to_args(&some).unwrap()), vec!["\"a\""]);
    }

    #[test]
    fn unreadable_field_fails_whole_extraction() {
        let cache = FieldCache::new();
        let binder = Binder::<Liar>::new(&named(&["ghost"]), &cache).unwrap();
        let err = binder.to_args(&Liar).unwrap_err();
        assert!(matches!(err, BindError::MissingArg { name } if name == "ghost"));
    }

    #[test]
    fn clones_share_mapping() {
        let cache = FieldCache::new();
        let binder = Binder::<Person>::new(&named(&["name"]), &cache).unwrap();
        let clone = binder.clone();
        assert!(Arc::ptr_eq(&binder.slots, &clone.slots));
    }
}

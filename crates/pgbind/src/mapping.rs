//! Field mapping: which fields of an argument type can be bound, and in what order.
//!
//! [`BindArgs`] is normally derived. The derive emits a static list of field
//! names (declared name, `#[pgbind(rename = "...")]`, or the container's
//! `rename_all` rule) and an accessor that returns a field by its ordinal.
//!
//! [`FieldCache`] turns that list into a [`FieldMap`] once per type and keeps
//! it for the lifetime of the cache.

use crate::error::{BindError, BindResult};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};
use tokio_postgres::types::ToSql;

/// A value whose fields can supply named query parameters.
///
/// # Example
///
/// ```ignore
/// use pgbind::BindArgs;
///
/// #[derive(BindArgs)]
/// pub struct UserById {
///     pub id: i64,
///     #[pgbind(rename = "tenant")]
///     pub tenant_id: i64,
/// }
/// ```
pub trait BindArgs: Send + Sync {
    /// Bindable field names in declaration order.
    fn field_names() -> &'static [&'static str]
    where
        Self: Sized;

    /// The value of the field at `index` in [`BindArgs::field_names`].
    ///
    /// Returns `None` for an out-of-range index, or when the value is nil.
    fn field_value(&self, index: usize) -> Option<&(dyn ToSql + Sync)>;

    /// Whether this value is a null reference (`None`).
    fn is_nil(&self) -> bool {
        false
    }
}

impl<T: BindArgs> BindArgs for Option<T> {
    fn field_names() -> &'static [&'static str] {
        T::field_names()
    }

    fn field_value(&self, index: usize) -> Option<&(dyn ToSql + Sync)> {
        self.as_ref().and_then(|v| v.field_value(index))
    }

    fn is_nil(&self) -> bool {
        self.as_ref().is_none_or(BindArgs::is_nil)
    }
}

impl<T: BindArgs> BindArgs for Box<T> {
    fn field_names() -> &'static [&'static str] {
        T::field_names()
    }

    fn field_value(&self, index: usize) -> Option<&(dyn ToSql + Sync)> {
        (**self).field_value(index)
    }

    fn is_nil(&self) -> bool {
        (**self).is_nil()
    }
}

impl<T: BindArgs> BindArgs for Arc<T> {
    fn field_names() -> &'static [&'static str] {
        T::field_names()
    }

    fn field_value(&self, index: usize) -> Option<&(dyn ToSql + Sync)> {
        (**self).field_value(index)
    }

    fn is_nil(&self) -> bool {
        (**self).is_nil()
    }
}

/// The resolved field mapping of one argument type.
#[derive(Debug)]
pub struct FieldMap {
    type_name: &'static str,
    names: &'static [&'static str],
    index: HashMap<&'static str, usize>,
}

impl FieldMap {
    /// Build the mapping for `A`, rejecting duplicate names.
    pub fn of<A: BindArgs>() -> BindResult<Self> {
        let type_name = std::any::type_name::<A>();
        let names = A::field_names();
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if index.insert(*name, i).is_some() {
                return Err(BindError::DuplicateField { type_name, name });
            }
        }
        Ok(Self {
            type_name,
            names,
            index,
        })
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Field names in declaration order.
    pub fn names(&self) -> &'static [&'static str] {
        self.names
    }

    /// Ordinal of the field called `name` (exact, case-sensitive).
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Per-type cache of [`FieldMap`]s, keyed by `TypeId`.
///
/// Thread-safe: lookups take a read lock; a miss builds the map without
/// holding any lock and the first inserted map wins, so concurrent first use
/// of the same type computes at most a throwaway duplicate.
#[derive(Debug, Default)]
pub struct FieldCache {
    maps: RwLock<HashMap<TypeId, Arc<FieldMap>>>,
}

impl FieldCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by [`prepare_bound`](crate::prepare_bound)
    /// and the other constructors without an explicit cache.
    pub fn global() -> &'static FieldCache {
        static GLOBAL: OnceLock<FieldCache> = OnceLock::new();
        GLOBAL.get_or_init(FieldCache::new)
    }

    /// The field mapping of `A`, computed on first use.
    pub fn field_map<A: BindArgs + 'static>(&self) -> BindResult<Arc<FieldMap>> {
        let key = TypeId::of::<A>();

        if let Some(map) = self.read().get(&key) {
            return Ok(Arc::clone(map));
        }

        let computed = Arc::new(FieldMap::of::<A>()?);
        tracing::debug!(
            target: "pgbind.bind",
            type_name = computed.type_name(),
            fields = computed.len(),
            "cached field mapping"
        );

        let mut maps = self.maps.write().unwrap_or_else(|e| e.into_inner());
        Ok(Arc::clone(maps.entry(key).or_insert(computed)))
    }

    /// Number of types cached so far.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<TypeId, Arc<FieldMap>>> {
        // A panic elsewhere cannot leave a half-written entry: inserts are a single call.
        self.maps.read().unwrap_or_else(|e| e.into_inner())
    }
}

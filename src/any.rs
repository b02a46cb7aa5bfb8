use core::{
    any::{type_name, Any, TypeId},
    cmp::Ordering,
    fmt::{self, Display, Formatter},
};
use std::sync::Arc;

/// Stable token of a type, used as the identity of abstract and concrete types
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub name: &'static str,
    pub id: TypeId,
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl PartialOrd for TypeInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Display for TypeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl TypeInfo {
    #[inline]
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    /// Type name without its path and generic arguments, for display only
    #[inline]
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        let name = self.name.split_once('<').map_or(self.name, |(name, _)| name);
        name.rsplit_once("::").map_or(name, |(_, name)| name)
    }
}

/// Identity of a binding: the abstract type plus an optional name.
///
/// Resolution paths reported by circular dependency errors are made of keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Key {
    pub type_info: TypeInfo,
    pub name: Option<Arc<str>>,
}

impl Key {
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            name: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn named<T: ?Sized + 'static>(name: impl Into<Arc<str>>) -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            name: Some(name.into()),
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn new(type_info: TypeInfo, name: Option<Arc<str>>) -> Self {
        Self { type_info, name }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}[{name}]", self.type_info),
            None => write!(f, "{}", self.type_info),
        }
    }
}

/// Type-erased instance. The value behind the `Any` is always an `Arc<T>` of the abstract type.
pub(crate) type ErasedInstance = Arc<dyn Any + Send + Sync>;

#[inline]
#[must_use]
pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) -> ErasedInstance {
    Arc::new(instance)
}

#[inline]
#[must_use]
pub(crate) fn downcast<T: ?Sized + Send + Sync + 'static>(instance: &ErasedInstance) -> Option<Arc<T>> {
    instance.downcast_ref::<Arc<T>>().cloned()
}

/// Type-erased resolved instance, returned where bindings of different types are mixed (tag resolution)
#[derive(Clone)]
pub struct Instance {
    key: Key,
    value: ErasedInstance,
}

impl Instance {
    #[inline]
    #[must_use]
    pub(crate) fn new(key: Key, value: ErasedInstance) -> Self {
        Self { key, value }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Returns the instance as `Arc<T>` if it was resolved for the abstract type `T`
    #[inline]
    #[must_use]
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        downcast(&self.value)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance").field("key", &self.key).finish_non_exhaustive()
    }
}

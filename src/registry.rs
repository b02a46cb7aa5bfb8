use parking_lot::RwLock;
use std::{
    collections::{btree_map::Entry, BTreeMap},
    sync::Arc,
};
use tracing::debug;

use crate::{
    any::{Key, TypeInfo},
    binding::Binding,
    errors::{BindErrorKind, ResolveErrorKind},
};

#[derive(Default)]
struct Bindings {
    unnamed: BTreeMap<TypeInfo, Arc<Binding>>,
    named: BTreeMap<TypeInfo, BTreeMap<Arc<str>, Arc<Binding>>>,
    /// Abstract types in order of their first registration
    order: Vec<TypeInfo>,
}

impl Bindings {
    fn remember(&mut self, type_info: TypeInfo) {
        if !self.unnamed.contains_key(&type_info) && !self.named.contains_key(&type_info) {
            self.order.push(type_info);
        }
    }
}

/// Thread-safe store of bindings, keyed by abstract type and optional name.
///
/// A binding is never replaced: registering the same key twice fails with [`BindErrorKind::AlreadyExists`].
#[derive(Default)]
pub struct Registry {
    bindings: RwLock<Bindings>,
}

impl Registry {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a binding under its key, named or unnamed
    ///
    /// # Errors
    /// Returns [`BindErrorKind::AlreadyExists`] if a binding with the same key is registered
    pub(crate) fn insert(&self, binding: Binding) -> Result<Arc<Binding>, BindErrorKind> {
        match binding.key.name.clone() {
            None => self.register(binding),
            Some(name) => self.register_named(binding, name),
        }
    }

    /// # Errors
    /// - [`BindErrorKind::Invalid`] if the binding is named
    /// - [`BindErrorKind::AlreadyExists`] if `T` already has an unnamed binding
    pub fn register(&self, binding: Binding) -> Result<Arc<Binding>, BindErrorKind> {
        let type_info = binding.key.type_info;
        if binding.key.name.is_some() {
            return Err(BindErrorKind::invalid(type_info, "named binding registered as unnamed"));
        }

        let mut guard = self.bindings.write();
        guard.remember(type_info);
        match guard.unnamed.entry(type_info) {
            Entry::Occupied(_) => Err(BindErrorKind::AlreadyExists { key: binding.key }),
            Entry::Vacant(entry) => {
                debug!(key = %binding.key, lifetime = %binding.lifetime, "Registered");
                Ok(entry.insert(Arc::new(binding)).clone())
            }
        }
    }

    /// # Errors
    /// - [`BindErrorKind::Invalid`] if the name is empty
    /// - [`BindErrorKind::AlreadyExists`] if `T` already has a binding with this name
    pub fn register_named(&self, mut binding: Binding, name: impl Into<Arc<str>>) -> Result<Arc<Binding>, BindErrorKind> {
        let name = name.into();
        let type_info = binding.key.type_info;
        if name.is_empty() {
            return Err(BindErrorKind::invalid(type_info, "binding name can't be empty"));
        }
        binding.key = Key::new(type_info, Some(name.clone()));

        let mut guard = self.bindings.write();
        guard.remember(type_info);
        match guard.named.entry(type_info).or_default().entry(name) {
            Entry::Occupied(_) => Err(BindErrorKind::AlreadyExists { key: binding.key }),
            Entry::Vacant(entry) => {
                debug!(key = %binding.key, lifetime = %binding.lifetime, "Registered");
                Ok(entry.insert(Arc::new(binding)).clone())
            }
        }
    }

    /// # Errors
    /// Returns [`ResolveErrorKind::NoBinding`] if `type_info` has no unnamed binding
    pub fn get(&self, type_info: &TypeInfo) -> Result<Arc<Binding>, ResolveErrorKind> {
        self.bindings
            .read()
            .unnamed
            .get(type_info)
            .cloned()
            .ok_or(ResolveErrorKind::NoBinding { type_info: *type_info })
    }

    /// # Errors
    /// - [`ResolveErrorKind::NoBinding`] if `type_info` has no bindings at all
    /// - [`ResolveErrorKind::NoNamedBinding`] if it has bindings, but none under `name`
    pub fn get_named(&self, type_info: &TypeInfo, name: &str) -> Result<Arc<Binding>, ResolveErrorKind> {
        let guard = self.bindings.read();
        if let Some(binding) = guard.named.get(type_info).and_then(|named| named.get(name)) {
            return Ok(binding.clone());
        }

        if guard.unnamed.contains_key(type_info) || guard.named.contains_key(type_info) {
            Err(ResolveErrorKind::NoNamedBinding {
                type_info: *type_info,
                name: name.into(),
            })
        } else {
            Err(ResolveErrorKind::NoBinding { type_info: *type_info })
        }
    }

    /// # Errors
    /// See [`Self::get`] and [`Self::get_named`]
    pub fn get_by_key(&self, key: &Key) -> Result<Arc<Binding>, ResolveErrorKind> {
        match key.name() {
            None => self.get(&key.type_info),
            Some(name) => self.get_named(&key.type_info, name),
        }
    }

    /// Every binding of `type_info`: the unnamed one first, then named ones ordered by name
    #[must_use]
    pub fn get_all(&self, type_info: &TypeInfo) -> Vec<Arc<Binding>> {
        let guard = self.bindings.read();
        guard
            .unnamed
            .get(type_info)
            .into_iter()
            .chain(guard.named.get(type_info).into_iter().flat_map(BTreeMap::values))
            .cloned()
            .collect()
    }

    /// Named bindings of `type_info`, ordered by name
    #[must_use]
    pub fn get_all_named_for(&self, type_info: &TypeInfo) -> Vec<(Arc<str>, Arc<Binding>)> {
        self.bindings
            .read()
            .named
            .get(type_info)
            .map(|named| named.iter().map(|(name, binding)| (name.clone(), binding.clone())).collect())
            .unwrap_or_default()
    }

    /// Every binding carrying `tag`, in order of abstract type registration, unnamed before named
    #[must_use]
    pub fn get_by_tag(&self, tag: &str) -> Vec<Arc<Binding>> {
        let guard = self.bindings.read();
        guard
            .order
            .iter()
            .flat_map(|type_info| {
                guard
                    .unnamed
                    .get(type_info)
                    .into_iter()
                    .chain(guard.named.get(type_info).into_iter().flat_map(BTreeMap::values))
            })
            .filter(|binding| binding.has_tag(tag))
            .cloned()
            .collect()
    }

    /// Abstract types with at least one binding, in order of first registration
    #[must_use]
    pub fn get_all_types(&self) -> Vec<TypeInfo> {
        self.bindings.read().order.clone()
    }

    #[must_use]
    pub fn has_unnamed_binding(&self, type_info: &TypeInfo) -> bool {
        self.bindings.read().unnamed.contains_key(type_info)
    }

    #[must_use]
    pub fn has_binding(&self, key: &Key) -> bool {
        let guard = self.bindings.read();
        match key.name() {
            None => guard.unnamed.contains_key(&key.type_info),
            Some(name) => guard.named.get(&key.type_info).is_some_and(|named| named.contains_key(name)),
        }
    }

    /// Number of bindings, named ones included
    #[must_use]
    pub fn len(&self) -> usize {
        let guard = self.bindings.read();
        guard.unnamed.len() + guard.named.values().map(BTreeMap::len).sum::<usize>()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

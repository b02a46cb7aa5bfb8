use std::collections::BTreeSet;

use crate::{any::Key, errors::ResolveErrorKind, scope::Scope};

/// Call-scoped state of one top-level resolution: the path of keys being resolved and a set for membership tests.
///
/// Passed explicitly through every nested resolution and discarded after the call.
pub(crate) struct ResolutionContext {
    path: Vec<Key>,
    seen: BTreeSet<Key>,
    max_depth: usize,
    validation_scope: Option<Scope>,
}

impl ResolutionContext {
    #[inline]
    #[must_use]
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            path: Vec::new(),
            seen: BTreeSet::new(),
            max_depth,
            validation_scope: None,
        }
    }

    /// Context for validation runs.
    /// Singletons at any depth are cached in `scope` instead of the container's cache.
    #[inline]
    #[must_use]
    pub(crate) fn detached(max_depth: usize, scope: Scope) -> Self {
        Self {
            validation_scope: Some(scope),
            ..Self::new(max_depth)
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn validation_scope(&self) -> Option<&Scope> {
        self.validation_scope.as_ref()
    }

    /// Pushes the key onto the path.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::CircularDependency`] with the path from the first key through the repeated one
    /// - [`ResolveErrorKind::DepthExceeded`] if the path is already `max_depth` long
    pub(crate) fn enter(&mut self, key: &Key) -> Result<(), ResolveErrorKind> {
        if self.seen.contains(key) {
            let mut path = self.path.clone();
            path.push(key.clone());
            return Err(ResolveErrorKind::CircularDependency { path });
        }
        if self.path.len() >= self.max_depth {
            return Err(ResolveErrorKind::DepthExceeded {
                depth: self.max_depth,
                key: key.clone(),
            });
        }

        self.path.push(key.clone());
        self.seen.insert(key.clone());
        Ok(())
    }

    /// Pops the key pushed by the matching [`Self::enter`]. Called on success and on failure.
    pub(crate) fn leave(&mut self, key: &Key) {
        let popped = self.path.pop();
        debug_assert_eq!(popped.as_ref(), Some(key));
        self.seen.remove(key);
    }

    #[inline]
    #[must_use]
    pub(crate) fn path(&self) -> &[Key] {
        &self.path
    }
}

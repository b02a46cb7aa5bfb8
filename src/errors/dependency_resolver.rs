use std::sync::Arc;

use super::{instantiate::InstantiateErrorKind, instantiator::InstantiatorErrorKind};
use crate::any::{Key, TypeInfo};

#[derive(thiserror::Error, Debug, Clone)]
pub enum ResolveErrorKind {
    #[error("Binding not found for {type_info}. Did you forget to register it?")]
    NoBinding { type_info: TypeInfo },
    #[error("Named binding `{name}` not found for {type_info}")]
    NoNamedBinding { type_info: TypeInfo, name: Arc<str> },
    #[error("Scoped binding {key} can only be resolved through a scope, not through the container")]
    ScopedOutsideScope { key: Key },
    #[error("Scope is disposed. Disposed scopes can't resolve new instances or create child scopes")]
    ScopeDisposed,
    #[error("Circular dependency detected: {}", display_path(path))]
    CircularDependency { path: Vec<Key> },
    #[error("Max resolution depth {depth} exceeded while resolving {key}")]
    DepthExceeded { depth: usize, key: Key },
    #[error("Incorrect instance type. Expected: {expected}")]
    IncorrectType { expected: TypeInfo },
    #[error("Failed to resolve {key}: {context}: {source}")]
    Resolution {
        key: Key,
        context: &'static str,
        source: InstantiatorErrorKind<Box<ResolveErrorKind>, Arc<InstantiateErrorKind>>,
    },
}

impl ResolveErrorKind {
    /// Walks nested resolution failures down to the innermost error.
    ///
    /// Resolution errors that a factory or constructor propagated as its own failure are followed too.
    #[must_use]
    pub fn root_cause(&self) -> &ResolveErrorKind {
        let mut current = self;
        loop {
            let ResolveErrorKind::Resolution { source, .. } = current else {
                return current;
            };
            current = match source {
                InstantiatorErrorKind::Deps(inner) => inner,
                InstantiatorErrorKind::Factory(err) => {
                    let InstantiateErrorKind::Custom(err) = &**err;
                    match err.downcast_ref::<ResolveErrorKind>() {
                        Some(inner) => inner,
                        None => return current,
                    }
                }
            };
        }
    }

    /// Returns the reported path if this error, or its root cause, is a circular dependency
    #[must_use]
    pub fn circular_path(&self) -> Option<&[Key]> {
        match self.root_cause() {
            ResolveErrorKind::CircularDependency { path } => Some(path),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn dependency(key: Key, err: ResolveErrorKind) -> Self {
        match err {
            // Already carry the whole path
            err @ (ResolveErrorKind::CircularDependency { .. } | ResolveErrorKind::DepthExceeded { .. }) => err,
            err => ResolveErrorKind::Resolution {
                key,
                context: "dependency resolution failed",
                source: InstantiatorErrorKind::Deps(Box::new(err)),
            },
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn instantiate(key: Key, context: &'static str, err: InstantiateErrorKind) -> Self {
        ResolveErrorKind::Resolution {
            key,
            context,
            source: InstantiatorErrorKind::Factory(Arc::new(err)),
        }
    }
}

fn display_path(path: &[Key]) -> String {
    path.iter().map(ToString::to_string).collect::<Vec<_>>().join(" -> ")
}

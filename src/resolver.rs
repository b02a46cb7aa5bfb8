use std::sync::Arc;

use crate::{
    any::{downcast, ErasedInstance, Key, TypeInfo},
    context::ResolutionContext,
    errors::ResolveErrorKind,
    Container, Scope,
};

/// Handle passed to constructors, factories and auto-wiring while one top-level resolution is in progress.
///
/// Every resolution made through it shares the resolution path of the caller,
/// so dependency cycles are detected across constructors, factories and auto-wired fields.
pub struct Resolver<'a> {
    pub(crate) container: &'a Container,
    pub(crate) scope: Option<&'a Scope>,
    pub(crate) context: &'a mut ResolutionContext,
}

impl<'a> Resolver<'a> {
    #[inline]
    #[must_use]
    pub(crate) fn new(container: &'a Container, scope: Option<&'a Scope>, context: &'a mut ResolutionContext) -> Self {
        Self { container, scope, context }
    }

    #[inline]
    #[must_use]
    pub fn container(&self) -> &Container {
        self.container
    }

    /// The scope the current resolution runs in, if any
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Option<&Scope> {
        self.scope
    }

    /// Keys currently being resolved, outermost first
    #[inline]
    #[must_use]
    pub fn path(&self) -> &[Key] {
        self.context.path()
    }

    /// Resolves the unnamed binding of `T`
    #[allow(clippy::missing_errors_doc)]
    pub fn make<T: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Arc<T>, ResolveErrorKind> {
        let key = Key::of::<T>();
        let instance = self.resolve_key(&key)?;
        typed(instance)
    }

    /// Resolves the binding of `T` registered under `name`
    #[allow(clippy::missing_errors_doc)]
    pub fn make_named<T: ?Sized + Send + Sync + 'static>(&mut self, name: &str) -> Result<Arc<T>, ResolveErrorKind> {
        let key = Key::named::<T>(name);
        let instance = self.resolve_key(&key)?;
        typed(instance)
    }

    /// Resolves the unnamed binding of `T`, or returns `None` if `T` has no binding at all.
    /// Other failures, including failures of `T`'s own dependencies, are returned as errors.
    #[allow(clippy::missing_errors_doc)]
    pub fn make_optional<T: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Option<Arc<T>>, ResolveErrorKind> {
        optional(self.make())
    }

    /// Resolves the binding of `T` registered under `name`, or returns `None` if there is no such binding
    #[allow(clippy::missing_errors_doc)]
    pub fn make_named_optional<T: ?Sized + Send + Sync + 'static>(&mut self, name: &str) -> Result<Option<Arc<T>>, ResolveErrorKind> {
        optional(self.make_named(name))
    }

    /// Resolves every binding of `T`: the unnamed one first, then named ones by name
    #[allow(clippy::missing_errors_doc)]
    pub fn make_all<T: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Vec<Arc<T>>, ResolveErrorKind> {
        let bindings = self.container.registry().get_all(&TypeInfo::of::<T>());

        let mut instances = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let instance = self.container.resolve_binding(&binding, self.scope, self.context)?;
            instances.push(typed(instance)?);
        }
        Ok(instances)
    }

    #[inline]
    fn resolve_key(&mut self, key: &Key) -> Result<ErasedInstance, ResolveErrorKind> {
        self.container.resolve_key(key, self.scope, self.context)
    }
}

#[inline]
pub(crate) fn typed<T: ?Sized + Send + Sync + 'static>(instance: ErasedInstance) -> Result<Arc<T>, ResolveErrorKind> {
    downcast(&instance).ok_or(ResolveErrorKind::IncorrectType {
        expected: TypeInfo::of::<T>(),
    })
}

#[inline]
fn optional<T>(result: Result<T, ResolveErrorKind>) -> Result<Option<T>, ResolveErrorKind> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ResolveErrorKind::NoBinding { .. } | ResolveErrorKind::NoNamedBinding { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

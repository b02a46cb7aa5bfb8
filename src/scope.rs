use core::any::type_name;
use parking_lot::RwLock;
use std::{
    mem,
    sync::{Arc, Weak},
};
use tracing::{debug, error, info_span, warn};

use crate::{
    any::{Instance, Key},
    cache::{finalize, Cache},
    errors::{DisposeError, DisposeErrorKind, ResolveErrorKind},
    Container,
};

/// Unit of work owning the instances of scoped bindings.
///
/// Scoped bindings resolve to one instance per scope; other lifetimes are delegated to the container.
/// A scope can have child scopes, disposed together with it.
/// Once disposed, a scope is inert: [`Self::make`] and [`Self::create_child_scope`] panic,
/// the `*_safe` methods return [`ResolveErrorKind::ScopeDisposed`].
///
/// Cloning is cheap and every clone shares the same state. Dropping the last clone disposes the scope.
///
/// # Examples
/// ```rust
/// use std::sync::Arc;
/// use bindery::Container;
///
/// #[derive(Default)]
/// struct Transaction;
///
/// let container = Container::new();
/// container.scoped::<Transaction, Transaction>().unwrap();
///
/// let request = container.create_scope();
/// let transaction = request.make::<Transaction>();
/// assert!(Arc::ptr_eq(&transaction, &request.make::<Transaction>()));
///
/// request.dispose().unwrap();
/// assert!(request.make_safe::<Transaction>().is_err());
/// ```
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

struct ScopeState {
    children: Vec<Weak<ScopeInner>>,
    disposed: bool,
}

struct ScopeInner {
    container: Container,
    state: RwLock<ScopeState>,
    cache: Cache,
}

impl Scope {
    #[must_use]
    pub(crate) fn new(container: Container) -> Self {
        debug!("Scope created");
        Self {
            inner: Arc::new(ScopeInner {
                container,
                state: RwLock::new(ScopeState {
                    children: Vec::new(),
                    disposed: false,
                }),
                cache: Cache::new(),
            }),
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn cache(&self) -> &Cache {
        &self.inner.cache
    }

    #[inline]
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.inner.container
    }

    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.state.read().disposed
    }

    fn check_active(&self) -> Result<(), ResolveErrorKind> {
        if self.is_disposed() {
            let err = ResolveErrorKind::ScopeDisposed;
            error!("{}", err);
            return Err(err);
        }
        Ok(())
    }

    /// Resolves the unnamed binding of `T` in this scope
    ///
    /// # Errors
    /// - [`ResolveErrorKind::ScopeDisposed`] if the scope is disposed
    /// - Every error of [`Container::make_safe`] except [`ResolveErrorKind::ScopedOutsideScope`] for `T` itself
    pub fn make_safe<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveErrorKind> {
        self.check_active()?;
        self.inner.container.make_key(Key::of::<T>(), Some(self))
    }

    /// Resolves the binding of `T` registered under `name` in this scope
    ///
    /// # Errors
    /// See [`Self::make_safe`]
    pub fn make_named_safe<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, ResolveErrorKind> {
        self.check_active()?;
        self.inner.container.make_key(Key::named::<T>(name), Some(self))
    }

    /// Resolves every binding of `T` in this scope: the unnamed one first, then named ones by name
    ///
    /// # Errors
    /// The first failure, see [`Self::make_safe`]
    pub fn make_all_safe<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<T>>, ResolveErrorKind> {
        self.check_active()?;
        self.inner.container.make_all_in(Some(self))
    }

    /// Resolves every binding carrying `tag` in this scope
    ///
    /// # Errors
    /// The first failure, see [`Self::make_safe`]
    pub fn make_with_tag_safe(&self, tag: &str) -> Result<Vec<Instance>, ResolveErrorKind> {
        self.check_active()?;
        self.inner.container.make_with_tag_in(tag, Some(self))
    }

    /// # Panics
    /// Panics if the scope is disposed or on every failure of [`Self::make_safe`]
    #[must_use]
    pub fn make<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        self.make_safe()
            .unwrap_or_else(|err| panic!("Failed to resolve {} in scope: {err}", type_name::<T>()))
    }

    /// # Panics
    /// Panics if the scope is disposed or on every failure of [`Self::make_named_safe`]
    #[must_use]
    pub fn make_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Arc<T> {
        self.make_named_safe(name)
            .unwrap_or_else(|err| panic!("Failed to resolve {}[{name}] in scope: {err}", type_name::<T>()))
    }

    /// # Panics
    /// Panics if the scope is disposed or on every failure of [`Self::make_all_safe`]
    #[must_use]
    pub fn make_all<T: ?Sized + Send + Sync + 'static>(&self) -> Vec<Arc<T>> {
        self.make_all_safe()
            .unwrap_or_else(|err| panic!("Failed to resolve all {} in scope: {err}", type_name::<T>()))
    }

    /// # Panics
    /// Panics if the scope is disposed or on every failure of [`Self::make_with_tag_safe`]
    #[must_use]
    pub fn make_with_tag(&self, tag: &str) -> Vec<Instance> {
        self.make_with_tag_safe(tag)
            .unwrap_or_else(|err| panic!("Failed to resolve tag `{tag}` in scope: {err}"))
    }

    /// Creates a child scope, disposed together with this one
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::ScopeDisposed`] if this scope is disposed
    pub fn try_create_child_scope(&self) -> Result<Scope, ResolveErrorKind> {
        let mut state = self.inner.state.write();
        if state.disposed {
            let err = ResolveErrorKind::ScopeDisposed;
            error!("{}", err);
            return Err(err);
        }

        let child = Scope::new(self.inner.container.clone());
        state.children.retain(|existing| existing.strong_count() > 0);
        state.children.push(Arc::downgrade(&child.inner));
        Ok(child)
    }

    /// # Panics
    /// Panics if this scope is disposed
    #[must_use]
    pub fn create_child_scope(&self) -> Scope {
        self.try_create_child_scope()
            .unwrap_or_else(|err| panic!("Failed to create child scope: {err}"))
    }

    /// Disposes child scopes, then runs finalizers of this scope's instances, last created first.
    ///
    /// Disposal continues past failures. Disposing an already disposed scope is a no-op.
    ///
    /// # Errors
    /// Returns [`DisposeError`] with every failure: child scope failures first, then finalizer failures
    pub fn dispose(&self) -> Result<(), DisposeError> {
        let span = info_span!("dispose_scope");
        let _guard = span.enter();

        self.inner.dispose()
    }
}

impl ScopeInner {
    fn dispose(&self) -> Result<(), DisposeError> {
        let children = {
            let mut state = self.state.write();
            if state.disposed {
                debug!("Scope already disposed");
                return Ok(());
            }
            state.disposed = true;
            mem::take(&mut state.children)
        };

        let mut errors = Vec::new();
        for child in children.iter().filter_map(Weak::upgrade) {
            if let Err(err) = child.dispose() {
                errors.push(DisposeErrorKind::Child(err));
            }
        }
        errors.extend(finalize(self.cache.close()));

        if errors.is_empty() {
            debug!("Scope disposed");
            Ok(())
        } else {
            let err = DisposeError { errors };
            error!("{}", err);
            Err(err)
        }
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            warn!("Scope disposal on drop failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Scope;
    use crate::{
        errors::{DisposeErrorKind, ResolveErrorKind},
        implements,
        lifetime::Lifetime,
        BindingBuilder, Container,
    };

    use parking_lot::Mutex;
    use std::sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    };
    use tracing::debug;
    use tracing_test::traced_test;

    trait Session: Send + Sync {}

    #[derive(Default)]
    struct DbSession;

    impl Session for DbSession {}

    implements!(DbSession => dyn Session);

    struct UnitOfWork(Arc<dyn Session>);

    fn finalizing_container(finalized: &Arc<Mutex<Vec<&'static str>>>) -> Container {
        let container = Container::new();
        container
            .register(
                BindingBuilder::<dyn Session>::to::<DbSession>()
                    .lifetime(Lifetime::Scoped)
                    .finalizer({
                        let finalized = finalized.clone();
                        move |_| {
                            debug!("Session finalizer called");
                            finalized.lock().push("session");
                            Ok(())
                        }
                    }),
            )
            .unwrap();
        container
            .register(
                BindingBuilder::<UnitOfWork>::constructor(|session: Arc<dyn Session>| Ok(UnitOfWork(session)))
                    .lifetime(Lifetime::Scoped)
                    .finalizer({
                        let finalized = finalized.clone();
                        move |_| {
                            debug!("Unit of work finalizer called");
                            finalized.lock().push("unit_of_work");
                            Ok(())
                        }
                    }),
            )
            .unwrap();
        container
    }

    #[test]
    #[traced_test]
    fn test_scoped_identity() {
        let container = Container::new();
        container.scoped::<dyn Session, DbSession>().unwrap();

        let scope = container.create_scope();
        let sibling = container.create_scope();
        let child = scope.create_child_scope();

        let session_1 = scope.make::<dyn Session>();
        let session_2 = scope.make::<dyn Session>();
        assert!(Arc::ptr_eq(&session_1, &session_2));
        assert!(!Arc::ptr_eq(&session_1, &sibling.make::<dyn Session>()));
        assert!(!Arc::ptr_eq(&session_1, &child.make::<dyn Session>()));
    }

    #[test]
    #[traced_test]
    fn test_scoped_depends_on_scoped() {
        let finalized = Arc::new(Mutex::new(Vec::new()));
        let container = finalizing_container(&finalized);

        let scope = container.create_scope();
        let unit_of_work = scope.make::<UnitOfWork>();

        assert!(Arc::ptr_eq(&unit_of_work.0, &scope.make::<dyn Session>()));
    }

    #[test]
    #[traced_test]
    fn test_dispose_reverse_order() {
        let finalized = Arc::new(Mutex::new(Vec::new()));
        let container = finalizing_container(&finalized);

        let scope = container.create_scope();
        let _ = scope.make::<dyn Session>();
        let _ = scope.make::<UnitOfWork>();

        scope.dispose().unwrap();
        assert_eq!(*finalized.lock(), ["unit_of_work", "session"]);

        // Second disposal is a no-op
        scope.dispose().unwrap();
        assert_eq!(finalized.lock().len(), 2);
    }

    #[test]
    #[traced_test]
    fn test_dispose_children_first() {
        let finalized = Arc::new(Mutex::new(Vec::new()));
        let container = finalizing_container(&finalized);

        let parent = container.create_scope();
        let child = parent.create_child_scope();
        let _ = parent.make::<dyn Session>();
        let _ = child.make::<UnitOfWork>();

        parent.dispose().unwrap();

        assert!(child.is_disposed());
        assert_eq!(*finalized.lock(), ["unit_of_work", "session", "session"]);
    }

    #[test]
    #[traced_test]
    fn test_disposed_guard() {
        let container = Container::new();
        container.scoped::<dyn Session, DbSession>().unwrap();

        let scope = container.create_scope();
        scope.dispose().unwrap();

        assert!(matches!(
            scope.make_safe::<dyn Session>(),
            Err(ResolveErrorKind::ScopeDisposed)
        ));
        assert!(matches!(scope.try_create_child_scope(), Err(ResolveErrorKind::ScopeDisposed)));
    }

    #[test]
    #[traced_test]
    #[should_panic(expected = "Scope is disposed")]
    fn test_disposed_make_panics() {
        let container = Container::new();
        container.scoped::<dyn Session, DbSession>().unwrap();

        let scope = container.create_scope();
        scope.dispose().unwrap();
        let _ = scope.make::<dyn Session>();
    }

    #[test]
    #[traced_test]
    #[should_panic(expected = "Scope is disposed")]
    fn test_disposed_create_child_panics() {
        let scope = Container::new().create_scope();
        scope.dispose().unwrap();
        let _ = scope.create_child_scope();
    }

    #[test]
    #[traced_test]
    fn test_dispose_aggregates_errors() {
        let finalizer_call_count = Arc::new(AtomicU8::new(0));

        let container = Container::new();
        container
            .register(
                BindingBuilder::<dyn Session>::to::<DbSession>()
                    .lifetime(Lifetime::Scoped)
                    .finalizer({
                        let finalizer_call_count = finalizer_call_count.clone();
                        move |_| {
                            finalizer_call_count.fetch_add(1, Ordering::SeqCst);
                            anyhow::bail!("session already closed")
                        }
                    }),
            )
            .unwrap();

        let parent = container.create_scope();
        let child = parent.create_child_scope();
        let _ = parent.make::<dyn Session>();
        let _ = child.make::<dyn Session>();

        let err = parent.dispose().unwrap_err();

        assert_eq!(finalizer_call_count.load(Ordering::SeqCst), 2);
        assert_eq!(err.errors.len(), 2);
        assert!(matches!(&err.errors[0], DisposeErrorKind::Child(child) if child.errors.len() == 1));
        assert!(matches!(&err.errors[1], DisposeErrorKind::Finalizer { .. }));
    }

    #[test]
    #[traced_test]
    fn test_close_on_drop() {
        let finalized = Arc::new(Mutex::new(Vec::new()));
        let container = finalizing_container(&finalized);

        {
            let scope: Scope = container.create_scope();
            let _ = scope.make::<UnitOfWork>();
        }

        assert_eq!(*finalized.lock(), ["unit_of_work", "session"]);
    }

    #[test]
    #[traced_test]
    fn test_make_with_tag() {
        let container = Container::new();
        container
            .register(BindingBuilder::<dyn Session>::to::<DbSession>().lifetime(Lifetime::Scoped).tag("db"))
            .unwrap();

        let scope = container.create_scope();
        let tagged = scope.make_with_tag("db");

        assert_eq!(tagged.len(), 1);
        assert!(Arc::ptr_eq(&tagged[0].downcast::<dyn Session>().unwrap(), &scope.make::<dyn Session>()));
        assert!(scope.make_with_tag("missing").is_empty());
    }

    #[test]
    #[traced_test]
    fn test_non_scoped_delegated_to_container() {
        let container = Container::new();
        container.singleton::<dyn Session, DbSession>().unwrap();

        let scope_1 = container.create_scope();
        let scope_2 = container.create_scope();

        assert!(Arc::ptr_eq(&scope_1.make::<dyn Session>(), &scope_2.make::<dyn Session>()));
        assert!(Arc::ptr_eq(&scope_1.make::<dyn Session>(), &container.make::<dyn Session>()));
    }
}

use core::any::type_name;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info_span};

use crate::{
    any::{ErasedInstance, Instance, Key, TypeInfo},
    autowire::AutoWire,
    binding::{ActivatorKind, Binding, BindingBuilder},
    cache::{finalize, Cache},
    config::Config,
    context::ResolutionContext,
    dependency_resolver::DependencyResolver,
    errors::{
        BindErrorKind, DisposeError, InstantiateErrorKind, InstantiatorErrorKind, ProviderErrorKind, ResolveErrorKind, ValidationError,
    },
    instantiator::{Constructor, Implements},
    lifetime::Lifetime,
    provider::{ProviderEntry, ServiceProvider},
    registry::Registry,
    resolver::{typed, Resolver},
    scope::Scope,
};

/// Dependency container: the registry of bindings, the singleton cache and the registered service providers.
///
/// Cloning is cheap and every clone shares the same state.
/// Dropping the last clone disposes the container, running singleton finalizers.
///
/// # Examples
/// ```rust
/// use std::sync::Arc;
/// use bindery::{implements, Container};
///
/// trait Logger: Send + Sync {}
/// trait Database: Send + Sync {}
/// trait Service: Send + Sync {}
///
/// #[derive(Default)]
/// struct ConsoleLogger;
/// #[derive(Default)]
/// struct MockDb;
///
/// struct ServiceImpl {
///     logger: Arc<dyn Logger>,
///     database: Arc<dyn Database>,
/// }
///
/// impl Logger for ConsoleLogger {}
/// impl Database for MockDb {}
/// impl Service for ServiceImpl {}
///
/// implements!(ConsoleLogger => dyn Logger);
/// implements!(MockDb => dyn Database);
/// implements!(ServiceImpl => dyn Service);
///
/// let container = Container::new();
/// container.singleton::<dyn Logger, ConsoleLogger>().unwrap();
/// container.bind::<dyn Database, MockDb>().unwrap();
/// container
///     .bind_constructor::<dyn Service, _, _>(|logger: Arc<dyn Logger>, database: Arc<dyn Database>| {
///         Ok(ServiceImpl { logger, database })
///     })
///     .unwrap();
///
/// let service = container.make_safe::<dyn Service>().unwrap();
/// ```
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    registry: Registry,
    singletons: Cache,
    providers: Mutex<Vec<Arc<ProviderEntry>>>,
    config: Config,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                registry: Registry::new(),
                singletons: Cache::new(),
                providers: Mutex::new(Vec::new()),
                config,
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }
}

/// Registration
impl Container {
    /// Builds the binding and registers it under its key
    ///
    /// # Errors
    /// - [`BindErrorKind::Invalid`] if the builder is rejected, see [`BindingBuilder::build`]
    /// - [`BindErrorKind::AlreadyExists`] if a binding with the same key is registered
    pub fn register<T: ?Sized + Send + Sync + 'static>(&self, builder: BindingBuilder<T>) -> Result<Arc<Binding>, BindErrorKind> {
        let binding = builder.build().inspect_err(|err| error!("{}", err))?;
        self.inner.registry.insert(binding).inspect_err(|err| error!("{}", err))
    }

    /// Binds `T` to a new default value of `C` on every resolution
    #[allow(clippy::missing_errors_doc)]
    pub fn bind<T, C>(&self) -> Result<Arc<Binding>, BindErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
        C: Default + Implements<T>,
    {
        self.register(BindingBuilder::<T>::to::<C>())
    }

    /// Binds `T` to one default value of `C`, created on first resolution and shared afterwards
    #[allow(clippy::missing_errors_doc)]
    pub fn singleton<T, C>(&self) -> Result<Arc<Binding>, BindErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
        C: Default + Implements<T>,
    {
        self.register(BindingBuilder::<T>::to::<C>().lifetime(Lifetime::Singleton))
    }

    /// Binds `T` to one default value of `C` per scope
    #[allow(clippy::missing_errors_doc)]
    pub fn scoped<T, C>(&self) -> Result<Arc<Binding>, BindErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
        C: Default + Implements<T>,
    {
        self.register(BindingBuilder::<T>::to::<C>().lifetime(Lifetime::Scoped))
    }

    /// Binds `T` to a pre-built instance
    #[allow(clippy::missing_errors_doc)]
    pub fn instance<T>(&self, instance: Arc<T>) -> Result<Arc<Binding>, BindErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register(BindingBuilder::<T>::instance(instance))
    }

    /// Binds `T` to a factory called on every resolution
    #[allow(clippy::missing_errors_doc)]
    pub fn factory<T, F>(&self, factory: F) -> Result<Arc<Binding>, BindErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&mut Resolver<'_>) -> Result<Arc<T>, InstantiateErrorKind> + Send + Sync + 'static,
    {
        self.register(BindingBuilder::<T>::factory(factory))
    }

    /// Binds `T` under `name` to a new default value of `C` on every resolution
    #[allow(clippy::missing_errors_doc)]
    pub fn bind_named<T, C>(&self, name: impl Into<Arc<str>>) -> Result<Arc<Binding>, BindErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
        C: Default + Implements<T>,
    {
        self.register(BindingBuilder::<T>::to::<C>().named(name))
    }

    /// Binds `T` to `C` with tags.
    ///
    /// The binding is named `{first tag}#{full type name of C}`, so several implementations of `T` can carry the same tag.
    ///
    /// # Errors
    /// - [`BindErrorKind::Invalid`] if `tags` is empty
    /// - [`BindErrorKind::AlreadyExists`] if `C` is already bound to `T` with the same first tag
    pub fn bind_with_tags<T, C, I>(&self, tags: I) -> Result<Arc<Binding>, BindErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
        C: Default + Implements<T>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let tags = tags.into_iter().map(Into::into).collect::<Vec<String>>();
        let Some(first) = tags.first() else {
            let err = BindErrorKind::invalid(TypeInfo::of::<T>(), "at least one tag is required");
            error!("{}", err);
            return Err(err);
        };
        let name = format!("{first}#{}", TypeInfo::of::<C>().name);

        self.register(BindingBuilder::<T>::to::<C>().named(name).tags(tags))
    }

    /// Binds `T` to the result of `constructor`, called on every resolution with its parameters resolved from the container
    #[allow(clippy::missing_errors_doc)]
    pub fn bind_constructor<T, Deps, Ctor>(&self, constructor: Ctor) -> Result<Arc<Binding>, BindErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
        Deps: DependencyResolver,
        Ctor: Constructor<Deps>,
        Ctor::Provides: Implements<T>,
    {
        self.register(BindingBuilder::<T>::constructor(constructor))
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn singleton_constructor<T, Deps, Ctor>(&self, constructor: Ctor) -> Result<Arc<Binding>, BindErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
        Deps: DependencyResolver,
        Ctor: Constructor<Deps>,
        Ctor::Provides: Implements<T>,
    {
        self.register(BindingBuilder::<T>::constructor(constructor).lifetime(Lifetime::Singleton))
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn scoped_constructor<T, Deps, Ctor>(&self, constructor: Ctor) -> Result<Arc<Binding>, BindErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
        Deps: DependencyResolver,
        Ctor: Constructor<Deps>,
        Ctor::Provides: Implements<T>,
    {
        self.register(BindingBuilder::<T>::constructor(constructor).lifetime(Lifetime::Scoped))
    }
}

/// Resolution
impl Container {
    /// Resolves the unnamed binding of `T`
    ///
    /// # Errors
    /// - [`ResolveErrorKind::NoBinding`] if `T` isn't registered
    /// - [`ResolveErrorKind::ScopedOutsideScope`] if `T`, or one of its dependencies, is scoped
    /// - [`ResolveErrorKind::CircularDependency`] with the full resolution path
    /// - [`ResolveErrorKind::Resolution`] if a dependency, constructor, factory or initializer failed
    pub fn make_safe<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveErrorKind> {
        self.make_key(Key::of::<T>(), None)
    }

    /// Resolves the binding of `T` registered under `name`
    ///
    /// # Errors
    /// See [`Self::make_safe`]. A missing name is reported as [`ResolveErrorKind::NoNamedBinding`]
    pub fn make_named_safe<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, ResolveErrorKind> {
        self.make_key(Key::named::<T>(name), None)
    }

    /// Resolves every binding of `T`: the unnamed one first, then named ones by name.
    /// Returns an empty list if `T` isn't registered.
    ///
    /// # Errors
    /// The first failure, see [`Self::make_safe`]
    pub fn make_all_safe<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<T>>, ResolveErrorKind> {
        self.make_all_in(None)
    }

    /// Resolves every binding carrying `tag`, whatever its abstract type
    ///
    /// # Errors
    /// The first failure, see [`Self::make_safe`]
    pub fn make_with_tag_safe(&self, tag: &str) -> Result<Vec<Instance>, ResolveErrorKind> {
        self.make_with_tag_in(tag, None)
    }

    /// Resolves the unnamed binding of `T`, panicking on failure.
    ///
    /// Intended for call sites where a missing or broken binding is a programming error,
    /// usually checked at startup with [`Self::validate`].
    ///
    /// # Panics
    /// Panics on every failure of [`Self::make_safe`]
    #[must_use]
    pub fn make<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        self.make_safe().unwrap_or_else(|err| fail::<T>(&err))
    }

    /// Same as [`Self::make`], spelled out for call sites that want the panic to be explicit
    ///
    /// # Panics
    /// Panics on every failure of [`Self::make_safe`]
    #[must_use]
    pub fn must_make<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        self.make()
    }

    /// # Panics
    /// Panics on every failure of [`Self::make_named_safe`]
    #[must_use]
    pub fn make_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Arc<T> {
        self.make_named_safe(name).unwrap_or_else(|err| fail::<T>(&err))
    }

    /// # Panics
    /// Panics on every failure of [`Self::make_all_safe`]
    #[must_use]
    pub fn make_all<T: ?Sized + Send + Sync + 'static>(&self) -> Vec<Arc<T>> {
        self.make_all_safe().unwrap_or_else(|err| fail::<T>(&err))
    }

    /// # Panics
    /// Panics on every failure of [`Self::make_with_tag_safe`]
    #[must_use]
    pub fn make_with_tag(&self, tag: &str) -> Vec<Instance> {
        self.make_with_tag_safe(tag)
            .unwrap_or_else(|err| panic!("Failed to resolve bindings tagged `{tag}`: {err}"))
    }

    /// Populates the marked fields of an externally created value
    ///
    /// # Errors
    /// The first field that failed to resolve
    pub fn auto_wire<T: AutoWire>(&self, target: &mut T) -> Result<(), ResolveErrorKind> {
        let span = info_span!("auto_wire", target = type_name::<T>());
        let _guard = span.enter();

        let mut context = ResolutionContext::new(self.inner.config.max_depth);
        let mut resolver = Resolver::new(self, None, &mut context);
        target.auto_wire(&mut resolver).inspect_err(|err| error!("{}", err))
    }

    /// Creates a root scope for scoped bindings
    #[must_use]
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.clone())
    }
}

/// Validation
impl Container {
    /// Resolves every unnamed and named binding of every registered type and reports every failure.
    ///
    /// Scoped bindings are resolved in a temporary scope, disposed afterwards.
    /// Singletons, nested ones included, are cached in that scope instead of the singleton cache,
    /// so validation doesn't change what later resolutions return.
    ///
    /// # Errors
    /// Returns [`ValidationError`] with all failures in registration order
    pub fn validate(&self) -> Result<(), ValidationError> {
        let span = info_span!("validate");
        let _guard = span.enter();

        let scope = self.create_scope();
        let mut errors = Vec::new();

        for type_info in self.inner.registry.get_all_types() {
            for binding in self.inner.registry.get_all(&type_info) {
                let mut context = ResolutionContext::detached(self.inner.config.max_depth, scope.clone());
                if let Err(err) = self.resolve_binding(&binding, Some(&scope), &mut context) {
                    debug!(dependency = %binding.key, "Validation failed: {err}");
                    errors.push(err);
                }
            }
        }

        if let Err(err) = scope.dispose() {
            debug!("Validation scope disposal failed: {err}");
        }

        if errors.is_empty() {
            debug!("Validation passed");
            Ok(())
        } else {
            let err = ValidationError { errors };
            error!("{}", err);
            Err(err)
        }
    }
}

/// Service providers
impl Container {
    /// Registers the provider's bindings.
    ///
    /// A provider type is registered once; later calls with the same type are no-ops.
    /// Providers whose [`ServiceProvider::should_register`] returns `false` are skipped.
    ///
    /// # Errors
    /// Returns [`ProviderErrorKind::Register`] if the provider's registration failed. The provider isn't recorded then.
    pub fn register_provider<P: ServiceProvider>(&self, provider: P) -> Result<(), ProviderErrorKind> {
        let span = info_span!("register_provider", provider = type_name::<P>());
        let _guard = span.enter();

        let type_info = TypeInfo::of::<P>();
        if self.inner.providers.lock().iter().any(|entry| entry.type_info == type_info) {
            debug!("Already registered");
            return Ok(());
        }
        if !provider.should_register(self) {
            debug!("Skipped");
            return Ok(());
        }

        provider.register(self).map_err(|source| {
            let err = ProviderErrorKind::Register {
                provider: type_name::<P>(),
                source,
            };
            error!("{}", err);
            err
        })?;

        let mut providers = self.inner.providers.lock();
        if providers.iter().any(|entry| entry.type_info == type_info) {
            debug!("Registered concurrently");
            return Ok(());
        }
        providers.push(Arc::new(ProviderEntry::new(provider)));
        debug!("Registered");
        Ok(())
    }

    /// Boots registered providers in registration order. A provider is never booted twice.
    ///
    /// # Errors
    /// - [`ProviderErrorKind::Boot`] for the first provider that failed to boot. Later providers aren't booted
    /// - [`ProviderErrorKind::Validation`] if [`Config::validate_on_boot`] is set and validation failed
    pub fn boot_providers(&self) -> Result<(), ProviderErrorKind> {
        let span = info_span!("boot_providers");
        let _guard = span.enter();

        let providers = self.inner.providers.lock().clone();
        for entry in providers {
            entry.boot(self).inspect_err(|err| error!("{}", err))?;
        }

        if self.inner.config.validate_on_boot {
            self.validate()?;
        }
        Ok(())
    }

    /// Type names of registered providers, in registration order
    #[must_use]
    pub fn providers(&self) -> Vec<&'static str> {
        self.inner.providers.lock().iter().map(|entry| entry.type_info.name).collect()
    }
}

/// Disposal
impl Container {
    /// Runs finalizers of created singletons, last created first, and clears the singleton cache.
    /// Later resolutions build new singletons.
    ///
    /// # Errors
    /// Returns [`DisposeError`] with every finalizer failure. Disposal doesn't stop at the first failure
    pub fn dispose(&self) -> Result<(), DisposeError> {
        self.inner.dispose()
    }
}

impl ContainerInner {
    fn dispose(&self) -> Result<(), DisposeError> {
        let errors = finalize(self.singletons.drain());
        if errors.is_empty() {
            debug!("Container disposed");
            Ok(())
        } else {
            Err(DisposeError { errors })
        }
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            tracing::warn!("Container disposal on drop failed: {err}");
        }
        debug!("Container closed on drop");
    }
}

/// Resolution core, shared by the container, scopes, resolvers and validation
impl Container {
    pub(crate) fn make_key<T: ?Sized + Send + Sync + 'static>(&self, key: Key, scope: Option<&Scope>) -> Result<Arc<T>, ResolveErrorKind> {
        let span = info_span!("make", dependency = %key);
        let _guard = span.enter();

        let mut context = ResolutionContext::new(self.inner.config.max_depth);
        self.resolve_key(&key, scope, &mut context)
            .and_then(typed)
            .inspect_err(|err| error!("{}", err))
    }

    pub(crate) fn make_all_in<T: ?Sized + Send + Sync + 'static>(&self, scope: Option<&Scope>) -> Result<Vec<Arc<T>>, ResolveErrorKind> {
        let span = info_span!("make_all", dependency = type_name::<T>());
        let _guard = span.enter();

        let mut context = ResolutionContext::new(self.inner.config.max_depth);
        Resolver::new(self, scope, &mut context)
            .make_all()
            .inspect_err(|err| error!("{}", err))
    }

    pub(crate) fn make_with_tag_in(&self, tag: &str, scope: Option<&Scope>) -> Result<Vec<Instance>, ResolveErrorKind> {
        let span = info_span!("make_with_tag", tag);
        let _guard = span.enter();

        let mut context = ResolutionContext::new(self.inner.config.max_depth);
        self.inner
            .registry
            .get_by_tag(tag)
            .into_iter()
            .map(|binding| {
                self.resolve_binding(&binding, scope, &mut context)
                    .map(|value| Instance::new(binding.key.clone(), value))
            })
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|err| error!("{}", err))
    }

    pub(crate) fn resolve_key(
        &self,
        key: &Key,
        scope: Option<&Scope>,
        context: &mut ResolutionContext,
    ) -> Result<ErasedInstance, ResolveErrorKind> {
        let binding = self.inner.registry.get_by_key(key)?;
        self.resolve_binding(&binding, scope, context)
    }

    /// Resolves the binding with its key on the resolution path.
    /// The key is popped whatever the outcome, so sibling parameters never see each other as cycles.
    pub(crate) fn resolve_binding(
        &self,
        binding: &Binding,
        scope: Option<&Scope>,
        context: &mut ResolutionContext,
    ) -> Result<ErasedInstance, ResolveErrorKind> {
        context.enter(&binding.key)?;
        let result = self.activate(binding, scope, context);
        context.leave(&binding.key);
        result
    }

    fn activate(&self, binding: &Binding, scope: Option<&Scope>, context: &mut ResolutionContext) -> Result<ErasedInstance, ResolveErrorKind> {
        let memoize_failures = self.inner.config.memoize_failures;
        let finalizer = binding.finalizer.as_ref();

        match binding.lifetime {
            Lifetime::Transient | Lifetime::Factory => self.build(binding, scope, context),
            Lifetime::Singleton => match context.validation_scope().cloned() {
                // Validation keeps its singletons in its own scope
                Some(validation_scope) => validation_scope
                    .cache()
                    .get_or_create(&binding.key, finalizer, memoize_failures, || self.build(binding, None, context)),
                None => self
                    .inner
                    .singletons
                    .get_or_create(&binding.key, finalizer, memoize_failures, || self.build(binding, None, context)),
            },
            Lifetime::Scoped => {
                let Some(scope) = scope else {
                    return Err(ResolveErrorKind::ScopedOutsideScope { key: binding.key.clone() });
                };
                scope
                    .cache()
                    .get_or_create(&binding.key, finalizer, memoize_failures, || self.build(binding, Some(scope), context))
            }
        }
    }

    fn build(&self, binding: &Binding, scope: Option<&Scope>, context: &mut ResolutionContext) -> Result<ErasedInstance, ResolveErrorKind> {
        let mut resolver = Resolver::new(self, scope, context);
        let instance = (binding.instantiator)(&mut resolver).map_err(|err| match err {
            InstantiatorErrorKind::Deps(err) => ResolveErrorKind::dependency(binding.key.clone(), err),
            InstantiatorErrorKind::Factory(err) => {
                let context = match binding.kind {
                    ActivatorKind::Constructor => "constructor failed",
                    ActivatorKind::Factory => "factory failed",
                    ActivatorKind::Instantiate | ActivatorKind::Instance => "instantiation failed",
                };
                ResolveErrorKind::instantiate(binding.key.clone(), context, err)
            }
        })?;

        if let Some(initializer) = &binding.initializer {
            initializer(&instance).map_err(|err| ResolveErrorKind::instantiate(binding.key.clone(), "initializer failed", err.into()))?;
            debug!(dependency = %binding.key, "Initialized");
        }
        Ok(instance)
    }
}

#[cold]
#[track_caller]
fn fail<T: ?Sized>(err: &ResolveErrorKind) -> ! {
    panic!("Failed to resolve {}: {err}", type_name::<T>())
}

use std::{
    collections::BTreeSet,
    fmt::{self, Debug, Formatter},
    marker::PhantomData,
    sync::Arc,
};

use crate::{
    any::{Key, TypeInfo},
    autowire::AutoWire,
    dependency_resolver::DependencyResolver,
    errors::{BindErrorKind, InstantiateErrorKind},
    finalizer::{boxed_finalizer, BoxedFinalizer, Dispose},
    initializer::{boxed_initializer, BoxedInitializer, Initialize},
    instantiator::{
        boxed_auto_wired_instantiator, boxed_constructor_instantiator, boxed_default_instantiator, boxed_factory_instantiator,
        boxed_instance_instantiator, BoxedInstantiator, Constructor, ConstructorInfo, Implements,
    },
    lifetime::Lifetime,
    resolver::Resolver,
};

/// How a binding produces its instances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivatorKind {
    /// Default value of the concrete type
    Instantiate,
    /// Constructor function with resolved parameters
    Constructor,
    /// User factory called with a [`Resolver`]
    Factory,
    /// Pre-built instance
    Instance,
}

/// Registration of one abstract type (optionally named): how to produce it and for how long it lives
#[derive(Clone)]
pub struct Binding {
    pub(crate) key: Key,
    pub(crate) concrete: Option<TypeInfo>,
    pub(crate) lifetime: Lifetime,
    pub(crate) kind: ActivatorKind,
    pub(crate) instantiator: BoxedInstantiator,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) auto_wire: bool,
    pub(crate) constructor_info: Option<ConstructorInfo>,
    pub(crate) initializer: Option<BoxedInitializer>,
    pub(crate) finalizer: Option<BoxedFinalizer>,
}

impl Binding {
    #[inline]
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.key.name()
    }

    /// Concrete type, unknown for factories and pre-built instances of abstract types
    #[inline]
    #[must_use]
    pub fn concrete(&self) -> Option<TypeInfo> {
        self.concrete
    }

    #[inline]
    #[must_use]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ActivatorKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    #[inline]
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    #[inline]
    #[must_use]
    pub fn is_auto_wired(&self) -> bool {
        self.auto_wire
    }

    #[inline]
    #[must_use]
    pub fn constructor_info(&self) -> Option<&ConstructorInfo> {
        self.constructor_info.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn has_finalizer(&self) -> bool {
        self.finalizer.is_some()
    }
}

impl Debug for Binding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("concrete", &self.concrete)
            .field("lifetime", &self.lifetime)
            .field("kind", &self.kind)
            .field("tags", &self.tags)
            .field("auto_wire", &self.auto_wire)
            .finish_non_exhaustive()
    }
}

/// Builder of a [`Binding`] for the abstract type `T`.
///
/// Start with one of [`Self::to`], [`Self::to_auto_wired`], [`Self::constructor`], [`Self::factory`] or [`Self::instance`],
/// adjust the binding and pass the builder to [`crate::Container::register`].
///
/// # Examples
/// ```rust
/// use bindery::{implements, BindingBuilder, Container, Lifetime};
///
/// trait Cache: Send + Sync {}
///
/// #[derive(Default)]
/// struct MemoryCache;
///
/// impl Cache for MemoryCache {}
///
/// implements!(MemoryCache => dyn Cache);
///
/// let container = Container::new();
/// container
///     .register(
///         BindingBuilder::<dyn Cache>::to::<MemoryCache>()
///             .lifetime(Lifetime::Singleton)
///             .named("memory")
///             .tag("storage"),
///     )
///     .unwrap();
///
/// assert!(container.make_named_safe::<dyn Cache>("memory").is_ok());
/// ```
pub struct BindingBuilder<T: ?Sized> {
    concrete: Option<TypeInfo>,
    lifetime: Lifetime,
    kind: ActivatorKind,
    instantiator: BoxedInstantiator,
    name: Option<Arc<str>>,
    tags: BTreeSet<String>,
    auto_wire: bool,
    constructor_info: Option<ConstructorInfo>,
    initializer: Option<BoxedInitializer>,
    finalizer: Option<BoxedFinalizer>,
    _abstract: PhantomData<fn() -> Box<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> BindingBuilder<T> {
    fn with(concrete: Option<TypeInfo>, kind: ActivatorKind, instantiator: BoxedInstantiator) -> Self {
        Self {
            concrete,
            lifetime: Lifetime::default(),
            kind,
            instantiator,
            name: None,
            tags: BTreeSet::new(),
            auto_wire: false,
            constructor_info: None,
            initializer: None,
            finalizer: None,
            _abstract: PhantomData,
        }
    }

    /// Binds `T` to the default value of `C`
    #[must_use]
    pub fn to<C>() -> Self
    where
        C: Default + Implements<T>,
    {
        Self::with(
            Some(TypeInfo::of::<C>()),
            ActivatorKind::Instantiate,
            boxed_default_instantiator::<T, C>(),
        )
    }

    /// Binds `T` to the default value of `C` with its marked fields injected, see [`AutoWire`]
    #[must_use]
    pub fn to_auto_wired<C>() -> Self
    where
        C: Default + AutoWire + Implements<T>,
    {
        let mut builder = Self::with(
            Some(TypeInfo::of::<C>()),
            ActivatorKind::Instantiate,
            boxed_auto_wired_instantiator::<T, C>(),
        );
        builder.auto_wire = true;
        builder
    }

    /// Binds `T` to the result of a constructor whose parameters are resolved from the container
    #[must_use]
    pub fn constructor<Deps, Ctor>(constructor: Ctor) -> Self
    where
        Deps: DependencyResolver,
        Ctor: Constructor<Deps>,
        Ctor::Provides: Implements<T>,
    {
        let mut builder = Self::with(
            Some(TypeInfo::of::<Ctor::Provides>()),
            ActivatorKind::Constructor,
            boxed_constructor_instantiator::<T, Deps, Ctor>(constructor),
        );
        builder.constructor_info = Some(ConstructorInfo::of::<Deps, Ctor::Provides>());
        builder
    }

    /// Binds `T` to a factory called on every resolution. The lifetime is [`Lifetime::Factory`] and can't be changed.
    #[must_use]
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&mut Resolver<'_>) -> Result<Arc<T>, InstantiateErrorKind> + Send + Sync + 'static,
    {
        let mut builder = Self::with(None, ActivatorKind::Factory, boxed_factory_instantiator(factory));
        builder.lifetime = Lifetime::Factory;
        builder
    }

    /// Binds `T` to a pre-built instance, returned as is by every resolution
    #[must_use]
    pub fn instance(instance: Arc<T>) -> Self {
        let mut builder = Self::with(None, ActivatorKind::Instance, boxed_instance_instantiator(instance));
        builder.lifetime = Lifetime::Singleton;
        builder
    }

    #[inline]
    #[must_use]
    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    #[inline]
    #[must_use]
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn tags<I>(mut self, tags: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Hook run after every construction, before the instance is cached or returned.
    /// A failure fails the resolution and the instance is dropped.
    #[must_use]
    pub fn initializer<Init>(mut self, initializer: Init) -> Self
    where
        Init: Fn(&Arc<T>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.initializer = Some(boxed_initializer(initializer));
        self
    }

    /// Hook run when the owner of the instance is disposed.
    ///
    /// Only singleton and scoped instances are owned and finalized, by the container and by the scope respectively.
    #[must_use]
    pub fn finalizer<Fin>(mut self, finalizer: Fin) -> Self
    where
        Fin: Fn(&Arc<T>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.finalizer = Some(boxed_finalizer(finalizer));
        self
    }

    /// Uses [`Dispose::dispose`] as the finalizer
    #[must_use]
    pub fn disposable(self) -> Self
    where
        T: Dispose,
    {
        self.finalizer(|instance: &Arc<T>| instance.dispose())
    }

    /// Uses [`Initialize::initialize`] as the initializer
    #[must_use]
    pub fn initializable(self) -> Self
    where
        T: Initialize,
    {
        self.initializer(|instance: &Arc<T>| instance.initialize())
    }

    /// # Errors
    /// Returns [`BindErrorKind::Invalid`] if:
    /// - the name is empty
    /// - a factory is registered with a lifetime other than [`Lifetime::Factory`], or the other way round
    /// - the constructor depends on the type it's registered for
    pub fn build(self) -> Result<Binding, BindErrorKind> {
        let type_info = TypeInfo::of::<T>();

        if self.name.as_deref().is_some_and(str::is_empty) {
            return Err(BindErrorKind::invalid(type_info, "binding name can't be empty"));
        }
        match (self.kind, self.lifetime) {
            (ActivatorKind::Factory, Lifetime::Factory) => {}
            (ActivatorKind::Factory, lifetime) => {
                return Err(BindErrorKind::invalid(
                    type_info,
                    format!("factory can't be registered with {lifetime} lifetime"),
                ));
            }
            (_, Lifetime::Factory) => {
                return Err(BindErrorKind::invalid(type_info, "factory lifetime requires a factory function"));
            }
            _ => {}
        }
        if let Some(constructor_info) = &self.constructor_info {
            constructor_info.check_self_dependency(type_info, self.name.is_some())?;
        }

        Ok(Binding {
            key: Key::new(type_info, self.name),
            concrete: self.concrete,
            lifetime: self.lifetime,
            kind: self.kind,
            instantiator: self.instantiator,
            tags: self.tags,
            auto_wire: self.auto_wire,
            constructor_info: self.constructor_info,
            initializer: self.initializer,
            finalizer: self.finalizer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ActivatorKind, BindingBuilder};
    use crate::{any::TypeInfo, errors::BindErrorKind, implements, lifetime::Lifetime};

    use std::sync::Arc;

    trait Repository: Send + Sync {}

    #[derive(Default)]
    struct InMemory;

    impl Repository for InMemory {}

    implements!(InMemory => dyn Repository);

    #[test]
    fn test_build_defaults() {
        let binding = BindingBuilder::<dyn Repository>::to::<InMemory>().build().unwrap();

        assert_eq!(binding.lifetime(), Lifetime::Transient);
        assert_eq!(binding.kind(), ActivatorKind::Instantiate);
        assert_eq!(binding.concrete(), Some(TypeInfo::of::<InMemory>()));
        assert_eq!(binding.name(), None);
        assert!(binding.tags().is_empty());
        assert!(!binding.has_finalizer());
    }

    #[test]
    fn test_build_named_tagged() {
        let binding = BindingBuilder::<dyn Repository>::to::<InMemory>()
            .lifetime(Lifetime::Scoped)
            .named("memory")
            .tags(["storage", "fast"])
            .finalizer(|_| Ok(()))
            .build()
            .unwrap();

        assert_eq!(binding.key().to_string(), format!("{}[memory]", TypeInfo::of::<dyn Repository>()));
        assert!(binding.has_tag("storage"));
        assert!(binding.has_tag("fast"));
        assert!(binding.has_finalizer());
    }

    #[test]
    fn test_build_rejects_empty_name() {
        let result = BindingBuilder::<dyn Repository>::to::<InMemory>().named("").build();

        assert!(matches!(result, Err(BindErrorKind::Invalid { .. })));
    }

    #[test]
    fn test_build_factory_lifetime() {
        let factory = BindingBuilder::<dyn Repository>::factory(|_| Ok(Arc::new(InMemory) as Arc<dyn Repository>));
        assert_eq!(factory.build().unwrap().lifetime(), Lifetime::Factory);

        let singleton_factory =
            BindingBuilder::<dyn Repository>::factory(|_| Ok(Arc::new(InMemory) as Arc<dyn Repository>)).lifetime(Lifetime::Singleton);
        assert!(singleton_factory.build().is_err());

        let factory_lifetime = BindingBuilder::<dyn Repository>::to::<InMemory>().lifetime(Lifetime::Factory);
        assert!(factory_lifetime.build().is_err());
    }

    #[test]
    fn test_build_rejects_self_dependency() {
        let result = BindingBuilder::<dyn Repository>::constructor(|_inner: Arc<dyn Repository>| Ok(InMemory)).build();
        assert!(matches!(result, Err(BindErrorKind::Invalid { .. })));

        // Named decorator over the unnamed binding is fine
        let decorator = BindingBuilder::<dyn Repository>::constructor(|_inner: Arc<dyn Repository>| Ok(InMemory))
            .named("decorated")
            .build()
            .unwrap();
        assert_eq!(decorator.kind(), ActivatorKind::Constructor);
        assert_eq!(decorator.constructor_info().map(|info| info.parameters.len()), Some(1));
    }
}

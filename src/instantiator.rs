use core::any::type_name;
use std::sync::Arc;
use tracing::debug;

use super::{
    any::{erase, ErasedInstance, TypeInfo},
    autowire::AutoWire,
    dependency_resolver::{DependencyResolver, Parameter, ParameterKind},
    errors::{BindErrorKind, InstantiateErrorKind, InstantiatorErrorKind, ResolveErrorKind},
    resolver::Resolver,
};

/// Upcast of a concrete type to an abstract type it satisfies.
///
/// Every sized type implements itself. For trait objects use [`crate::implements!`].
pub trait Implements<T: ?Sized>: Send + Sync + 'static {
    fn upcast(self: Arc<Self>) -> Arc<T>;
}

impl<T: Send + Sync + 'static> Implements<T> for T {
    #[inline]
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// Function building an instance from dependencies resolved by the container.
///
/// Implemented for `Fn(T1, ..., T12) -> Result<R, InstantiateErrorKind>`
/// where every parameter is a [`DependencyResolver`].
pub trait Constructor<Deps>: Send + Sync + 'static
where
    Deps: DependencyResolver,
{
    type Provides: Send + Sync + 'static;

    #[allow(clippy::missing_errors_doc)]
    fn construct(&self, dependencies: Deps) -> Result<Self::Provides, InstantiateErrorKind>;
}

macro_rules! impl_constructor {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<F, Response, $($ty,)*> Constructor<($($ty,)*)> for F
        where
            F: Fn($($ty,)*) -> Result<Response, InstantiateErrorKind> + Send + Sync + 'static,
            Response: Send + Sync + 'static,
            $( $ty: DependencyResolver, )*
        {
            type Provides = Response;

            #[inline]
            fn construct(&self, ($($ty,)*): ($($ty,)*)) -> Result<Self::Provides, InstantiateErrorKind> {
                self($($ty,)*)
            }
        }
    };
}

all_the_tuples!(impl_constructor);

/// Parameter list and product of a constructor, kept for introspection and validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorInfo {
    pub parameters: Vec<Parameter>,
    pub provides: TypeInfo,
}

impl ConstructorInfo {
    #[must_use]
    pub(crate) fn of<Deps, Provides>() -> Self
    where
        Deps: DependencyResolver,
        Provides: 'static,
    {
        Self {
            parameters: Deps::parameters(),
            provides: TypeInfo::of::<Provides>(),
        }
    }

    /// Checks that the constructor doesn't ask for the abstract type it's registered for.
    ///
    /// A named binding may take the unnamed binding of its own type (decorators),
    /// but collecting every binding of its own type always includes itself.
    pub(crate) fn check_self_dependency(&self, abstract_type: TypeInfo, named: bool) -> Result<(), BindErrorKind> {
        let self_dependency = self.parameters.iter().find(|parameter| {
            parameter.type_info == abstract_type && (!named || parameter.kind == ParameterKind::All)
        });

        match self_dependency {
            Some(_) => Err(BindErrorKind::invalid(
                abstract_type,
                "constructor depends on the type it provides",
            )),
            None => Ok(()),
        }
    }
}

pub(crate) type InstantiateResult = Result<ErasedInstance, InstantiatorErrorKind<ResolveErrorKind, InstantiateErrorKind>>;

pub(crate) type BoxedInstantiator = Arc<dyn Fn(&mut Resolver<'_>) -> InstantiateResult + Send + Sync>;

#[must_use]
pub(crate) fn boxed_constructor_instantiator<T, Deps, Ctor>(constructor: Ctor) -> BoxedInstantiator
where
    T: ?Sized + Send + Sync + 'static,
    Deps: DependencyResolver,
    Ctor: Constructor<Deps>,
    Ctor::Provides: Implements<T>,
{
    Arc::new(move |resolver: &mut Resolver<'_>| {
        let dependencies = Deps::resolve(resolver).map_err(InstantiatorErrorKind::Deps)?;
        let dependency = constructor.construct(dependencies).map_err(InstantiatorErrorKind::Factory)?;

        debug!(provides = type_name::<Ctor::Provides>(), "Constructed");

        Ok(erase(Implements::<T>::upcast(Arc::new(dependency))))
    })
}

#[must_use]
pub(crate) fn boxed_default_instantiator<T, C>() -> BoxedInstantiator
where
    T: ?Sized + Send + Sync + 'static,
    C: Default + Implements<T>,
{
    Arc::new(|_: &mut Resolver<'_>| {
        debug!(provides = type_name::<C>(), "Constructed from default");

        Ok(erase(Implements::<T>::upcast(Arc::new(C::default()))))
    })
}

#[must_use]
pub(crate) fn boxed_auto_wired_instantiator<T, C>() -> BoxedInstantiator
where
    T: ?Sized + Send + Sync + 'static,
    C: Default + AutoWire + Implements<T>,
{
    Arc::new(|resolver: &mut Resolver<'_>| {
        let mut dependency = C::default();
        dependency.auto_wire(resolver).map_err(InstantiatorErrorKind::Deps)?;

        debug!(provides = type_name::<C>(), "Constructed and auto-wired");

        Ok(erase(Implements::<T>::upcast(Arc::new(dependency))))
    })
}

#[must_use]
pub(crate) fn boxed_factory_instantiator<T, F>(factory: F) -> BoxedInstantiator
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(&mut Resolver<'_>) -> Result<Arc<T>, InstantiateErrorKind> + Send + Sync + 'static,
{
    Arc::new(move |resolver: &mut Resolver<'_>| {
        let dependency = factory(resolver).map_err(InstantiatorErrorKind::Factory)?;

        debug!(provides = type_name::<T>(), "Produced by factory");

        Ok(erase(dependency))
    })
}

#[must_use]
pub(crate) fn boxed_instance_instantiator<T>(instance: Arc<T>) -> BoxedInstantiator
where
    T: ?Sized + Send + Sync + 'static,
{
    Arc::new(move |_: &mut Resolver<'_>| Ok(erase(instance.clone())))
}

#[cfg(test)]
mod tests {
    use super::{Constructor, ConstructorInfo, Implements};
    use crate::{
        any::TypeInfo,
        dependency_resolver::{All, DependencyResolver},
        errors::{BindErrorKind, InstantiateErrorKind},
        implements,
    };

    use std::sync::Arc;

    trait Handler: Send + Sync {
        fn handle(&self) -> u8;
    }

    struct Echo(u8);

    impl Handler for Echo {
        fn handle(&self) -> u8 {
            self.0
        }
    }

    implements!(Echo => dyn Handler);

    #[test]
    #[allow(dead_code)]
    fn test_constructor_helper() {
        fn resolver<Deps: DependencyResolver, F: Constructor<Deps>>(_f: F) {}
        fn resolver_with_dep<Deps: DependencyResolver>() {
            resolver(|| Ok(()));
            resolver(|_: Arc<u8>| Ok(()));
            resolver(|_: Arc<u8>, _: Option<Arc<u16>>, _: All<dyn Handler>| Ok(()));
        }
    }

    #[test]
    fn test_upcast() {
        let handler: Arc<dyn Handler> = Implements::<dyn Handler>::upcast(Arc::new(Echo(7)));
        assert_eq!(handler.handle(), 7);

        let echo: Arc<Echo> = Implements::<Echo>::upcast(Arc::new(Echo(8)));
        assert_eq!(echo.0, 8);
    }

    #[test]
    fn test_construct() {
        let constructor = |value: Arc<u8>| Ok::<_, InstantiateErrorKind>(Echo(*value));
        let echo = constructor.construct((Arc::new(3),)).unwrap();

        assert_eq!(echo.handle(), 3);
    }

    #[test]
    fn test_self_dependency() {
        let info = ConstructorInfo::of::<(Arc<dyn Handler>, Arc<u8>), Echo>();

        assert!(matches!(
            info.check_self_dependency(TypeInfo::of::<dyn Handler>(), false),
            Err(BindErrorKind::Invalid { .. })
        ));
        // Decorator of the unnamed binding
        assert!(info.check_self_dependency(TypeInfo::of::<dyn Handler>(), true).is_ok());
        assert!(info.check_self_dependency(TypeInfo::of::<u16>(), false).is_ok());

        let info = ConstructorInfo::of::<(All<dyn Handler>,), Echo>();
        assert!(info.check_self_dependency(TypeInfo::of::<dyn Handler>(), true).is_err());
    }
}

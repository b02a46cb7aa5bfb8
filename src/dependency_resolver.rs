use std::sync::Arc;

use super::errors::ResolveErrorKind;
use crate::{any::TypeInfo, resolver::Resolver};

/// How a constructor parameter is satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// `Arc<T>`: the unnamed binding of `T`, failing if it's missing
    Required,
    /// `Option<Arc<T>>`: the unnamed binding of `T`, or `None` if `T` isn't registered
    Optional,
    /// [`All<T>`]: every binding of `T`, unnamed and named
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    pub type_info: TypeInfo,
    pub kind: ParameterKind,
}

/// Parameter of a constructor, resolved from the container before the constructor is called
pub trait DependencyResolver: Sized {
    #[allow(clippy::missing_errors_doc)]
    fn resolve(resolver: &mut Resolver<'_>) -> Result<Self, ResolveErrorKind>;

    #[must_use]
    fn parameters() -> Vec<Parameter>;
}

impl<T: ?Sized + Send + Sync + 'static> DependencyResolver for Arc<T> {
    #[inline]
    fn resolve(resolver: &mut Resolver<'_>) -> Result<Self, ResolveErrorKind> {
        resolver.make()
    }

    fn parameters() -> Vec<Parameter> {
        vec![Parameter {
            type_info: TypeInfo::of::<T>(),
            kind: ParameterKind::Required,
        }]
    }
}

impl<T: ?Sized + Send + Sync + 'static> DependencyResolver for Option<Arc<T>> {
    #[inline]
    fn resolve(resolver: &mut Resolver<'_>) -> Result<Self, ResolveErrorKind> {
        resolver.make_optional()
    }

    fn parameters() -> Vec<Parameter> {
        vec![Parameter {
            type_info: TypeInfo::of::<T>(),
            kind: ParameterKind::Optional,
        }]
    }
}

/// Every implementation registered for `T`: the unnamed binding first, then named ones by name
pub struct All<T: ?Sized>(pub Vec<Arc<T>>);

impl<T: ?Sized + Send + Sync + 'static> DependencyResolver for All<T> {
    #[inline]
    fn resolve(resolver: &mut Resolver<'_>) -> Result<Self, ResolveErrorKind> {
        resolver.make_all().map(Self)
    }

    fn parameters() -> Vec<Parameter> {
        vec![Parameter {
            type_info: TypeInfo::of::<T>(),
            kind: ParameterKind::All,
        }]
    }
}

macro_rules! impl_dependency_resolver {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case, unused_mut)]
        impl<$($ty,)*> DependencyResolver for ($($ty,)*)
        where
            $( $ty: DependencyResolver, )*
        {
            #[inline]
            #[allow(unused_variables)]
            fn resolve(resolver: &mut Resolver<'_>) -> Result<Self, ResolveErrorKind> {
                Ok(($($ty::resolve(resolver)?,)*))
            }

            fn parameters() -> Vec<Parameter> {
                let mut parameters = Vec::new();
                $( parameters.extend($ty::parameters()); )*
                parameters
            }
        }
    };
}

all_the_tuples!(impl_dependency_resolver);

#[cfg(test)]
mod tests {
    use super::{All, DependencyResolver, ParameterKind};
    use crate::{any::TypeInfo, implements, Container};

    use std::sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    };
    use tracing_test::traced_test;

    trait Plugin: Send + Sync {
        fn name(&self) -> &'static str;
    }

    #[derive(Default)]
    struct Audit;

    impl Plugin for Audit {
        fn name(&self) -> &'static str {
            "audit"
        }
    }

    #[derive(Default)]
    struct Metrics;

    impl Plugin for Metrics {
        fn name(&self) -> &'static str {
            "metrics"
        }
    }

    implements!(Audit => dyn Plugin);
    implements!(Metrics => dyn Plugin);

    struct Request;

    #[test]
    #[allow(dead_code)]
    fn test_dependency_resolver_impls() {
        fn resolver<T: DependencyResolver>() {}
        fn resolver_with_dep<Dep: Send + Sync + 'static>() {
            resolver::<Arc<Dep>>();
            resolver::<Option<Arc<Dep>>>();
            resolver::<All<Dep>>();
            resolver::<(Arc<Dep>, Option<Arc<Dep>>, All<Dep>)>();
        }
    }

    #[test]
    fn test_tuple_parameters_order() {
        let parameters = <(Arc<u8>, Option<Arc<u16>>, All<dyn Plugin>)>::parameters();

        assert_eq!(parameters.len(), 3);
        assert_eq!(parameters[0].type_info, TypeInfo::of::<u8>());
        assert_eq!(parameters[0].kind, ParameterKind::Required);
        assert_eq!(parameters[1].type_info, TypeInfo::of::<u16>());
        assert_eq!(parameters[1].kind, ParameterKind::Optional);
        assert_eq!(parameters[2].type_info, TypeInfo::of::<dyn Plugin>());
        assert_eq!(parameters[2].kind, ParameterKind::All);
        assert!(<()>::parameters().is_empty());
    }

    #[test]
    #[traced_test]
    fn test_singleton_resolve() {
        let instantiator_request_call_count = Arc::new(AtomicU8::new(0));

        let container = Container::new();
        container
            .singleton_constructor::<Request, _, _>({
                let instantiator_request_call_count = instantiator_request_call_count.clone();
                move || {
                    instantiator_request_call_count.fetch_add(1, Ordering::SeqCst);
                    Ok(Request)
                }
            })
            .unwrap();

        let request_1 = container.make_safe::<Request>().unwrap();
        let request_2 = container.make_safe::<Request>().unwrap();

        assert!(Arc::ptr_eq(&request_1, &request_2));
        assert_eq!(instantiator_request_call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[traced_test]
    fn test_optional_and_all_resolve() {
        struct Host {
            missing: Option<Arc<Request>>,
            plugins: Vec<Arc<dyn Plugin>>,
        }

        let container = Container::new();
        container.bind::<dyn Plugin, Audit>().unwrap();
        container.bind_named::<dyn Plugin, Metrics>("metrics").unwrap();
        container
            .bind_constructor::<Host, _, _>(|missing: Option<Arc<Request>>, All(plugins): All<dyn Plugin>| {
                Ok(Host { missing, plugins })
            })
            .unwrap();

        let host = container.make_safe::<Host>().unwrap();

        assert!(host.missing.is_none());
        assert_eq!(
            host.plugins.iter().map(|plugin| plugin.name()).collect::<Vec<_>>(),
            ["audit", "metrics"]
        );
    }
}

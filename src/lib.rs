#[macro_use]
pub(crate) mod macros;

pub(crate) mod any;
pub(crate) mod autowire;
pub(crate) mod binding;
pub(crate) mod cache;
pub(crate) mod config;
pub(crate) mod container;
pub(crate) mod context;
pub(crate) mod dependency_resolver;
pub(crate) mod errors;
pub(crate) mod finalizer;
pub(crate) mod initializer;
pub(crate) mod instantiator;
pub(crate) mod lifetime;
pub(crate) mod provider;
pub(crate) mod registry;
pub(crate) mod resolver;
pub(crate) mod scope;

pub use any::{Instance, Key, TypeInfo};
pub use autowire::AutoWire;
pub use binding::{ActivatorKind, Binding, BindingBuilder};
pub use config::Config;
pub use container::Container;
pub use dependency_resolver::{All, DependencyResolver, Parameter, ParameterKind};
pub use errors::{
    BindErrorKind, DisposeError, DisposeErrorKind, InstantiateErrorKind, InstantiatorErrorKind, ProviderErrorKind, ResolveErrorKind,
    UnknownLifetime, ValidationError,
};
pub use finalizer::Dispose;
pub use initializer::Initialize;
pub use instantiator::{Constructor, ConstructorInfo, Implements};
pub use lifetime::Lifetime;
pub use provider::ServiceProvider;
pub use registry::Registry;
pub use resolver::Resolver;
pub use scope::Scope;

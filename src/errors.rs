mod bind;
mod dependency_resolver;
mod dispose;
mod instantiate;
mod instantiator;
mod provider;
mod validation;

pub use bind::{BindErrorKind, UnknownLifetime};
pub use dependency_resolver::ResolveErrorKind;
pub use dispose::{DisposeError, DisposeErrorKind};
pub use instantiate::InstantiateErrorKind;
pub use instantiator::InstantiatorErrorKind;
pub use provider::ProviderErrorKind;
pub use validation::ValidationError;

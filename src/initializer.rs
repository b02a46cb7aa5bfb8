use core::any::type_name;
use std::sync::Arc;

use crate::any::{downcast, ErasedInstance};

/// Initialization capability of an instance, run right after construction and before the instance is cached or returned.
///
/// Enabled per binding with [`crate::BindingBuilder::initializable`].
pub trait Initialize: Send + Sync {
    #[allow(clippy::missing_errors_doc)]
    fn initialize(&self) -> anyhow::Result<()>;
}

pub(crate) type BoxedInitializer = Arc<dyn Fn(&ErasedInstance) -> anyhow::Result<()> + Send + Sync>;

#[must_use]
pub(crate) fn boxed_initializer<T, Init>(initializer: Init) -> BoxedInitializer
where
    T: ?Sized + Send + Sync + 'static,
    Init: Fn(&Arc<T>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(move |instance: &ErasedInstance| {
        let Some(dependency) = downcast::<T>(instance) else {
            anyhow::bail!("Incorrect instance type passed to initializer of {}", type_name::<T>());
        };
        initializer(&dependency)
    })
}

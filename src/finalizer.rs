use core::any::type_name;
use std::sync::Arc;

use crate::any::{downcast, ErasedInstance};

/// Cleanup capability of an instance.
///
/// Enabled per binding with [`crate::BindingBuilder::disposable`].
/// Cleanup runs when the owning scope (scoped bindings) or container (singletons) is disposed,
/// in reverse creation order.
///
/// # Warning
/// [`Drop`] isn't an equivalent of a finalizer, because:
/// 1. The finalizer is called in LIFO order of creation, while [`Drop`] is called when the last reference goes away.
/// 2. The finalizer can fail and the failure is reported by the disposal, while [`Drop`] can't.
pub trait Dispose: Send + Sync {
    #[allow(clippy::missing_errors_doc)]
    fn dispose(&self) -> anyhow::Result<()>;
}

pub(crate) type BoxedFinalizer = Arc<dyn Fn(&ErasedInstance) -> anyhow::Result<()> + Send + Sync>;

#[must_use]
pub(crate) fn boxed_finalizer<T, Fin>(finalizer: Fin) -> BoxedFinalizer
where
    T: ?Sized + Send + Sync + 'static,
    Fin: Fn(&Arc<T>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(move |instance: &ErasedInstance| {
        let Some(dependency) = downcast::<T>(instance) else {
            anyhow::bail!("Incorrect instance type passed to finalizer of {}", type_name::<T>());
        };
        finalizer(&dependency)
    })
}

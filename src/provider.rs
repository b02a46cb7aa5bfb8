use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::{any::TypeInfo, errors::ProviderErrorKind, Container};

/// Group of registrations, with an optional boot step run after every provider is registered.
///
/// # Examples
/// ```rust
/// use bindery::{Container, ServiceProvider};
///
/// #[derive(Default)]
/// struct Settings;
///
/// struct SettingsProvider;
///
/// impl ServiceProvider for SettingsProvider {
///     fn register(&self, container: &Container) -> anyhow::Result<()> {
///         container.singleton::<Settings, Settings>()?;
///         Ok(())
///     }
///
///     fn boot(&self, container: &Container) -> anyhow::Result<()> {
///         let _settings = container.make_safe::<Settings>()?;
///         Ok(())
///     }
/// }
///
/// let container = Container::new();
/// container.register_provider(SettingsProvider).unwrap();
/// container.boot_providers().unwrap();
/// ```
pub trait ServiceProvider: Send + Sync + 'static {
    /// Registers the provider's bindings
    #[allow(clippy::missing_errors_doc)]
    fn register(&self, container: &Container) -> anyhow::Result<()>;

    /// Called once, after registration, by [`Container::boot_providers`]
    #[allow(clippy::missing_errors_doc)]
    fn boot(&self, _container: &Container) -> anyhow::Result<()> {
        Ok(())
    }

    /// Deferred providers return `false` to be skipped by [`Container::register_provider`]
    fn should_register(&self, _container: &Container) -> bool {
        true
    }
}

pub(crate) struct ProviderEntry {
    pub(crate) type_info: TypeInfo,
    provider: Box<dyn ServiceProvider>,
    booted: AtomicBool,
}

impl ProviderEntry {
    #[must_use]
    pub(crate) fn new<P: ServiceProvider>(provider: P) -> Self {
        Self {
            type_info: TypeInfo::of::<P>(),
            provider: Box::new(provider),
            booted: AtomicBool::new(false),
        }
    }

    /// Boots the provider unless it's already booted or being booted.
    /// A failed boot can be retried by a later call.
    pub(crate) fn boot(&self, container: &Container) -> Result<(), ProviderErrorKind> {
        if self
            .booted
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(provider = self.type_info.name, "Already booted");
            return Ok(());
        }

        match self.provider.boot(container) {
            Ok(()) => {
                debug!(provider = self.type_info.name, "Booted");
                Ok(())
            }
            Err(source) => {
                self.booted.store(false, Ordering::Release);
                Err(ProviderErrorKind::Boot {
                    provider: self.type_info.name,
                    source,
                })
            }
        }
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn is_booted(&self) -> bool {
        self.booted.load(Ordering::Acquire)
    }
}

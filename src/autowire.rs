use crate::{errors::ResolveErrorKind, resolver::Resolver};

/// Field injection for types built with [`Default`] and populated afterwards.
///
/// Used by [`crate::BindingBuilder::to_auto_wired`] and [`crate::Container::auto_wire`].
/// Each field marked for injection is resolved through the resolver, which shares the resolution path
/// of the caller, so cycles through auto-wired fields are detected like any other.
///
/// # Examples
/// ```rust
/// use std::sync::Arc;
/// use bindery::{AutoWire, Container, ResolveErrorKind, Resolver};
///
/// #[derive(Default)]
/// struct Config {
///     port: u16,
/// }
///
/// #[derive(Default)]
/// struct Server {
///     config: Option<Arc<Config>>,
///     verbose: bool,
/// }
///
/// impl AutoWire for Server {
///     fn auto_wire(&mut self, resolver: &mut Resolver<'_>) -> Result<(), ResolveErrorKind> {
///         self.config = Some(resolver.make()?);
///         Ok(())
///     }
/// }
///
/// let container = Container::new();
/// container.singleton::<Config, Config>().unwrap();
///
/// let mut server = Server::default();
/// container.auto_wire(&mut server).unwrap();
/// assert!(server.config.is_some());
/// assert!(!server.verbose);
/// ```
pub trait AutoWire: Send + Sync + 'static {
    /// # Errors
    /// Returns the first resolution failure of a field. Fields wired before the failure keep their values.
    fn auto_wire(&mut self, resolver: &mut Resolver<'_>) -> Result<(), ResolveErrorKind>;
}

#[cfg(test)]
mod tests {
    use super::AutoWire;
    use crate::{errors::ResolveErrorKind, implements, resolver::Resolver, Container};

    use std::sync::Arc;
    use tracing_test::traced_test;

    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    #[derive(Default)]
    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> u64 {
            42
        }
    }

    implements!(FixedClock => dyn Clock);

    #[derive(Default)]
    struct Scheduler {
        clock: Option<Arc<dyn Clock>>,
        fallback: Option<Arc<dyn Clock>>,
        ticks: u64,
    }

    impl AutoWire for Scheduler {
        fn auto_wire(&mut self, resolver: &mut Resolver<'_>) -> Result<(), ResolveErrorKind> {
            self.clock = Some(resolver.make()?);
            self.fallback = resolver.make_named_optional("fallback")?;
            Ok(())
        }
    }

    #[test]
    #[traced_test]
    fn test_auto_wire_existing_value() {
        let container = Container::new();
        container.singleton::<dyn Clock, FixedClock>().unwrap();

        let mut scheduler = Scheduler {
            ticks: 5,
            ..Default::default()
        };
        container.auto_wire(&mut scheduler).unwrap();

        assert_eq!(scheduler.clock.as_ref().map(|clock| clock.now()), Some(42));
        assert!(scheduler.fallback.is_none());
        // Unmarked fields are left alone
        assert_eq!(scheduler.ticks, 5);
    }

    #[test]
    #[traced_test]
    fn test_auto_wire_missing_dependency() {
        let container = Container::new();

        let mut scheduler = Scheduler::default();
        let err = container.auto_wire(&mut scheduler).unwrap_err();

        assert!(matches!(err, ResolveErrorKind::NoBinding { .. }));
        assert!(scheduler.clock.is_none());
    }

    #[test]
    #[traced_test]
    fn test_auto_wired_binding() {
        let container = Container::new();
        container.singleton::<dyn Clock, FixedClock>().unwrap();
        container
            .register(crate::BindingBuilder::<Scheduler>::to_auto_wired::<Scheduler>())
            .unwrap();

        let scheduler = container.make_safe::<Scheduler>().unwrap();
        assert_eq!(scheduler.clock.as_ref().map(|clock| clock.now()), Some(42));
    }
}

macro_rules! all_the_tuples {
    ($name:ident) => {
        $name!([]);
        $name!([T1]);
        $name!([T1, T2]);
        $name!([T1, T2, T3]);
        $name!([T1, T2, T3, T4]);
        $name!([T1, T2, T3, T4, T5]);
        $name!([T1, T2, T3, T4, T5, T6]);
        $name!([T1, T2, T3, T4, T5, T6, T7]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9, T10]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12]);
    };
}

/// Declares that a concrete type satisfies one or more abstract types.
///
/// # Syntax
/// ```text
/// implements!(Concrete => dyn Trait [, dyn OtherTrait ...]);
/// ```
///
/// # Examples
/// ```rust
/// use bindery::{implements, Container};
///
/// trait Logger: Send + Sync {
///     fn log(&self, message: &str);
/// }
///
/// #[derive(Default)]
/// struct ConsoleLogger;
///
/// impl Logger for ConsoleLogger {
///     fn log(&self, _message: &str) {}
/// }
///
/// implements!(ConsoleLogger => dyn Logger);
///
/// let container = Container::new();
/// container.singleton::<dyn Logger, ConsoleLogger>().unwrap();
/// container.make::<dyn Logger>().log("hello");
/// ```
#[macro_export]
macro_rules! implements {
    ($concrete:ty => $($abstract:ty),+ $(,)?) => {
        $(
            impl $crate::Implements<$abstract> for $concrete {
                #[inline]
                fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$abstract> {
                    self
                }
            }
        )+
    };
}

/// Config for a container
/// ## Fields
/// - `max_depth`:
///   Maximum length of a resolution path. Deeper graphs fail with [`crate::ResolveErrorKind::DepthExceeded`].
///
/// - `memoize_failures`:
///   If `true`, a failed singleton or scoped construction is cached and the same error is returned
///   on every later resolution of that key. If `false`, the next resolution retries the construction.
///
///   Concurrent callers waiting on one construction always observe the same result.
///
/// - `validate_on_boot`:
///   If `true`, [`crate::Container::boot_providers`] runs [`crate::Container::validate`] after booting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub max_depth: usize,
    pub memoize_failures: bool,
    pub validate_on_boot: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: 1024,
            memoize_failures: true,
            validate_on_boot: false,
        }
    }
}

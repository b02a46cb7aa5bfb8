use core::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use crate::errors::UnknownLifetime;

/// Caching and sharing policy of a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// New instance on every resolution
    #[default]
    Transient,
    /// One instance per container, created lazily and exactly once
    Singleton,
    /// One instance per scope. Resolvable only through a [`crate::Scope`]
    Scoped,
    /// User factory invoked on every resolution
    Factory,
}

impl Lifetime {
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Transient => "transient",
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
            Lifetime::Factory => "factory",
        }
    }

    /// Whether instances of this lifetime are cached and so owned by a container or a scope
    #[inline]
    #[must_use]
    pub const fn is_cached(&self) -> bool {
        matches!(self, Lifetime::Singleton | Lifetime::Scoped)
    }
}

impl Display for Lifetime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifetime {
    type Err = UnknownLifetime;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "transient" => Ok(Lifetime::Transient),
            "singleton" => Ok(Lifetime::Singleton),
            "scoped" => Ok(Lifetime::Scoped),
            "factory" => Ok(Lifetime::Factory),
            unknown => Err(UnknownLifetime(unknown.to_owned())),
        }
    }
}

use core::fmt::{self, Display, Formatter};

use crate::any::Key;

#[derive(thiserror::Error, Debug)]
pub enum DisposeErrorKind {
    #[error("child scope disposal error: {0}")]
    Child(#[source] DisposeError),
    #[error("finalizer of {key} failed: {source}")]
    Finalizer { key: Key, source: anyhow::Error },
}

/// Aggregate of every failure that happened while disposing a scope or a container.
/// Disposal never stops at the first failure.
#[derive(thiserror::Error, Debug)]
pub struct DisposeError {
    pub errors: Vec<DisposeErrorKind>,
}

impl Display for DisposeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "disposal encountered {} error(s): [", self.errors.len())?;
        for (index, err) in self.errors.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        f.write_str("]")
    }
}

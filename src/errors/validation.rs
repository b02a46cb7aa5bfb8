use core::fmt::{self, Display, Formatter};

use super::dependency_resolver::ResolveErrorKind;

/// Every resolution failure found while walking all registered bindings
#[derive(thiserror::Error, Debug, Clone)]
pub struct ValidationError {
    pub errors: Vec<ResolveErrorKind>,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => write!(f, "validation failed"),
            [err] => write!(f, "validation failed: {err}"),
            errors => {
                writeln!(f, "validation failed with {} errors:", errors.len())?;
                for (index, err) in errors.iter().enumerate() {
                    writeln!(f, "  {}. {err}", index + 1)?;
                }
                Ok(())
            }
        }
    }
}

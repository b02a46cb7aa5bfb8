use std::borrow::Cow;

use crate::any::{Key, TypeInfo};

#[derive(thiserror::Error, Debug, Clone)]
pub enum BindErrorKind {
    #[error("Binding already exists for {key}. Use a different name or keep the existing binding")]
    AlreadyExists { key: Key },
    #[error("Invalid binding for {type_info}: {reason}")]
    Invalid { type_info: TypeInfo, reason: Cow<'static, str> },
}

impl BindErrorKind {
    #[inline]
    #[must_use]
    pub(crate) fn invalid(type_info: TypeInfo, reason: impl Into<Cow<'static, str>>) -> Self {
        Self::Invalid {
            type_info,
            reason: reason.into(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown lifetime `{0}`, expected one of: transient, singleton, scoped, factory")]
pub struct UnknownLifetime(pub String);

/// Failure raised by user code: a constructor, a factory or an initialization hook
#[derive(thiserror::Error, Debug)]
pub enum InstantiateErrorKind {
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}

impl InstantiateErrorKind {
    #[inline]
    #[must_use]
    pub fn msg<M>(message: M) -> Self
    where
        M: core::fmt::Display + core::fmt::Debug + Send + Sync + 'static,
    {
        Self::Custom(anyhow::Error::msg(message))
    }
}

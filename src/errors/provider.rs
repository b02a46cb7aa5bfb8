use super::validation::ValidationError;

#[derive(thiserror::Error, Debug)]
pub enum ProviderErrorKind {
    #[error("provider {provider} registration failed: {source}")]
    Register { provider: &'static str, source: anyhow::Error },
    #[error("provider {provider} boot failed: {source}")]
    Boot { provider: &'static str, source: anyhow::Error },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

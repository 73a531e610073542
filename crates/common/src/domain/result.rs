use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

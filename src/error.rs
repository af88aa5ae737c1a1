use thiserror::Error;

/// Errors surfaced to the UI layer.
///
/// `Unauthenticated` and `Validation` are resolved entirely client-side and
/// never reach the platform; `Remote` wraps any failure reported by a
/// collaborator call.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not signed in")]
    Unauthenticated,
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ClientError::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ClientError::NotFound(what.into())
    }
}

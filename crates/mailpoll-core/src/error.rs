//! Error types for the core module

use mailpoll_auth::AuthError;
use mailpoll_imap::ImapError;
use thiserror::Error;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while handling a request
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required request field is missing
    #[error("Missing {0}")]
    MissingInput(&'static str),

    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// IMAP error
    #[error(transparent)]
    Imap(#[from] ImapError),

    /// Token service failure while serving a token request
    #[error(transparent)]
    TokenService(AuthError),
}

impl CoreError {
    /// HTTP status the error is reported with
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::MissingInput(_) => 400,
            CoreError::Imap(ImapError::MissingCredentials | ImapError::InvalidAddress(_)) => 400,
            CoreError::Imap(e) if e.is_auth_failure() => 401,
            CoreError::Imap(_) => 500,
            CoreError::Auth(AuthError::InvalidConfig(_)) => 500,
            CoreError::Auth(_) => 401,
            CoreError::TokenService(_) => 500,
        }
    }
}

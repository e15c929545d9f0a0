//! Error types for the auth module

use thiserror::Error;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur while obtaining an access token
#[derive(Debug, Error)]
pub enum AuthError {
    /// The caller has no connected Gmail account
    #[error("No Gmail account connected, connect one first: {0}")]
    NoLinkedAccount(String),

    /// The token service answered with an error
    #[error("Failed to fetch Gmail token: {0}")]
    TokenFetchFailed(String),

    /// The token service could not be reached
    #[error("Could not reach the token service: {0}")]
    TokenServiceUnreachable(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

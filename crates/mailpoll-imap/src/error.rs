//! Error types for IMAP operations

use thiserror::Error;

/// Result type for IMAP operations
pub type ImapResult<T> = Result<T, ImapError>;

/// Errors that can occur while opening and using an IMAP session
#[derive(Debug, Error)]
pub enum ImapError {
    /// Neither a password nor an OAuth2 token was supplied
    #[error("Neither password nor OAuth2 token provided")]
    MissingCredentials,

    /// TCP, TLS or greeting failure
    #[error("Failed to connect to IMAP server: {0}")]
    ConnectionFailed(String),

    /// The server rejected the XOAUTH2 exchange; the token should be refreshed
    #[error("OAuth2 token is invalid or expired, please refresh it: {0}")]
    TokenExpiredOrInvalid(String),

    /// The XOAUTH2 exchange failed for a reason other than a SASL rejection
    #[error("XOAUTH2 authentication failed: {0}")]
    AuthProtocol(String),

    /// LOGIN was rejected
    #[error("IMAP login failed: {0}")]
    InvalidCredentials(String),

    /// The server target could not be derived from the address
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Server returned an error for a command after authentication
    #[error("IMAP server error: {0}")]
    ServerError(String),
}

impl ImapError {
    /// Whether the caller may refresh the OAuth2 token and try again
    pub fn is_token_rejection(&self) -> bool {
        matches!(self, ImapError::TokenExpiredOrInvalid(_))
    }

    /// Whether the failure was caused by the supplied credentials
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ImapError::TokenExpiredOrInvalid(_) | ImapError::InvalidCredentials(_)
        )
    }
}

//! Authentication module for mailpoll
//!
//! Obtains valid Gmail OAuth2 access tokens from the token service, which
//! refreshes them on demand. The tokens are then used for XOAUTH2 by
//! `mailpoll-imap`.

mod error;
mod token_service;

pub use error::{AuthError, AuthResult};
pub use token_service::{
    GmailTokenFetcher, TokenResponse, TokenServiceConfig, TokenSource, DEFAULT_TIMEOUT,
};

/// Gmail constants
pub mod gmail {
    /// Provider name that triggers automatic token retrieval
    pub const PROVIDER: &str = "gmail";
}

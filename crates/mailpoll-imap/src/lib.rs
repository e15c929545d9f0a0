//! IMAP authentication for mailpoll
//!
//! Opens authenticated IMAP sessions over implicit TLS, using XOAUTH2 when an
//! OAuth2 access token is available and LOGIN otherwise.

mod authenticator;
mod connector;
mod error;
mod mailbox;
mod oauth2;
mod resolver;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use authenticator::{
    classify_xoauth2_failure, AuthMethod, Authenticator, Credentials, MailSession,
};
pub use connector::{Connector, ConnectorConfig, TlsConnector};
pub use error::{ImapError, ImapResult};
pub use mailbox::{unseen_uids, UnseenMessages};
pub use oauth2::XOAuth2Authenticator;
pub use resolver::{ProviderResolver, ServerHints, ServerResolver, ServerTarget, IMAPS_PORT};

//! XOAUTH2 authenticator for async-imap
//!
//! Implements the SASL XOAUTH2 mechanism as described at
//! https://developers.google.com/workspace/gmail/imap/xoauth2-protocol

use base64::prelude::*;

/// XOAUTH2 authenticator for async-imap
///
/// The first challenge is answered with the initial client response. Gmail
/// answers a rejected token with a second challenge carrying JSON error
/// details; that one gets an empty response so the server can send its
/// tagged NO.
#[derive(Debug, Clone)]
pub struct XOAuth2Authenticator {
    /// Email address
    email: String,
    /// OAuth2 access token
    access_token: String,
    /// Set once the initial response has been handed out
    responded: bool,
}

impl XOAuth2Authenticator {
    /// Create a new XOAUTH2 authenticator
    pub fn new(email: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            access_token: access_token.into(),
            responded: false,
        }
    }

    /// Generate the XOAUTH2 authentication string
    ///
    /// Format: "user={email}\x01auth=Bearer {token}\x01\x01"
    pub fn auth_string(&self) -> String {
        format!(
            "user={}\x01auth=Bearer {}\x01\x01",
            self.email, self.access_token
        )
    }

    /// Get the base64-encoded authentication response as sent on the wire
    pub fn encoded(&self) -> String {
        BASE64_STANDARD.encode(self.auth_string())
    }
}

/// async-imap base64-encodes whatever `process` returns, so the raw string
/// is handed over here.
impl async_imap::Authenticator for XOAuth2Authenticator {
    type Response = String;

    fn process(&mut self, challenge: &[u8]) -> Self::Response {
        if self.responded {
            tracing::debug!(
                "XOAUTH2 error challenge: {}",
                String::from_utf8_lossy(challenge)
            );
            return String::new();
        }
        self.responded = true;
        self.auth_string()
    }
}

//! Server target resolution

use std::fmt;

use crate::{ImapError, ImapResult};

/// Default implicit-TLS IMAP port
pub const IMAPS_PORT: u16 = 993;

/// Host and port of an IMAP server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTarget {
    pub host: String,
    pub port: u16,
}

impl ServerTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ServerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Optional overrides supplied alongside a mailbox address
#[derive(Debug, Clone, Default)]
pub struct ServerHints {
    /// Explicit IMAP host
    pub host: Option<String>,
    /// Explicit IMAP port
    pub port: Option<u16>,
    /// Provider name such as "gmail" or "ionos"
    pub provider: Option<String>,
}

/// Maps an address plus hints to the server to connect to
pub trait ServerResolver: Send + Sync {
    fn resolve(&self, address: &str, hints: &ServerHints) -> ImapResult<ServerTarget>;
}

/// Resolver backed by a table of well-known providers
///
/// Explicit host and port always win. Without an explicit host the provider
/// table is consulted, then `imap.<domain>` is assumed.
#[derive(Debug, Clone, Default)]
pub struct ProviderResolver;

impl ProviderResolver {
    /// IMAP host of a known provider
    pub fn provider_host(provider: &str) -> Option<&'static str> {
        match provider.trim().to_ascii_lowercase().as_str() {
            "gmail" | "google" => Some("imap.gmail.com"),
            "outlook" | "hotmail" | "office365" => Some("outlook.office365.com"),
            "icloud" => Some("imap.mail.me.com"),
            "ionos" => Some("imap.ionos.com"),
            "hostinger" => Some("imap.hostinger.com"),
            "yahoo" => Some("imap.mail.yahoo.com"),
            _ => None,
        }
    }
}

impl ServerResolver for ProviderResolver {
    fn resolve(&self, address: &str, hints: &ServerHints) -> ImapResult<ServerTarget> {
        let port = hints.port.unwrap_or(IMAPS_PORT);

        if let Some(host) = hints.host.as_deref().filter(|h| !h.trim().is_empty()) {
            return Ok(ServerTarget::new(host.trim(), port));
        }

        if let Some(host) = hints.provider.as_deref().and_then(Self::provider_host) {
            return Ok(ServerTarget::new(host, port));
        }

        let domain = address
            .rsplit_once('@')
            .map(|(_, domain)| domain.trim())
            .filter(|domain| !domain.is_empty())
            .ok_or_else(|| ImapError::InvalidAddress(address.to_string()))?;

        Ok(ServerTarget::new(format!("imap.{}", domain.to_ascii_lowercase()), port))
    }
}

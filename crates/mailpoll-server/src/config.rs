//! Command line and environment configuration

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use mailpoll_auth::{GmailTokenFetcher, TokenServiceConfig};
use mailpoll_core::PollService;
use mailpoll_imap::{Authenticator, ConnectorConfig, ProviderResolver, TlsConnector};

/// mailpoll HTTP server
#[derive(Debug, Clone, Parser)]
#[command(name = "mailpoll", version, about = "Mailbox polling with IMAP XOAUTH2 and password login")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "MAILPOLL_BIND", default_value = "0.0.0.0:5000")]
    pub bind: SocketAddr,

    /// Supabase project URL hosting the get-gmail-token function
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: String,

    /// Supabase anon key sent as `apikey`
    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    pub supabase_anon_key: String,

    /// IMAP connect and TLS handshake timeout in seconds, 0 disables it
    #[arg(long, env = "MAILPOLL_IMAP_CONNECT_TIMEOUT", default_value_t = 30)]
    pub imap_connect_timeout: u64,
}

impl Config {
    pub fn token_service(&self) -> TokenServiceConfig {
        TokenServiceConfig::from_supabase_url(&self.supabase_url, self.supabase_anon_key.clone())
    }

    pub fn connector(&self) -> ConnectorConfig {
        ConnectorConfig {
            connect_timeout: (self.imap_connect_timeout > 0)
                .then(|| Duration::from_secs(self.imap_connect_timeout)),
        }
    }

    /// Build the request handler described by this configuration
    pub fn poll_service(&self) -> anyhow::Result<PollService> {
        let tokens = GmailTokenFetcher::new(self.token_service())?;
        let authenticator = Authenticator::new(TlsConnector::new(self.connector()), ProviderResolver);
        Ok(PollService::new(authenticator, tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from([
            "mailpoll",
            "--supabase-url",
            "https://abc.supabase.co",
            "--supabase-anon-key",
            "anon",
        ])
        .unwrap();

        assert_eq!(config.bind, "0.0.0.0:5000".parse().unwrap());
        assert_eq!(config.connector().connect_timeout, Some(Duration::from_secs(30)));
        assert_eq!(
            config.token_service().endpoint(),
            "https://abc.supabase.co/functions/v1/get-gmail-token"
        );
    }

    #[test]
    fn test_zero_timeout_disables_it() {
        let config = Config::try_parse_from([
            "mailpoll",
            "--bind",
            "127.0.0.1:8080",
            "--supabase-url",
            "https://abc.supabase.co",
            "--supabase-anon-key",
            "anon",
            "--imap-connect-timeout",
            "0",
        ])
        .unwrap();

        assert_eq!(config.bind.port(), 8080);
        assert!(config.connector().connect_timeout.is_none());
    }
}

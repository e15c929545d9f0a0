//! Transport used to reach the IMAP server

use std::fmt;
use std::time::Duration;

use async_std::net::TcpStream;
use async_trait::async_trait;
use futures::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::{ImapError, ImapResult, ServerTarget};

/// Opens the byte stream an IMAP client talks over
#[async_trait]
pub trait Connector: Send + Sync {
    /// Stream handed to async-imap
    type Stream: AsyncRead + AsyncWrite + Unpin + fmt::Debug + Send;

    /// Open a connection to `target`
    async fn connect(&self, target: &ServerTarget) -> ImapResult<Self::Stream>;
}

/// Connector settings
#[derive(Debug, Clone, Default)]
pub struct ConnectorConfig {
    /// Upper bound for TCP connect plus TLS handshake; `None` leaves it to the OS
    pub connect_timeout: Option<Duration>,
}

/// Implicit-TLS connector (IMAPS, usually port 993)
#[derive(Debug, Clone, Default)]
pub struct TlsConnector {
    config: ConnectorConfig,
}

impl TlsConnector {
    pub fn new(config: ConnectorConfig) -> Self {
        Self { config }
    }

    async fn open(&self, target: &ServerTarget) -> ImapResult<async_native_tls::TlsStream<TcpStream>> {
        let tcp_stream = TcpStream::connect((target.host.as_str(), target.port))
            .await
            .map_err(|e| ImapError::ConnectionFailed(format!("{}: {}", target, e)))?;

        let tls_stream = async_native_tls::TlsConnector::new()
            .connect(&target.host, tcp_stream)
            .await
            .map_err(|e| ImapError::ConnectionFailed(format!("TLS handshake with {}: {}", target, e)))?;

        debug!("TLS connection established with {}", target);
        Ok(tls_stream)
    }
}

#[async_trait]
impl Connector for TlsConnector {
    type Stream = async_native_tls::TlsStream<TcpStream>;

    async fn connect(&self, target: &ServerTarget) -> ImapResult<Self::Stream> {
        match self.config.connect_timeout {
            Some(limit) => async_std::future::timeout(limit, self.open(target))
                .await
                .map_err(|_| {
                    ImapError::ConnectionFailed(format!("{}: timed out after {:?}", target, limit))
                })?,
            None => self.open(target).await,
        }
    }
}

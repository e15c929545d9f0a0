//! Opens authenticated IMAP sessions with XOAUTH2 or LOGIN

use async_imap::Session;
use tracing::{debug, error, info};

use crate::{
    Connector, ImapError, ImapResult, ProviderResolver, ServerHints, ServerResolver, ServerTarget,
    TlsConnector, XOAuth2Authenticator,
};

/// An authenticated IMAP session; the caller is responsible for logging out
pub type MailSession<S> = Session<S>;

/// Substrings of a failed XOAUTH2 exchange that point at a rejected token
const TOKEN_REJECTION_MARKERS: [&str; 2] = ["AUTHENTICATE", "SASL"];

/// Password and/or OAuth2 access token for a mailbox
///
/// Empty strings count as absent. When both are set the token is used.
#[derive(Clone, Default)]
pub struct Credentials {
    password: Option<String>,
    oauth_token: Option<String>,
}

/// The mechanism selected from a set of credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod<'a> {
    XOAuth2 { access_token: &'a str },
    Login { password: &'a str },
}

impl Credentials {
    pub fn new(password: Option<String>, oauth_token: Option<String>) -> Self {
        Self {
            password: password.filter(|p| !p.is_empty()),
            oauth_token: oauth_token.filter(|t| !t.is_empty()),
        }
    }

    pub fn password(password: impl Into<String>) -> Self {
        Self::new(Some(password.into()), None)
    }

    pub fn oauth_token(access_token: impl Into<String>) -> Self {
        Self::new(None, Some(access_token.into()))
    }

    /// Pick the mechanism to use, token first
    pub fn method(&self) -> ImapResult<AuthMethod<'_>> {
        if let Some(access_token) = self.oauth_token.as_deref() {
            Ok(AuthMethod::XOAuth2 { access_token })
        } else if let Some(password) = self.password.as_deref() {
            Ok(AuthMethod::Login { password })
        } else {
            Err(ImapError::MissingCredentials)
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("oauth_token", &self.oauth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Describe a failed XOAUTH2 exchange
///
/// Tagged NO/BAD replies are server rejections of the AUTHENTICATE command
/// and are prefixed accordingly; anything else keeps its own text.
fn describe_xoauth2_failure(err: &async_imap::error::Error) -> String {
    use async_imap::error::Error;

    match err {
        Error::No(text) | Error::Bad(text) => {
            format!("AUTHENTICATE XOAUTH2 rejected: {}", text)
        }
        other => other.to_string(),
    }
}

/// Classify the text of a failed XOAUTH2 exchange
pub fn classify_xoauth2_failure(message: impl Into<String>) -> ImapError {
    let message = message.into();
    if TOKEN_REJECTION_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
    {
        ImapError::TokenExpiredOrInvalid(message)
    } else {
        ImapError::AuthProtocol(message)
    }
}

/// Opens authenticated IMAP sessions
///
/// Holds no per-call state; one instance can serve concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct Authenticator<C = TlsConnector, R = ProviderResolver> {
    connector: C,
    resolver: R,
}

impl<C: Connector, R: ServerResolver> Authenticator<C, R> {
    pub fn new(connector: C, resolver: R) -> Self {
        Self {
            connector,
            resolver,
        }
    }

    /// Resolve the server for `address` and authenticate against it
    pub async fn connect(
        &self,
        address: &str,
        hints: &ServerHints,
        credentials: &Credentials,
    ) -> ImapResult<MailSession<C::Stream>> {
        credentials.method()?;
        let target = self.resolver.resolve(address, hints)?;
        self.authenticate(address, &target, credentials).await
    }

    /// Connect to `target` and authenticate as `address`
    pub async fn authenticate(
        &self,
        address: &str,
        target: &ServerTarget,
        credentials: &Credentials,
    ) -> ImapResult<MailSession<C::Stream>> {
        let method = credentials.method()?;

        info!("Connecting to {} for {}", target, address);
        let stream = self.connector.connect(target).await?;
        let mut client = async_imap::Client::new(stream);

        // authenticate() does not skip the greeting on its own
        let greeting = client
            .read_response()
            .await
            .transpose()
            .map_err(|e| ImapError::ConnectionFailed(format!("reading greeting: {}", e)))?
            .ok_or_else(|| {
                ImapError::ConnectionFailed("connection closed before greeting".to_string())
            })?;
        debug!("Greeting: {:?}", greeting.parsed());

        match method {
            AuthMethod::XOAuth2 { access_token } => {
                info!(
                    "Authenticating with XOAUTH2 for {} (token length: {})",
                    address,
                    access_token.len()
                );
                let auth = XOAuth2Authenticator::new(address, access_token);
                let session = client.authenticate("XOAUTH2", auth).await.map_err(|(e, _)| {
                    let message = describe_xoauth2_failure(&e);
                    error!("XOAUTH2 authentication failed for {}: {}", address, message);
                    classify_xoauth2_failure(message)
                })?;
                info!("XOAUTH2 authentication successful for {}", address);
                Ok(session)
            }
            AuthMethod::Login { password } => {
                info!("Authenticating with LOGIN for {}", address);
                let session = client
                    .login(address, password)
                    .await
                    .map_err(|(e, _)| {
                        error!("LOGIN failed for {}: {}", address, e);
                        ImapError::InvalidCredentials(e.to_string())
                    })?;
                info!("LOGIN authentication successful for {}", address);
                Ok(session)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeImapServer, PlainConnector, Script};

    #[test]
    fn test_method_precedence() {
        let both = Credentials::new(Some("secret".to_string()), Some("ya29.token".to_string()));
        assert_eq!(
            both.method().unwrap(),
            AuthMethod::XOAuth2 {
                access_token: "ya29.token"
            }
        );

        let password = Credentials::password("secret");
        assert_eq!(
            password.method().unwrap(),
            AuthMethod::Login { password: "secret" }
        );

        let empty_token = Credentials::new(Some("secret".to_string()), Some(String::new()));
        assert_eq!(
            empty_token.method().unwrap(),
            AuthMethod::Login { password: "secret" }
        );
    }

    #[test]
    fn test_missing_credentials() {
        assert!(matches!(
            Credentials::default().method(),
            Err(ImapError::MissingCredentials)
        ));
        assert!(matches!(
            Credentials::new(Some(String::new()), Some(String::new())).method(),
            Err(ImapError::MissingCredentials)
        ));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = Credentials::new(Some("hunter2".to_string()), Some("ya29.token".to_string()));
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("ya29.token"));
    }

    #[test]
    fn test_classification() {
        let err = classify_xoauth2_failure("[AUTHENTICATIONFAILED] SASL authentication failed");
        assert!(matches!(err, ImapError::TokenExpiredOrInvalid(ref m) if m.contains("SASL")));

        let err = classify_xoauth2_failure("AUTHENTICATE command error: BAD");
        assert!(err.is_token_rejection());

        let err = classify_xoauth2_failure("connection lost");
        assert!(matches!(err, ImapError::AuthProtocol(ref m) if m == "connection lost"));

        // Matching is case-sensitive, as upstream servers use upper case
        let err = classify_xoauth2_failure("sasl mechanism unavailable");
        assert!(matches!(err, ImapError::AuthProtocol(_)));
    }

    #[async_std::test]
    async fn test_missing_credentials_opens_no_connection() {
        let connector = PlainConnector::default();
        let authenticator = Authenticator::new(connector.clone(), ProviderResolver);

        let err = authenticator
            .authenticate(
                "user@example.com",
                &ServerTarget::new("127.0.0.1", 9),
                &Credentials::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ImapError::MissingCredentials));

        let err = authenticator
            .connect("user@example.com", &ServerHints::default(), &Credentials::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ImapError::MissingCredentials));

        assert_eq!(connector.attempts(), 0);
    }

    #[async_std::test]
    async fn test_xoauth2_success_sends_exact_initial_response() {
        let server = FakeImapServer::start(Script::AcceptXOAuth2).await;
        let authenticator = Authenticator::new(PlainConnector::default(), ProviderResolver);

        let session = authenticator
            .authenticate(
                "user@gmail.com",
                &server.target(),
                &Credentials::oauth_token("ya29.valid"),
            )
            .await
            .unwrap();
        drop(session);

        let expected = XOAuth2Authenticator::new("user@gmail.com", "ya29.valid").encoded();
        let commands = server.commands();
        assert!(commands[0].ends_with("AUTHENTICATE XOAUTH2"));
        assert_eq!(commands[1], expected);
    }

    #[async_std::test]
    async fn test_token_wins_over_password() {
        let server = FakeImapServer::start(Script::AcceptXOAuth2).await;
        let authenticator = Authenticator::new(PlainConnector::default(), ProviderResolver);

        let credentials =
            Credentials::new(Some("secret".to_string()), Some("ya29.valid".to_string()));
        authenticator
            .authenticate("user@gmail.com", &server.target(), &credentials)
            .await
            .unwrap();

        let commands = server.commands();
        assert!(commands.iter().all(|c| !c.contains("LOGIN")));
        assert!(commands[0].contains("AUTHENTICATE XOAUTH2"));
    }

    #[async_std::test]
    async fn test_rejected_token_is_reclassified() {
        let server = FakeImapServer::start(Script::RejectXOAuth2).await;
        let authenticator = Authenticator::new(PlainConnector::default(), ProviderResolver);

        let err = authenticator
            .authenticate(
                "user@gmail.com",
                &server.target(),
                &Credentials::oauth_token("ya29.expired"),
            )
            .await
            .unwrap_err();

        match err {
            ImapError::TokenExpiredOrInvalid(message) => {
                assert!(message.contains("Invalid credentials"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        // The error-details challenge is answered with an empty line
        let commands = server.commands();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[2], "");
    }

    #[async_std::test]
    async fn test_dropped_connection_is_protocol_error() {
        let server = FakeImapServer::start(Script::HangUpAfterResponse).await;
        let authenticator = Authenticator::new(PlainConnector::default(), ProviderResolver);

        let err = authenticator
            .authenticate(
                "user@gmail.com",
                &server.target(),
                &Credentials::oauth_token("ya29.valid"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ImapError::AuthProtocol(_)), "{:?}", err);
    }

    #[async_std::test]
    async fn test_login_success_and_rejection() {
        let server = FakeImapServer::start(Script::AcceptLogin).await;
        let authenticator = Authenticator::new(PlainConnector::default(), ProviderResolver);

        authenticator
            .authenticate("user@ionos.fr", &server.target(), &Credentials::password("secret"))
            .await
            .unwrap();
        assert!(server.commands()[0].contains("LOGIN"));

        let server = FakeImapServer::start(Script::RejectLogin).await;
        let err = authenticator
            .authenticate("user@ionos.fr", &server.target(), &Credentials::password("wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImapError::InvalidCredentials(_)));
        assert!(err.is_auth_failure());
    }

    #[async_std::test]
    async fn test_unreachable_server() {
        let connector = PlainConnector::default();
        let authenticator = Authenticator::new(connector.clone(), ProviderResolver);

        // Bind then drop to get a port nobody listens on
        let listener = async_std::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = authenticator
            .authenticate(
                "user@example.com",
                &ServerTarget::new("127.0.0.1", port),
                &Credentials::password("secret"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ImapError::ConnectionFailed(_)));
        assert_eq!(connector.attempts(), 1);
    }

    #[async_std::test]
    async fn test_connect_uses_resolver_hints() {
        let server = FakeImapServer::start(Script::AcceptLogin).await;
        let authenticator = Authenticator::new(PlainConnector::default(), ProviderResolver);
        let target = server.target();

        let hints = ServerHints {
            host: Some(target.host.clone()),
            port: Some(target.port),
            provider: Some("gmail".to_string()),
        };
        authenticator
            .connect("user@gmail.com", &hints, &Credentials::password("secret"))
            .await
            .unwrap();
    }
}

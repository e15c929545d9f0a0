//! Request handling for mailbox polling and token retrieval

use mailpoll_auth::{gmail, GmailTokenFetcher, TokenResponse, TokenSource};
use mailpoll_imap::{
    unseen_uids, Authenticator, Connector, Credentials, ProviderResolver, ServerHints,
    ServerResolver, TlsConnector,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{CoreError, CoreResult};

/// Folder checked for unseen messages
pub const INBOX: &str = "INBOX";

/// Body of a poll request
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "oauth_token")]
    pub oauth_token: Option<String>,
    /// Identity token used to fetch a Gmail token when none is given
    pub user_jwt: Option<String>,
    pub provider: Option<String>,
    pub imap_server: Option<String>,
    pub imap_port: Option<u16>,
}

impl std::fmt::Debug for PollRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollRequest")
            .field("email", &self.email)
            .field("password", &self.password.is_some())
            .field("oauth_token", &self.oauth_token.is_some())
            .field("user_jwt", &self.user_jwt.is_some())
            .field("provider", &self.provider)
            .field("imap_server", &self.imap_server)
            .field("imap_port", &self.imap_port)
            .finish()
    }
}

/// Body of a token request
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub user_jwt: Option<String>,
}

/// Result of a successful poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollResponse {
    pub status: &'static str,
    /// Number of unseen messages in the inbox
    pub count: usize,
    /// Their UIDs
    pub uids: Vec<u32>,
}

impl PollResponse {
    fn success(uids: Vec<u32>) -> Self {
        Self {
            status: "success",
            count: uids.len(),
            uids,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Handles poll and token requests
///
/// Stateless apart from its configuration; share it behind an `Arc`.
pub struct PollService<C = TlsConnector, R = ProviderResolver, T = GmailTokenFetcher> {
    authenticator: Authenticator<C, R>,
    tokens: T,
}

impl<C, R, T> PollService<C, R, T>
where
    C: Connector,
    R: ServerResolver,
    T: TokenSource,
{
    pub fn new(authenticator: Authenticator<C, R>, tokens: T) -> Self {
        Self {
            authenticator,
            tokens,
        }
    }

    /// Pick the OAuth2 token for a request, fetching one for Gmail when only
    /// an identity token was given
    pub async fn resolve_oauth_token(
        &self,
        provider: Option<&str>,
        oauth_token: Option<String>,
        user_jwt: Option<&str>,
    ) -> CoreResult<Option<String>> {
        if provider != Some(gmail::PROVIDER) || oauth_token.is_some() {
            return Ok(oauth_token);
        }

        let Some(user_jwt) = user_jwt else {
            return Ok(None);
        };

        let token = self.tokens.fetch_valid_token(user_jwt).await.map_err(|e| {
            error!("Automatic Gmail token retrieval failed: {}", e);
            e
        })?;
        info!(
            "Gmail token fetched automatically for {}",
            token.email.as_deref().unwrap_or("<unknown>")
        );
        Ok(Some(token.access_token))
    }

    /// Authenticate to the mailbox and count unseen messages in the inbox
    pub async fn poll(&self, request: PollRequest) -> CoreResult<PollResponse> {
        let email = non_empty(request.email).ok_or(CoreError::MissingInput("email"))?;
        let provider = non_empty(request.provider).map(|p| p.to_lowercase());
        let user_jwt = non_empty(request.user_jwt);

        let oauth_token = self
            .resolve_oauth_token(
                provider.as_deref(),
                non_empty(request.oauth_token),
                user_jwt.as_deref(),
            )
            .await?;

        if provider.as_deref() == Some(gmail::PROVIDER) && oauth_token.is_some() && user_jwt.is_none() {
            warn!("Gmail token supplied without userJwt for {}, it may expire", email);
        }

        let credentials = Credentials::new(request.password, oauth_token);
        let hints = ServerHints {
            host: request.imap_server,
            port: request.imap_port,
            provider,
        };

        let mut session = self.authenticator.connect(&email, &hints, &credentials).await?;

        let unseen = match unseen_uids(&mut session, INBOX).await {
            Ok(unseen) => unseen,
            Err(e) => {
                if let Err(logout) = session.logout().await {
                    warn!("Logout from {} failed: {}", email, logout);
                }
                return Err(e.into());
            }
        };

        if let Err(e) = session.logout().await {
            warn!("Logout from {} failed: {}", email, e);
        }

        info!("{} unseen messages in {} for {}", unseen.uids.len(), INBOX, email);
        Ok(PollResponse::success(unseen.uids))
    }

    /// Fetch a valid Gmail token for the caller
    ///
    /// Token service failures are reported as [`CoreError::TokenService`].
    pub async fn token(&self, request: TokenRequest) -> CoreResult<TokenResponse> {
        let user_jwt = non_empty(request.user_jwt).ok_or(CoreError::MissingInput("userJwt"))?;
        self.tokens
            .fetch_valid_token(&user_jwt)
            .await
            .map_err(CoreError::TokenService)
    }
}

//! Client for the `get-gmail-token` edge function
//!
//! The function looks up the Gmail tokens linked to the caller's identity
//! token, refreshes the access token when it is close to expiry and returns
//! a currently valid one.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::{AuthError, AuthResult};

/// Request timeout used unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Token service configuration
#[derive(Clone)]
pub struct TokenServiceConfig {
    /// Base URL of the edge functions, e.g. `https://<project>.supabase.co/functions/v1`
    pub functions_url: String,
    /// Value of the `apikey` header
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
}

impl TokenServiceConfig {
    pub fn new(functions_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            functions_url: functions_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Configuration for a Supabase project URL
    pub fn from_supabase_url(project_url: &str, api_key: impl Into<String>) -> Self {
        Self::new(
            format!("{}/functions/v1", project_url.trim_end_matches('/')),
            api_key,
        )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL of the token endpoint
    pub fn endpoint(&self) -> String {
        format!("{}/get-gmail-token", self.functions_url)
    }
}

impl std::fmt::Debug for TokenServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenServiceConfig")
            .field("functions_url", &self.functions_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A valid Gmail access token as returned by the token service
///
/// Only `access_token` is required. The other fields are read leniently for
/// logging, and the body is kept as received so it can be relayed unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenResponse {
    /// OAuth2 access token for XOAUTH2
    pub access_token: String,
    /// Gmail address the token belongs to
    pub email: Option<String>,
    /// Expiry as sent by the service, normally an ISO 8601 timestamp
    pub token_expiry: Option<String>,
    /// Seconds left until expiry at the time of the response
    pub expires_in_seconds: Option<i64>,
    /// Whether the service refreshed the token for this call
    pub was_refreshed: bool,
    body: String,
}

impl TokenResponse {
    /// Parse a success body from the token service
    pub fn from_body(body: impl Into<String>) -> AuthResult<Self> {
        let body = body.into();
        let fields: Map<String, Value> = serde_json::from_str(&body)
            .map_err(|e| AuthError::TokenFetchFailed(format!("invalid token response: {}", e)))?;

        let access_token = fields
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AuthError::TokenFetchFailed("invalid token response: no access_token".to_string())
            })?
            .to_string();
        let text = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);

        Ok(Self {
            access_token,
            email: text("email"),
            token_expiry: text("token_expiry"),
            expires_in_seconds: fields.get("expires_in_seconds").and_then(Value::as_i64),
            was_refreshed: fields
                .get("was_refreshed")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            body,
        })
    }

    /// The response body exactly as the service sent it
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Expiry instant, when `token_expiry` is an RFC 3339 timestamp
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.token_expiry
            .as_deref()
            .and_then(|expiry| DateTime::parse_from_rfc3339(expiry).ok())
            .map(|expiry| expiry.with_timezone(&Utc))
    }
}

/// Anything that can hand out a valid Gmail access token for an identity token
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_valid_token(&self, identity_token: &str) -> AuthResult<TokenResponse>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Fetches Gmail access tokens from the token service
///
/// One POST per call; nothing is cached or retried.
#[derive(Debug, Clone)]
pub struct GmailTokenFetcher {
    client: reqwest::Client,
    config: TokenServiceConfig,
}

impl GmailTokenFetcher {
    pub fn new(config: TokenServiceConfig) -> AuthResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthError::InvalidConfig(format!("HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl TokenSource for GmailTokenFetcher {
    async fn fetch_valid_token(&self, identity_token: &str) -> AuthResult<TokenResponse> {
        let url = self.config.endpoint();
        info!("Fetching Gmail token from {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(identity_token)
            .header("apikey", &self.config.api_key)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| {
                error!("Network error while fetching Gmail token: {}", e);
                AuthError::TokenServiceUnreachable(e.to_string())
            })?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::TokenServiceUnreachable(e.to_string()))?;

        if status != StatusCode::OK {
            let message = is_json
                .then(|| serde_json::from_str::<ErrorBody>(&body).ok())
                .flatten()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            debug!("Token service answered {}: {}", status, message);

            return Err(if status == StatusCode::NOT_FOUND {
                AuthError::NoLinkedAccount(message)
            } else {
                AuthError::TokenFetchFailed(message)
            });
        }

        let token = TokenResponse::from_body(body)?;

        match (token.expires_in_seconds, token.expires_at()) {
            (Some(seconds), _) => info!(
                "Gmail token retrieved for {}, expires in {} seconds",
                token.email.as_deref().unwrap_or("<unknown>"),
                seconds
            ),
            (None, Some(at)) => info!("Gmail token retrieved, expires at {}", at),
            (None, None) => info!("Gmail token retrieved, expiry unknown"),
        }
        if token.was_refreshed {
            info!("Gmail token was refreshed by the token service");
        }

        Ok(token)
    }
}

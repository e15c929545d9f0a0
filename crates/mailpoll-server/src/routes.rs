//! HTTP routes

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use mailpoll_core::{CoreError, PollRequest, PollService, TokenRequest};
use serde_json::json;
use tracing::error;

type SharedService = Arc<PollService>;

/// Error reply with a JSON `{"error": ...}` body
struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self {
            status: StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

fn parse_body<T: serde::de::DeserializeOwned + Default>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: format!("Invalid JSON body: {}", e),
    })
}

async fn poll_emails(
    State(service): State<SharedService>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: PollRequest = parse_body(&body)?;
    let response = service.poll(request).await.map_err(|e| {
        error!("poll-emails failed: {}", e);
        ApiError::from(e)
    })?;
    Ok(Json(response))
}

async fn get_gmail_token(
    State(service): State<SharedService>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: TokenRequest = parse_body(&body)?;
    let token = service.token(request).await.map_err(|e| {
        error!("get-gmail-token failed: {}", e);
        ApiError::from(e)
    })?;
    Ok(([(header::CONTENT_TYPE, "application/json")], token.body().to_string()))
}

pub fn router(service: SharedService) -> Router {
    Router::new()
        .route("/poll-emails", post(poll_emails))
        .route("/get-gmail-token", post(get_gmail_token))
        .with_state(service)
}

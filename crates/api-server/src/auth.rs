use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::AppState;

#[cfg(test)]
#[path = "auth_tests.rs"]
mod auth_tests;

/// Keys are compared as fixed-length SHA-256 hex digests, never as raw strings.
pub(crate) fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// API key gate for mutating routes.
///
/// Accepts the key from `X-API-Key` or `Authorization: Bearer <key>`.
/// With no key configured the gate is open (development mode). A missing or
/// wrong key is rejected with 403 before the handler runs.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(expected_hash) = state.api_key_hash.as_deref() else {
        return Ok(next.run(request).await);
    };

    let api_key = extract_api_key(&headers)?;
    if hash_key(&api_key) != expected_hash {
        tracing::warn!(
            path = request.uri().path(),
            "Invalid API key attempted: {}",
            mask_api_key(&api_key)
        );
        return Err(AuthError::InvalidApiKey);
    }

    tracing::debug!("Valid API key: {}", mask_api_key(&api_key));
    Ok(next.run(request).await)
}

pub(crate) fn extract_api_key(headers: &HeaderMap) -> Result<String, AuthError> {
    if let Some(key) = headers.get("X-API-Key").and_then(|v| v.to_str().ok()) {
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }

    if let Some(auth) = headers.get("Authorization").and_then(|v| v.to_str().ok()) {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            if !token.is_empty() {
                return Ok(token.to_string());
            }
        }
    }

    Err(AuthError::MissingApiKey)
}

/// First and last four characters only.
pub(crate) fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[derive(Debug)]
pub enum AuthError {
    MissingApiKey,
    InvalidApiKey,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingApiKey => write!(f, "Missing API key"),
            AuthError::InvalidApiKey => write!(f, "Invalid API key"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingApiKey => {
                "Missing API key. Provide via X-API-Key header or Authorization: Bearer header."
            }
            AuthError::InvalidApiKey => "Invalid API key.",
        };

        (
            StatusCode::FORBIDDEN,
            Json(json!({
                "success": false,
                "error": message,
            })),
        )
            .into_response()
    }
}

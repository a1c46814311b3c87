use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{LlmError, LlmResult, OVERLOADED_STATUSES};

/// Backend-agnostic chat completion.
///
/// Implemented by the Anthropic and OpenAI HTTP clients; tests plug in
/// scripted models.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// One system + user exchange, returning the assistant's text.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> LlmResult<String>;

    fn backend_name(&self) -> &'static str;
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    OVERLOADED_STATUSES.contains(&status.as_u16())
}

fn map_send_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::RequestFailed(err)
    }
}

/// Send a request, retrying once after `backoff` when the backend reports it
/// is overloaded, and decode the JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    backoff: Duration,
    backend: &'static str,
) -> LlmResult<T> {
    let retry = request.try_clone();
    let mut response = request.send().await.map_err(map_send_error)?;

    if is_retryable(response.status()) {
        if let Some(retry) = retry {
            tracing::warn!(backend, status = %response.status(), "LLM backend busy, retrying once");
            tokio::time::sleep(backoff).await;
            response = retry.send().await.map_err(map_send_error)?;
        }
    }

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Backend {
            backend,
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        });
    }

    let bytes = response.bytes().await.map_err(map_send_error)?;
    serde_json::from_slice::<T>(&bytes)
        .map_err(|e| LlmError::InvalidResponse(format!("{} body: {}", backend, e)))
}

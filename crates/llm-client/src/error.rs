use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Non-2xx answer from the backend, after any retry.
    #[error("{backend} returned {status}: {message}")]
    Backend {
        backend: &'static str,
        status: u16,
        message: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("LLM request timed out")]
    Timeout,
}

/// Statuses a backend uses to say "busy, try later".
pub(crate) const OVERLOADED_STATUSES: [u16; 3] = [429, 503, 529];

impl LlmError {
    pub fn is_overloaded(&self) -> bool {
        matches!(self, LlmError::Backend { status, .. } if OVERLOADED_STATUSES.contains(status))
    }
}

pub type LlmResult<T> = Result<T, LlmError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Token not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type MarketDataResult<T> = Result<T, MarketDataError>;

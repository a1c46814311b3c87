use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("Invalid confidence: {0} (expected 0-100)")]
    InvalidConfidence(f64),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Invalid chain: {0}")]
    InvalidChain(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

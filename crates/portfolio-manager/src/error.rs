use thiserror::Error;

use crate::models::SignalStatus;

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("Cannot move signal from {from} to {to}")]
    InvalidTransition { from: SignalStatus, to: SignalStatus },

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

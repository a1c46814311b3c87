use agent_core::Chain;
use llm_client::LlmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("No market data found for {token} on {chain}")]
    NoMarketData { token: String, chain: Chain },

    #[error(transparent)]
    Llm(#[from] LlmError),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

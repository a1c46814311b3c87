use agent_core::{AgentConfig, Chain, Context, MarketData, SourceReport};
use analysis_orchestrator::{
    AnalysisMode, AnalysisOrchestrator, AnalysisReport, AnalysisRequest, BatchItem, QuickSignal,
    MAX_BATCH_TOKENS,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use llm_client::LlmProvider;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::validation::{validate_context, validate_token};
use crate::{orchestrator_err, validation_err, ApiResponse, AppError, AppState};

#[derive(Deserialize)]
pub struct AnalyzeBody {
    pub token: String,
    #[serde(default)]
    pub chain: Chain,
    #[serde(default)]
    pub mode: AnalysisMode,
    /// `anthropic`, `openai`, or `default`
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub context: Option<Context>,
}

#[derive(Deserialize)]
pub struct QuickSignalBody {
    pub token: String,
    #[serde(default)]
    pub chain: Chain,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Deserialize)]
pub struct BatchBody {
    pub tokens: Vec<String>,
    #[serde(default)]
    pub chain: Chain,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Deserialize)]
pub struct ChainQuery {
    #[serde(default)]
    pub chain: Chain,
}

#[derive(Serialize)]
pub struct MarketDataResponse {
    pub token: String,
    pub chain: Chain,
    pub data: MarketData,
    pub sources: Vec<SourceReport>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct BatchResponse {
    pub chain: Chain,
    pub requested: usize,
    pub results: Vec<BatchItem>,
}

#[derive(Serialize)]
pub struct AgentsResponse {
    pub count: usize,
    pub agents: Vec<AgentConfig>,
}

pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/quick-signal", post(quick_signal))
        .route("/analyze/batch", post(analyze_batch))
        .route("/market-data/:token", get(get_market_data))
        .route("/agents", get(list_agents))
}

pub fn analysis_protected_routes() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze))
}

/// Absent or `default` selects the configured default provider.
fn parse_provider(raw: Option<&str>) -> Result<Option<LlmProvider>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(p) if p.eq_ignore_ascii_case("default") => Ok(None),
        Some(p) => p.parse::<LlmProvider>().map(Some).map_err(AppError::bad_request),
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let providers: Vec<&'static str> = state
        .orchestrator
        .models()
        .configured()
        .iter()
        .map(|p| p.as_str())
        .collect();

    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "agents_available": AnalysisOrchestrator::agent_catalog().len(),
        "providers": providers,
        "repository": state.repos.backend(),
    }))
}

async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeBody>,
) -> Result<Json<ApiResponse<AnalysisReport>>, AppError> {
    validate_token(&body.token).map_err(validation_err)?;
    validate_context(body.context.as_ref()).map_err(validation_err)?;
    let provider = parse_provider(body.provider.as_deref())?;

    let request = AnalysisRequest {
        token: body.token,
        chain: body.chain,
        mode: body.mode,
        provider,
        context: body.context,
    };

    let report = state
        .orchestrator
        .analyze(&request)
        .await
        .map_err(orchestrator_err)?;

    Ok(Json(ApiResponse::success(report)))
}

async fn quick_signal(
    State(state): State<AppState>,
    Json(body): Json<QuickSignalBody>,
) -> Result<Json<ApiResponse<QuickSignal>>, AppError> {
    validate_token(&body.token).map_err(validation_err)?;
    let provider = parse_provider(body.provider.as_deref())?;

    let signal = state
        .orchestrator
        .quick_signal(&body.token, body.chain, provider)
        .await
        .map_err(orchestrator_err)?;

    Ok(Json(ApiResponse::success(signal)))
}

async fn analyze_batch(
    State(state): State<AppState>,
    Json(body): Json<BatchBody>,
) -> Result<Json<ApiResponse<BatchResponse>>, AppError> {
    if body.tokens.is_empty() {
        return Err(AppError::bad_request(anyhow::anyhow!("tokens must not be empty")));
    }
    for token in body.tokens.iter().take(MAX_BATCH_TOKENS) {
        validate_token(token).map_err(validation_err)?;
    }
    let provider = parse_provider(body.provider.as_deref())?;

    let results = state
        .orchestrator
        .quick_signal_batch(&body.tokens, body.chain, provider)
        .await;

    Ok(Json(ApiResponse::success(BatchResponse {
        chain: body.chain,
        requested: body.tokens.len(),
        results,
    })))
}

async fn get_market_data(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(query): Query<ChainQuery>,
) -> Result<Json<ApiResponse<MarketDataResponse>>, AppError> {
    validate_token(&token).map_err(validation_err)?;

    let snapshot = state.orchestrator.market_snapshot(&token, query.chain).await;
    if !snapshot.has_price() {
        return Err(AppError::not_found(format!(
            "No market data found for {} on {}",
            token, query.chain
        )));
    }

    Ok(Json(ApiResponse::success(MarketDataResponse {
        token,
        chain: snapshot.chain,
        data: snapshot.data,
        sources: snapshot.sources,
        fetched_at: snapshot.fetched_at,
    })))
}

async fn list_agents() -> Json<ApiResponse<AgentsResponse>> {
    let agents = AnalysisOrchestrator::agent_catalog();
    Json(ApiResponse::success(AgentsResponse {
        count: agents.len(),
        agents,
    }))
}

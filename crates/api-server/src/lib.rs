pub mod analysis_routes;
pub mod auth;
pub mod config;
pub mod portfolio_routes;
pub mod signal_routes;
pub mod validation;

use analysis_orchestrator::{AnalysisOrchestrator, OrchestratorError};
use axum::{
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use chrono::{DateTime, Utc};
use llm_client::{LlmConfig, LlmError, ModelRegistry};
use market_data::MarketDataClient;
use portfolio_manager::{PortfolioDb, RepoError, Repositories};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

pub use config::{Settings, TradingMode};
use validation::ValidationError;


/// Shared handler state. Cloned per request; everything inside is a handle.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub repos: Repositories,
    /// Starts at `TRADING_MODE`; changed in-process by `POST /mode`
    pub mode: Arc<RwLock<TradingMode>>,
    /// SHA-256 of the configured API key, if any
    pub api_key_hash: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(settings: Settings, orchestrator: AnalysisOrchestrator, repos: Repositories) -> Self {
        let api_key_hash = settings.api_key.as_deref().map(auth::hash_key);
        let mode = Arc::new(RwLock::new(settings.trading_mode));
        Self {
            settings: Arc::new(settings),
            orchestrator: Arc::new(orchestrator),
            repos,
            mode,
            api_key_hash,
            started_at: Utc::now(),
        }
    }

    pub async fn trading_mode(&self) -> TradingMode {
        *self.mode.read().await
    }
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Handler error: an HTTP status plus the underlying cause.
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn bad_request(error: impl Into<anyhow::Error>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, error.into())
    }

    pub fn not_found(message: impl std::fmt::Display) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, anyhow::anyhow!("{}", message))
    }

    pub fn forbidden(message: impl std::fmt::Display) -> Self {
        Self::with_status(StatusCode::FORBIDDEN, anyhow::anyhow!("{}", message))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.error);
        } else {
            tracing::debug!(status = self.status.as_u16(), "Request rejected: {}", self.error);
        }

        (
            self.status,
            Json(serde_json::json!({
                "success": false,
                "error": self.error.to_string(),
            })),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, err.into())
    }
}

pub(crate) fn validation_err(e: ValidationError) -> AppError {
    AppError::bad_request(e)
}

pub(crate) fn repo_err(context: &str, e: RepoError) -> AppError {
    match e {
        RepoError::NotFound(_) => AppError::with_status(StatusCode::NOT_FOUND, anyhow::anyhow!("{e}")),
        RepoError::Conflict(_) | RepoError::InvalidTransition { .. } => {
            AppError::with_status(StatusCode::CONFLICT, anyhow::anyhow!("{e}"))
        }
        other => AppError::with_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            anyhow::anyhow!("{context}: {other}"),
        ),
    }
}

pub(crate) fn orchestrator_err(e: OrchestratorError) -> AppError {
    match e {
        OrchestratorError::NoMarketData { .. } | OrchestratorError::Llm(LlmError::ProviderNotConfigured(_)) => {
            AppError::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!("{e}"))
        }
        other => AppError::with_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            anyhow::anyhow!("Analysis failed: {other}"),
        ),
    }
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ])
}

/// Full HTTP surface under `/api/v1`.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(analysis_routes::analysis_protected_routes())
        .merge(portfolio_routes::portfolio_protected_routes())
        .merge(signal_routes::signal_protected_routes())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let api = Router::new()
        .merge(analysis_routes::analysis_routes())
        .merge(portfolio_routes::portfolio_routes())
        .merge(signal_routes::signal_routes())
        .merge(protected);

    let cors = cors_layer(&state.settings);

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors),
        )
        .with_state(state)
}

async fn build_repositories(settings: &Settings) -> anyhow::Result<Repositories> {
    match settings.database_url.as_deref() {
        Some(url) => {
            let db = PortfolioDb::new(url).await?;
            Ok(Repositories::sqlite(&db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, positions and signals live in memory only");
            Ok(Repositories::in_memory())
        }
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    tracing::info!("Loaded settings: {:?}", settings);
    if settings.mode_approval_code.is_none() {
        tracing::warn!("MODE_APPROVAL_CODE not set: any code switches to micro, live stays locked");
    }

    let llm_config = LlmConfig::from_env()?;
    let models = ModelRegistry::from_config(&llm_config)?;
    if models.configured().is_empty() {
        tracing::warn!("No LLM provider configured, analysis routes will answer 400");
    }

    let market = MarketDataClient::with_defaults()?;
    let orchestrator = AnalysisOrchestrator::new(Arc::new(market), models);
    let repos = build_repositories(&settings).await?;

    if settings.api_key.is_none() {
        tracing::warn!("HEDGE_DESK_API_KEY not set, protected routes are open");
    }

    let addr = format!("{}:{}", settings.host, settings.port);
    let state = AppState::new(settings, orchestrator, repos);
    let app = build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        mode = %state.trading_mode().await,
        repository = state.repos.backend(),
        "hedge-desk listening on {}",
        addr
    );

    axum::serve(listener, app).await?;
    Ok(())
}

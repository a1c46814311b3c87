use agent_core::Chain;
use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use portfolio_manager::{NewPosition, Position, PositionChange, Trade};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::analysis_routes::ChainQuery;
use crate::auth::hash_key;
use crate::validation::validate_token;
use crate::{repo_err, validation_err, ApiResponse, AppError, AppState, TradingMode};

fn default_size() -> f64 {
    100.0
}

#[derive(Deserialize)]
pub struct OpenPositionBody {
    pub token: String,
    #[serde(default)]
    pub chain: Chain,
    /// USD notional
    #[serde(default = "default_size")]
    pub size: f64,
    pub entry_price: f64,
}

#[derive(Deserialize)]
pub struct UpdatePriceBody {
    #[serde(default)]
    pub chain: Chain,
    pub current_price: f64,
}

#[derive(Deserialize)]
pub struct SetModeBody {
    pub mode: TradingMode,
    #[serde(default)]
    pub approval_code: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    pub max_position_size: f64,
    pub daily_loss_limit: f64,
    pub require_approval: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub mode: TradingMode,
    pub positions: usize,
    pub pnl_today: f64,
    pub total_pnl: f64,
    pub trades_today: usize,
    pub started_at: DateTime<Utc>,
    pub limits: Limits,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeResponse {
    pub mode: TradingMode,
    pub require_approval: bool,
    pub live_trading_enabled: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeChange {
    pub previous_mode: TradingMode,
    pub new_mode: TradingMode,
    pub message: String,
}

#[derive(Serialize)]
pub struct TradesToday {
    pub count: usize,
    pub trades: Vec<Trade>,
    pub pnl: f64,
}

pub fn portfolio_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/positions", get(get_positions))
        .route("/treasury", get(get_treasury))
        .route("/mode", get(get_mode))
        .route("/trades/today", get(get_trades_today))
}

pub fn portfolio_protected_routes() -> Router<AppState> {
    Router::new()
        .route("/positions", post(open_position))
        .route("/positions/:token/price", put(update_price))
        .route("/positions/:token", delete(close_position))
        .route("/mode", post(set_mode))
}

async fn get_status(State(state): State<AppState>) -> Result<Json<ApiResponse<StatusResponse>>, AppError> {
    let repos = &state.repos;
    let positions = repos
        .positions
        .list_open()
        .await
        .map_err(|e| repo_err("Failed to list positions", e))?;
    let trades = repos
        .trades
        .list_today()
        .await
        .map_err(|e| repo_err("Failed to list trades", e))?;
    let today = repos.stats.today().await.map_err(|e| repo_err("Failed to read stats", e))?;
    let total_pnl = repos
        .stats
        .total_pnl()
        .await
        .map_err(|e| repo_err("Failed to read stats", e))?;

    Ok(Json(ApiResponse::success(StatusResponse {
        mode: state.trading_mode().await,
        positions: positions.len(),
        pnl_today: today.pnl,
        total_pnl,
        trades_today: trades.len(),
        started_at: state.started_at,
        limits: Limits {
            max_position_size: state.settings.max_position_size_usd,
            daily_loss_limit: state.settings.daily_loss_limit_usd,
            require_approval: state.settings.require_approval,
        },
    })))
}

async fn get_positions(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Position>>>, AppError> {
    let positions = state
        .repos
        .positions
        .list_open()
        .await
        .map_err(|e| repo_err("Failed to list positions", e))?;
    Ok(Json(ApiResponse::success(positions)))
}

/// Paper position: opens it with its opening trade and counts the trade.
async fn open_position(
    State(state): State<AppState>,
    Json(body): Json<OpenPositionBody>,
) -> Result<Json<ApiResponse<PositionChange>>, AppError> {
    validate_token(&body.token).map_err(validation_err)?;

    let mode = state.trading_mode().await;
    if mode == TradingMode::Live && !state.settings.enable_live_trading {
        return Err(AppError::forbidden("Live trading is disabled"));
    }

    let max_size = state.settings.max_position_size_usd;
    if !body.size.is_finite() || body.size <= 0.0 {
        return Err(AppError::bad_request(anyhow::anyhow!("Position size must be positive")));
    }
    if body.size > max_size {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "Position size ${} exceeds limit ${}",
            body.size,
            max_size
        )));
    }
    if !body.entry_price.is_finite() || body.entry_price <= 0.0 {
        return Err(AppError::bad_request(anyhow::anyhow!("Entry price must be positive")));
    }

    let change = state
        .repos
        .positions
        .create(NewPosition {
            token: body.token,
            chain: body.chain,
            size: body.size,
            entry_price: body.entry_price,
        })
        .await
        .map_err(|e| repo_err("Failed to open position", e))?;
    let position = &change.position;

    state
        .repos
        .stats
        .increment_trades()
        .await
        .map_err(|e| repo_err("Failed to update stats", e))?;

    tracing::info!(
        token = position.token.as_str(),
        chain = %position.chain,
        size = position.size,
        mode = %mode,
        "Opened position at {}",
        position.entry_price
    );

    Ok(Json(ApiResponse::success(change)))
}

async fn update_price(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(body): Json<UpdatePriceBody>,
) -> Result<Json<ApiResponse<Position>>, AppError> {
    validate_token(&token).map_err(validation_err)?;
    if !body.current_price.is_finite() || body.current_price <= 0.0 {
        return Err(AppError::bad_request(anyhow::anyhow!("Current price must be positive")));
    }

    let position = state
        .repos
        .positions
        .update_price(&token, body.chain, body.current_price)
        .await
        .map_err(|e| repo_err("Failed to update position", e))?;

    tracing::debug!(
        token = position.token.as_str(),
        pnl = position.pnl,
        pnl_percent = position.pnl_percent,
        "Position repriced"
    );

    Ok(Json(ApiResponse::success(position)))
}

/// Closes at the last known price with its closing trade and books the P&L to today.
async fn close_position(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(query): Query<ChainQuery>,
) -> Result<Json<ApiResponse<PositionChange>>, AppError> {
    validate_token(&token).map_err(validation_err)?;

    let change = state
        .repos
        .positions
        .close(&token, query.chain)
        .await
        .map_err(|e| repo_err("Failed to close position", e))?;
    let position = &change.position;

    state
        .repos
        .stats
        .add_pnl(position.pnl)
        .await
        .map_err(|e| repo_err("Failed to update stats", e))?;
    state
        .repos
        .stats
        .increment_trades()
        .await
        .map_err(|e| repo_err("Failed to update stats", e))?;

    tracing::info!(
        token = position.token.as_str(),
        chain = %position.chain,
        pnl = position.pnl,
        "Closed position"
    );

    Ok(Json(ApiResponse::success(change)))
}

/// No wallet is connected, so balances are zero and allocations are targets.
async fn get_treasury() -> Json<ApiResponse<Value>> {
    Json(ApiResponse::success(json!({
        "totalUsd": 0.0,
        "runway": "N/A - Connect wallet for real data",
        "allocations": {
            "trading": 0.40,
            "operations": 0.30,
            "growth": 0.20,
            "reserve": 0.10,
        },
        "expenses": [
            {"name": "LLM API", "amount": 200, "frequency": "monthly"},
            {"name": "RPC provider", "amount": 50, "frequency": "monthly"},
            {"name": "Hosting", "amount": 20, "frequency": "monthly"},
        ],
    })))
}

async fn get_mode(State(state): State<AppState>) -> Json<ApiResponse<ModeResponse>> {
    Json(ApiResponse::success(ModeResponse {
        mode: state.trading_mode().await,
        require_approval: state.settings.require_approval,
        live_trading_enabled: state.settings.enable_live_trading,
    }))
}

/// Switches the in-process mode. Not persisted across restarts.
async fn set_mode(
    State(state): State<AppState>,
    Json(body): Json<SetModeBody>,
) -> Result<Json<ApiResponse<ModeChange>>, AppError> {
    if body.mode.needs_approval() {
        let Some(code) = body.approval_code.as_deref().filter(|c| !c.trim().is_empty()) else {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Approval code required for micro/live mode"
            )));
        };
        match state.settings.mode_approval_code.as_deref() {
            Some(expected) if hash_key(code) != hash_key(expected) => {
                tracing::warn!(requested = %body.mode, "Rejected mode change: bad approval code");
                return Err(AppError::forbidden("Invalid approval code"));
            }
            Some(_) => {}
            // without a configured code there is nothing to check live against
            None if body.mode == TradingMode::Live => {
                tracing::warn!("Rejected switch to live mode: MODE_APPROVAL_CODE is not set");
                return Err(AppError::forbidden("Live mode requires MODE_APPROVAL_CODE to be configured"));
            }
            None => {}
        }
    }

    let previous_mode = {
        let mut mode = state.mode.write().await;
        std::mem::replace(&mut *mode, body.mode)
    };

    tracing::warn!(from = %previous_mode, to = %body.mode, "Trading mode changed");

    Ok(Json(ApiResponse::success(ModeChange {
        previous_mode,
        new_mode: body.mode,
        message: format!(
            "Mode changed to '{}'. Set TRADING_MODE to keep it after a restart.",
            body.mode
        ),
    })))
}

async fn get_trades_today(State(state): State<AppState>) -> Result<Json<ApiResponse<TradesToday>>, AppError> {
    let trades = state
        .repos
        .trades
        .list_today()
        .await
        .map_err(|e| repo_err("Failed to list trades", e))?;
    let today = state
        .repos
        .stats
        .today()
        .await
        .map_err(|e| repo_err("Failed to read stats", e))?;

    Ok(Json(ApiResponse::success(TradesToday {
        count: trades.len(),
        trades,
        pnl: today.pnl,
    })))
}

use agent_core::Chain;
use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use portfolio_manager::{HunterSignal, RepoError, RiskLevel, SignalStatus, StoredSignal};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::validation::{validate_hunter_signal, MAX_SIGNALS_PER_BATCH};
use crate::{repo_err, ApiResponse, AppError, AppState};

/// Below this a signal is dropped outright.
const MIN_CONFIDENCE: f64 = 50.0;
/// At or above this a signal with a token is analysed straight away.
const ANALYZE_CONFIDENCE: f64 = 70.0;
const QUEUE_LIMIT: usize = 50;

#[derive(Deserialize)]
pub struct SignalBatchBody {
    pub signals: Vec<HunterSignal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalOutcome {
    pub signal_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SignalOutcome {
    fn accepted(id: &str, status: SignalStatus) -> Self {
        Self {
            signal_id: id.to_string(),
            status: status.as_str().to_string(),
            reason: None,
        }
    }

    fn rejected(id: &str, reason: &str) -> Self {
        Self {
            signal_id: id.to_string(),
            status: "rejected".to_string(),
            reason: Some(reason.to_string()),
        }
    }
}

#[derive(Serialize)]
pub struct SignalBatchResponse {
    pub received: usize,
    pub processed: usize,
    pub queued: usize,
    pub rejected: usize,
    pub results: Vec<SignalOutcome>,
}

#[derive(Serialize)]
pub struct SignalQueue {
    pub count: usize,
    pub signals: Vec<StoredSignal>,
}

pub fn signal_routes() -> Router<AppState> {
    Router::new()
        .route("/signals/queue", get(get_queue))
        .route("/signals/:id", get(get_signal))
}

pub fn signal_protected_routes() -> Router<AppState> {
    Router::new()
        .route("/signals", post(receive_signals))
        .route("/signals/queue", delete(clear_queue))
}

/// Business filters, checked in order. `None` means the signal is worth keeping.
fn rejection_reason(signal: &HunterSignal) -> Option<&'static str> {
    if signal.confidence < MIN_CONFIDENCE {
        Some("Confidence too low")
    } else if !signal.action.is_actionable() {
        Some("Not an actionable signal")
    } else if signal.risk == RiskLevel::Extreme {
        Some("Risk too high")
    } else {
        None
    }
}

async fn receive_signals(
    State(state): State<AppState>,
    Json(body): Json<SignalBatchBody>,
) -> Result<Json<ApiResponse<SignalBatchResponse>>, AppError> {
    if body.signals.len() > MAX_SIGNALS_PER_BATCH {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "Too many signals in one batch (max {})",
            MAX_SIGNALS_PER_BATCH
        )));
    }
    for (i, signal) in body.signals.iter().enumerate() {
        validate_hunter_signal(signal)
            .map_err(|e| AppError::bad_request(anyhow::anyhow!("signals[{}].{}", i, e)))?;
    }

    let received = body.signals.len();
    let mut results = Vec::with_capacity(received);
    let mut queued = 0;
    let mut rejected = 0;

    for signal in body.signals {
        let id = signal.id.clone();

        if let Some(reason) = rejection_reason(&signal) {
            rejected += 1;
            results.push(SignalOutcome::rejected(&id, reason));
            continue;
        }

        let analyze_target = signal
            .token
            .clone()
            .filter(|_| signal.confidence >= ANALYZE_CONFIDENCE)
            .map(|token| (token, signal.chain.unwrap_or_default()));

        match state.repos.signals.create(signal).await {
            Ok(_) => {}
            Err(RepoError::Conflict(_)) => {
                rejected += 1;
                results.push(SignalOutcome::rejected(&id, "Duplicate signal id"));
                continue;
            }
            Err(e) => return Err(repo_err("Failed to store signal", e)),
        }
        queued += 1;

        let mut status = SignalStatus::Queued;
        if let Some((token, chain)) = analyze_target {
            match state.repos.signals.transition(&id, SignalStatus::Analyzing, None).await {
                Ok(_) => {
                    spawn_analysis(state.clone(), id.clone(), token, chain);
                    status = SignalStatus::Analyzing;
                }
                Err(e) => tracing::warn!(signal_id = id.as_str(), "Could not start analysis: {}", e),
            }
        }
        results.push(SignalOutcome::accepted(&id, status));
    }

    state
        .repos
        .stats
        .record_signals(received as i64, queued as i64, rejected as i64)
        .await
        .map_err(|e| repo_err("Failed to update stats", e))?;

    tracing::info!(received, queued, rejected, "Processed hunter signals");

    Ok(Json(ApiResponse::success(SignalBatchResponse {
        received,
        processed: results.len(),
        queued,
        rejected,
        results,
    })))
}

/// Detached quick analysis. The signal ends `analyzed` with the result or
/// `failed` with the error; nobody awaits the task.
fn spawn_analysis(state: AppState, signal_id: String, token: String, chain: Chain) {
    tokio::spawn(async move {
        let (next, analysis) = match state.orchestrator.quick_signal(&token, chain, None).await {
            Ok(quick) => match serde_json::to_value(&quick) {
                Ok(value) => {
                    tracing::info!(
                        signal_id = signal_id.as_str(),
                        token = token.as_str(),
                        sentiment = %quick.sentiment,
                        "Signal analysed"
                    );
                    (SignalStatus::Analyzed, value)
                }
                Err(e) => (SignalStatus::Failed, json!({ "error": e.to_string() })),
            },
            Err(e) => {
                tracing::warn!(
                    signal_id = signal_id.as_str(),
                    token = token.as_str(),
                    "Signal analysis failed: {}",
                    e
                );
                (SignalStatus::Failed, json!({ "error": e.to_string() }))
            }
        };

        if let Err(e) = state.repos.signals.transition(&signal_id, next, Some(analysis)).await {
            tracing::error!(signal_id = signal_id.as_str(), "Failed to store analysis: {}", e);
        }
    });
}

async fn get_queue(State(state): State<AppState>) -> Result<Json<ApiResponse<SignalQueue>>, AppError> {
    let signals = state
        .repos
        .signals
        .queue(QUEUE_LIMIT)
        .await
        .map_err(|e| repo_err("Failed to read queue", e))?;

    Ok(Json(ApiResponse::success(SignalQueue {
        count: signals.len(),
        signals,
    })))
}

async fn get_signal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<StoredSignal>>, AppError> {
    let signal = state
        .repos
        .signals
        .get(&id)
        .await
        .map_err(|e| repo_err("Failed to read signal", e))?
        .ok_or_else(|| AppError::not_found(format!("Signal not found: {}", id)))?;

    Ok(Json(ApiResponse::success(signal)))
}

async fn clear_queue(State(state): State<AppState>) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let cleared = state
        .repos
        .signals
        .clear_queue()
        .await
        .map_err(|e| repo_err("Failed to clear queue", e))?;

    tracing::info!(cleared, "Cleared signal queue");
    Ok(Json(ApiResponse::success(json!({ "cleared": cleared }))))
}

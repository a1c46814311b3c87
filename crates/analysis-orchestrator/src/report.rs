use agent_core::{Chain, FinalDecision, MarketData, Signal, SignalAction, SourceReport};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::mode::AnalysisMode;

/// Result of a full multi-agent analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub token: String,
    pub chain: Chain,
    pub mode: AnalysisMode,
    pub provider: String,
    pub market_data: MarketData,
    pub sources: Vec<SourceReport>,
    pub agent_signals: Vec<Signal>,
    pub risk_assessment: Option<Signal>,
    pub final_decision: FinalDecision,
    pub summary: String,
    pub analyzed_at: DateTime<Utc>,
}

/// Cheap three-agent read on a token with no synthesis step.
#[derive(Debug, Clone, Serialize)]
pub struct QuickSignal {
    pub token: String,
    pub chain: Chain,
    pub price: f64,
    pub change_24h: Option<f64>,
    pub sentiment: SignalAction,
    pub confidence: f64,
    pub quick_take: String,
    pub signals: Vec<Signal>,
}

/// One entry of a batch run. Exactly one of `signal` or `error` is set.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<QuickSignal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

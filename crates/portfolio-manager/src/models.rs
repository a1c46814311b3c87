use agent_core::Chain;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::RepoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Open => "open",
            PositionStatus::Closed => "closed",
        }
    }
}

impl FromStr for PositionStatus {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(PositionStatus::Open),
            "closed" => Ok(PositionStatus::Closed),
            other => Err(RepoError::InvalidData(format!("position status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub token: String,
    pub chain: Chain,
    /// USD notional
    pub size: f64,
    pub entry_price: f64,
    pub current_price: f64,
    pub pnl: f64,
    pub pnl_percent: f64,
    pub status: PositionStatus,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Fresh open position priced at its entry.
    pub fn open(new: NewPosition) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            token: new.token,
            chain: new.chain,
            size: new.size,
            entry_price: new.entry_price,
            current_price: new.entry_price,
            pnl: 0.0,
            pnl_percent: 0.0,
            status: PositionStatus::Open,
            opened_at: Utc::now(),
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Same token (case-insensitive) on the same chain.
    pub fn matches(&self, token: &str, chain: Chain) -> bool {
        self.chain == chain && self.token.eq_ignore_ascii_case(token)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPosition {
    pub token: String,
    pub chain: Chain,
    pub size: f64,
    pub entry_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeKind {
    Open,
    Close,
}

impl TradeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeKind::Open => "open",
            TradeKind::Close => "close",
        }
    }
}

impl FromStr for TradeKind {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TradeKind::Open),
            "close" => Ok(TradeKind::Close),
            other => Err(RepoError::InvalidData(format!("trade kind '{}'", other))),
        }
    }
}

/// Append-only record of opening or closing a position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub position_id: String,
    pub kind: TradeKind,
    pub token: String,
    pub chain: Chain,
    pub size: f64,
    pub price: f64,
    pub pnl: Option<f64>,
    pub executed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrade {
    pub position_id: String,
    pub kind: TradeKind,
    pub token: String,
    pub chain: Chain,
    pub size: f64,
    pub price: f64,
    pub pnl: Option<f64>,
}

/// A position together with the trade that opened or closed it. Stores write
/// both or neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionChange {
    pub position: Position,
    pub trade: Trade,
}

impl NewTrade {
    pub fn execute(self) -> Trade {
        Trade {
            id: Uuid::new_v4().to_string(),
            position_id: self.position_id,
            kind: self.kind,
            token: self.token,
            chain: self.chain,
            size: self.size,
            price: self.price,
            pnl: self.pnl,
            executed_at: Utc::now(),
        }
    }

    pub fn opening(position: &Position) -> Self {
        Self {
            position_id: position.id.clone(),
            kind: TradeKind::Open,
            token: position.token.clone(),
            chain: position.chain,
            size: position.size,
            price: position.entry_price,
            pnl: None,
        }
    }

    pub fn closing(position: &Position) -> Self {
        Self {
            position_id: position.id.clone(),
            kind: TradeKind::Close,
            token: position.token.clone(),
            chain: position.chain,
            size: position.size,
            price: position.current_price,
            pnl: Some(position.pnl),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HunterAction {
    Buy,
    Sell,
    Hold,
    Watch,
}

impl HunterAction {
    /// Only buys and watches are worth queueing.
    pub fn is_actionable(&self) -> bool {
        matches!(self, HunterAction::Buy | HunterAction::Watch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Immediate,
    Today,
    Week,
    Monitor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

/// A discovery pushed by an external hunter service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HunterSignal {
    pub id: String,
    #[serde(rename = "type")]
    pub signal_type: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<Chain>,
    pub action: HunterAction,
    pub confidence: f64,
    pub urgency: Urgency,
    pub title: String,
    pub description: String,
    pub reasoning: String,
    pub risk: RiskLevel,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metrics: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStatus {
    Queued,
    Analyzing,
    Analyzed,
    Failed,
}

impl SignalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStatus::Queued => "queued",
            SignalStatus::Analyzing => "analyzing",
            SignalStatus::Analyzed => "analyzed",
            SignalStatus::Failed => "failed",
        }
    }

    /// queued -> analyzing -> analyzed | failed. Nothing leaves a terminal state.
    pub fn can_transition_to(&self, next: SignalStatus) -> bool {
        matches!(
            (*self, next),
            (SignalStatus::Queued, SignalStatus::Analyzing)
                | (SignalStatus::Analyzing, SignalStatus::Analyzed)
                | (SignalStatus::Analyzing, SignalStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SignalStatus::Analyzed | SignalStatus::Failed)
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalStatus {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(SignalStatus::Queued),
            "analyzing" => Ok(SignalStatus::Analyzing),
            "analyzed" => Ok(SignalStatus::Analyzed),
            "failed" => Ok(SignalStatus::Failed),
            other => Err(RepoError::InvalidData(format!("signal status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: SignalStatus,
    pub at: DateTime<Utc>,
}

/// A hunter signal plus its processing state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSignal {
    #[serde(flatten)]
    pub signal: HunterSignal,
    pub status: SignalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<serde_json::Value>,
    pub received_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzed_at: Option<DateTime<Utc>>,
    pub history: Vec<StatusChange>,
}

impl StoredSignal {
    pub fn queued(signal: HunterSignal) -> Self {
        let now = Utc::now();
        Self {
            signal,
            status: SignalStatus::Queued,
            analysis: None,
            received_at: now,
            analyzed_at: None,
            history: vec![StatusChange {
                status: SignalStatus::Queued,
                at: now,
            }],
        }
    }

    pub fn id(&self) -> &str {
        &self.signal.id
    }

    /// Apply a status change in place, recording it in the history.
    pub fn advance(&mut self, next: SignalStatus, analysis: Option<serde_json::Value>) -> Result<(), RepoError> {
        if !self.status.can_transition_to(next) {
            return Err(RepoError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        let now = Utc::now();
        self.status = next;
        self.history.push(StatusChange { status: next, at: now });
        if next.is_terminal() {
            self.analyzed_at = Some(now);
        }
        if analysis.is_some() {
            self.analysis = analysis;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub pnl: f64,
    pub trades_count: i64,
    pub signals_received: i64,
    pub signals_queued: i64,
    pub signals_rejected: i64,
}

impl DailyStats {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            pnl: 0.0,
            trades_count: 0,
            signals_received: 0,
            signals_queued: 0,
            signals_rejected: 0,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn hunter(id: &str) -> HunterSignal {
        serde_json::from_value(json!({
            "id": id,
            "type": "new_listing",
            "source": "dexscreener-hunter",
            "token": "WIF",
            "chain": "solana",
            "action": "buy",
            "confidence": 74,
            "urgency": "today",
            "title": "Fresh liquidity",
            "description": "Liquidity doubled in an hour",
            "reasoning": "Volume confirms the move",
            "risk": "medium",
            "riskFactors": ["thin book"],
        }))
        .unwrap()
    }

    #[test]
    fn test_hunter_signal_wire_names() {
        let signal = hunter("sig-1");
        assert_eq!(signal.signal_type, "new_listing");
        assert_eq!(signal.chain, Some(Chain::Solana));
        assert_eq!(signal.risk_factors, vec!["thin book"]);
        assert!(signal.tags.is_empty());

        let value = serde_json::to_value(StoredSignal::queued(signal)).unwrap();
        assert_eq!(value["type"], "new_listing");
        assert_eq!(value["riskFactors"][0], "thin book");
        assert_eq!(value["status"], "queued");
        assert!(value.get("analysis").is_none());
    }

    #[test]
    fn test_status_machine() {
        use SignalStatus::*;
        assert!(Queued.can_transition_to(Analyzing));
        assert!(Analyzing.can_transition_to(Analyzed));
        assert!(Analyzing.can_transition_to(Failed));
        assert!(!Queued.can_transition_to(Analyzed));
        assert!(!Analyzed.can_transition_to(Analyzing));
        assert!(!Failed.can_transition_to(Queued));
    }

    #[test]
    fn test_advance_records_history() {
        let mut stored = StoredSignal::queued(hunter("sig-2"));
        stored.advance(SignalStatus::Analyzing, None).unwrap();
        stored
            .advance(SignalStatus::Analyzed, Some(json!({"sentiment": "bullish"})))
            .unwrap();

        let statuses: Vec<_> = stored.history.iter().map(|h| h.status).collect();
        assert_eq!(
            statuses,
            vec![SignalStatus::Queued, SignalStatus::Analyzing, SignalStatus::Analyzed]
        );
        assert!(stored.analyzed_at.is_some());
        assert_eq!(stored.analysis.unwrap()["sentiment"], "bullish");
    }

    #[test]
    fn test_advance_rejects_skipping() {
        let mut stored = StoredSignal::queued(hunter("sig-3"));
        let err = stored.advance(SignalStatus::Failed, None).unwrap_err();
        assert!(matches!(
            err,
            RepoError::InvalidTransition { from: SignalStatus::Queued, to: SignalStatus::Failed }
        ));
        assert_eq!(stored.history.len(), 1);
    }
}

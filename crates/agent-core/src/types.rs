use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{AgentError, AgentResult};

/// Flat, insertion-ordered map of market metrics for one token.
pub type MarketData = serde_json::Map<String, serde_json::Value>;

/// Caller-supplied free-form context. Always sanitized before reaching a prompt.
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Direction of an agent's opinion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Bullish,
    Bearish,
    Neutral,
}

impl SignalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalAction::Bullish => "bullish",
            SignalAction::Bearish => "bearish",
            SignalAction::Neutral => "neutral",
        }
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalAction {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bullish" => Ok(SignalAction::Bullish),
            "bearish" => Ok(SignalAction::Bearish),
            "neutral" => Ok(SignalAction::Neutral),
            _ => Err(AgentError::InvalidAction(s.to_string())),
        }
    }
}

/// How a signal came to be: a decoded JSON reply, a keyword scan of free text,
/// or a placeholder because the model could not be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalOrigin {
    #[default]
    Model,
    TextFallback,
    Unavailable,
}

/// Normalized opinion produced by one agent for one token.
///
/// Fields are private so the confidence range and the action set cannot be
/// bypassed after construction. Deserialization goes through the same checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSignal")]
pub struct Signal {
    action: SignalAction,
    confidence: f64,
    reasoning: String,
    token: String,
    agent_name: String,
    data_used: Vec<String>,
    key_metrics: Vec<String>,
    risks: Vec<String>,
    origin: SignalOrigin,
}

#[derive(Deserialize)]
struct RawSignal {
    action: String,
    confidence: f64,
    reasoning: String,
    token: String,
    agent_name: String,
    #[serde(default)]
    data_used: Vec<String>,
    #[serde(default)]
    key_metrics: Vec<String>,
    #[serde(default)]
    risks: Vec<String>,
    #[serde(default)]
    origin: SignalOrigin,
}

impl TryFrom<RawSignal> for Signal {
    type Error = AgentError;

    fn try_from(raw: RawSignal) -> Result<Self, Self::Error> {
        Ok(Signal::from_raw(&raw.action, raw.confidence, raw.reasoning, raw.token, raw.agent_name)?
            .with_details(raw.data_used, raw.key_metrics, raw.risks)
            .with_origin(raw.origin))
    }
}

impl Signal {
    /// Build a signal. Confidence outside [0, 100] is rejected, never clamped.
    pub fn new(
        action: SignalAction,
        confidence: f64,
        reasoning: impl Into<String>,
        token: impl Into<String>,
        agent_name: impl Into<String>,
    ) -> AgentResult<Self> {
        if !(0.0..=100.0).contains(&confidence) {
            return Err(AgentError::InvalidConfidence(confidence));
        }

        Ok(Self {
            action,
            confidence,
            reasoning: reasoning.into(),
            token: token.into(),
            agent_name: agent_name.into(),
            data_used: Vec::new(),
            key_metrics: Vec::new(),
            risks: Vec::new(),
            origin: SignalOrigin::Model,
        })
    }

    /// Build a signal from an untyped action string.
    pub fn from_raw(
        action: &str,
        confidence: f64,
        reasoning: impl Into<String>,
        token: impl Into<String>,
        agent_name: impl Into<String>,
    ) -> AgentResult<Self> {
        let action = action.parse::<SignalAction>()?;
        Self::new(action, confidence, reasoning, token, agent_name)
    }

    /// Neutral, 50% placeholder used whenever an agent could not form an opinion.
    pub fn neutral_default(
        reasoning: impl Into<String>,
        token: impl Into<String>,
        agent_name: impl Into<String>,
        origin: SignalOrigin,
    ) -> Self {
        Self::at_default_confidence(SignalAction::Neutral, reasoning, token, agent_name, origin)
    }

    /// Signal with the default 50% confidence, for replies that carried a
    /// direction but no usable score.
    pub fn at_default_confidence(
        action: SignalAction,
        reasoning: impl Into<String>,
        token: impl Into<String>,
        agent_name: impl Into<String>,
        origin: SignalOrigin,
    ) -> Self {
        Self {
            action,
            confidence: 50.0,
            reasoning: reasoning.into(),
            token: token.into(),
            agent_name: agent_name.into(),
            data_used: Vec::new(),
            key_metrics: Vec::new(),
            risks: Vec::new(),
            origin,
        }
    }

    pub fn with_details(
        mut self,
        data_used: Vec<String>,
        key_metrics: Vec<String>,
        risks: Vec<String>,
    ) -> Self {
        self.data_used = data_used;
        self.key_metrics = key_metrics;
        self.risks = risks;
        self
    }

    pub fn with_origin(mut self, origin: SignalOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn action(&self) -> SignalAction {
        self.action
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn data_used(&self) -> &[String] {
        &self.data_used
    }

    pub fn key_metrics(&self) -> &[String] {
        &self.key_metrics
    }

    pub fn risks(&self) -> &[String] {
        &self.risks
    }

    pub fn origin(&self) -> SignalOrigin {
        self.origin
    }

    /// True when the signal is a placeholder for a failed model call.
    pub fn is_unavailable(&self) -> bool {
        self.origin == SignalOrigin::Unavailable
    }
}

/// Bullish/bearish/neutral head count over a set of signals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalTally {
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
}

impl SignalTally {
    pub fn from_signals(signals: &[Signal]) -> Self {
        let mut tally = Self::default();
        for signal in signals {
            match signal.action() {
                SignalAction::Bullish => tally.bullish += 1,
                SignalAction::Bearish => tally.bearish += 1,
                SignalAction::Neutral => tally.neutral += 1,
            }
        }
        tally
    }

    pub fn total(&self) -> usize {
        self.bullish + self.bearish + self.neutral
    }

    /// Plurality action. Any tie for first place is neutral.
    pub fn consensus(&self) -> SignalAction {
        let top = self.bullish.max(self.bearish).max(self.neutral);
        if top == 0 {
            return SignalAction::Neutral;
        }
        match (self.bullish == top, self.bearish == top, self.neutral == top) {
            (true, false, false) => SignalAction::Bullish,
            (false, true, false) => SignalAction::Bearish,
            _ => SignalAction::Neutral,
        }
    }
}

/// Mean confidence, 0 for an empty slice.
pub fn average_confidence(signals: &[Signal]) -> f64 {
    if signals.is_empty() {
        return 0.0;
    }
    signals.iter().map(Signal::confidence).sum::<f64>() / signals.len() as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
    Degen,
}

impl RiskTolerance {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTolerance::Low => "low",
            RiskTolerance::Medium => "medium",
            RiskTolerance::High => "high",
            RiskTolerance::Degen => "degen",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeHorizon {
    Short,
    Medium,
    Long,
}

impl TimeHorizon {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeHorizon::Short => "short",
            TimeHorizon::Medium => "medium",
            TimeHorizon::Long => "long",
        }
    }
}

/// Static description of an agent. Built once per persona, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub description: String,
    pub philosophy: String,
    pub risk_tolerance: RiskTolerance,
    pub time_horizon: TimeHorizon,
    pub focus_areas: Vec<String>,
}

/// Supported blockchains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    #[default]
    Solana,
    Ethereum,
    Base,
    Arbitrum,
    Polygon,
    Bsc,
}

impl Chain {
    pub const ALL: [Chain; 6] = [
        Chain::Solana,
        Chain::Ethereum,
        Chain::Base,
        Chain::Arbitrum,
        Chain::Polygon,
        Chain::Bsc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Solana => "solana",
            Chain::Ethereum => "ethereum",
            Chain::Base => "base",
            Chain::Arbitrum => "arbitrum",
            Chain::Polygon => "polygon",
            Chain::Bsc => "bsc",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Chain::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AgentError::InvalidChain(s.to_string()))
    }
}

/// Action in a synthesized decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    Buy,
    Sell,
    Hold,
    Avoid,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::Buy => "buy",
            DecisionAction::Sell => "sell",
            DecisionAction::Hold => "hold",
            DecisionAction::Avoid => "avoid",
        }
    }
}

impl FromStr for DecisionAction {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(DecisionAction::Buy),
            "sell" => Ok(DecisionAction::Sell),
            "hold" => Ok(DecisionAction::Hold),
            "avoid" => Ok(DecisionAction::Avoid),
            _ => Err(AgentError::InvalidAction(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conviction {
    High,
    Medium,
    Low,
}

impl Conviction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conviction::High => "high",
            Conviction::Medium => "medium",
            Conviction::Low => "low",
        }
    }
}

impl FromStr for Conviction {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Conviction::High),
            "medium" => Ok(Conviction::Medium),
            "low" => Ok(Conviction::Low),
            _ => Err(AgentError::InvalidData(format!("unknown conviction '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    #[default]
    Market,
    Limit,
}

impl FromStr for OrderType {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            _ => Err(AgentError::InvalidData(format!("unknown order type '{}'", s))),
        }
    }
}

/// How to act on a decision. Prices stay as text because models express them
/// as ranges or conditions ("$0.0012 or on a retest of support").
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub order_type: OrderType,
    pub entry_price: String,
    pub position_size_pct: Option<f64>,
    pub position_size_usd: Option<f64>,
    pub stop_loss: String,
    pub take_profit: Vec<String>,
}

/// Portfolio manager's consolidated call for one token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalDecision {
    pub action: DecisionAction,
    pub conviction: Conviction,
    pub confidence: f64,
    pub reasoning: String,
    pub execution_plan: Option<ExecutionPlan>,
    #[serde(default)]
    pub agent_weights_used: BTreeMap<String, f64>,
    #[serde(default)]
    pub consensus_summary: String,
    #[serde(default)]
    pub key_factors: Vec<String>,
    #[serde(default)]
    pub risks_acknowledged: Vec<String>,
    /// Set when the decision is a fallback rather than a model synthesis
    #[serde(default)]
    pub degraded: bool,
}

impl FinalDecision {
    /// hold / low / 50 with the given reasoning
    pub fn fallback(reasoning: impl Into<String>) -> Self {
        Self {
            action: DecisionAction::Hold,
            conviction: Conviction::Low,
            confidence: 50.0,
            reasoning: reasoning.into(),
            execution_plan: None,
            agent_weights_used: BTreeMap::new(),
            consensus_summary: String::new(),
            key_factors: Vec::new(),
            risks_acknowledged: Vec::new(),
            degraded: false,
        }
    }
}

/// Whether a data source answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Availability {
    Available,
    Unavailable { reason: String },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: String,
    #[serde(flatten)]
    pub availability: Availability,
}

impl SourceReport {
    pub fn available(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            availability: Availability::Available,
        }
    }

    pub fn unavailable(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            availability: Availability::Unavailable {
                reason: reason.into(),
            },
        }
    }
}

/// Merged market data for one token with a per-source availability report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub token: String,
    pub chain: Chain,
    pub data: MarketData,
    pub sources: Vec<SourceReport>,
    pub fetched_at: DateTime<Utc>,
}

impl MarketSnapshot {
    pub fn new(token: impl Into<String>, chain: Chain) -> Self {
        Self {
            token: token.into(),
            chain,
            data: MarketData::new(),
            sources: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    /// Positive USD price, if any source supplied one
    pub fn price(&self) -> Option<f64> {
        self.metric("price").filter(|p| *p > 0.0)
    }

    pub fn change_24h(&self) -> Option<f64> {
        self.metric("change_24h")
    }

    pub fn metric(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(serde_json::Value::as_f64)
    }

    pub fn has_price(&self) -> bool {
        self.price().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signal_rejects_out_of_range_confidence() {
        for bad in [-0.1, 100.5, 250.0, f64::NAN] {
            let err = Signal::new(SignalAction::Bullish, bad, "x", "SOL", "A").unwrap_err();
            assert!(matches!(err, AgentError::InvalidConfidence(_)));
        }
        assert!(Signal::new(SignalAction::Bullish, 0.0, "x", "SOL", "A").is_ok());
        assert!(Signal::new(SignalAction::Bullish, 100.0, "x", "SOL", "A").is_ok());
    }

    #[test]
    fn test_signal_rejects_unknown_action() {
        let err = Signal::from_raw("moon", 70.0, "x", "SOL", "A").unwrap_err();
        assert_eq!(err, AgentError::InvalidAction("moon".into()));
        assert!(Signal::from_raw("Bearish", 70.0, "x", "SOL", "A").is_ok());
    }

    #[test]
    fn test_signal_deserialize_validates() {
        let bad = json!({
            "action": "bullish", "confidence": 140, "reasoning": "r",
            "token": "SOL", "agent_name": "A"
        });
        assert!(serde_json::from_value::<Signal>(bad).is_err());

        let good = json!({
            "action": "neutral", "confidence": 40, "reasoning": "r",
            "token": "SOL", "agent_name": "A", "risks": ["rug"]
        });
        let signal: Signal = serde_json::from_value(good).unwrap();
        assert_eq!(signal.risks(), ["rug".to_string()]);
        assert!(signal.key_metrics().is_empty());
        assert_eq!(signal.origin(), SignalOrigin::Model);
    }

    #[test]
    fn test_tally_consensus() {
        let mk = |a| Signal::new(a, 60.0, "", "T", "A").unwrap();
        let signals = vec![
            mk(SignalAction::Bullish),
            mk(SignalAction::Bullish),
            mk(SignalAction::Bearish),
        ];
        let tally = SignalTally::from_signals(&signals);
        assert_eq!(tally.consensus(), SignalAction::Bullish);
        assert_eq!(tally.total(), 3);

        let tied = SignalTally { bullish: 2, bearish: 2, neutral: 0 };
        assert_eq!(tied.consensus(), SignalAction::Neutral);
        assert_eq!(SignalTally::default().consensus(), SignalAction::Neutral);
    }

    #[test]
    fn test_chain_parse() {
        assert_eq!("BSC".parse::<Chain>().unwrap(), Chain::Bsc);
        assert!("dogechain".parse::<Chain>().is_err());
    }

    #[test]
    fn test_source_report_serializes_flat() {
        let report = SourceReport::unavailable("coingecko", "HTTP 500");
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            json!({"source": "coingecko", "status": "unavailable", "reason": "HTTP 500"})
        );
    }

    #[test]
    fn test_snapshot_price_requires_positive() {
        let mut snapshot = MarketSnapshot::new("BONK", Chain::Solana);
        assert!(!snapshot.has_price());
        snapshot.data.insert("price".into(), json!(0.0));
        assert!(snapshot.price().is_none());
        snapshot.data.insert("price".into(), json!(0.0000231));
        assert_eq!(snapshot.price(), Some(0.0000231));
    }
}

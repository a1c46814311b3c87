pub mod error;
pub mod mode;
pub mod report;

pub use error::{OrchestratorError, OrchestratorResult};
pub use mode::AnalysisMode;
pub use report::{AnalysisReport, BatchItem, QuickSignal};

use agent_core::{
    average_confidence, truncate_chars, AgentConfig, Chain, Context, FinalDecision,
    MarketDataSource, MarketSnapshot, Signal, SignalAction, SignalTally,
};
use chrono::Utc;
use futures_util::future::join_all;
use llm_client::{ChatModel, LlmProvider, ModelRegistry};
use persona_agents::{Agent, PersonaId, PortfolioManagerAgent};
use std::sync::Arc;

/// Tokens beyond this are dropped from a batch request.
pub const MAX_BATCH_TOKENS: usize = 10;

const QUICK_TAKE_CHARS: usize = 200;

/// Parameters for one full analysis.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub token: String,
    pub chain: Chain,
    pub mode: AnalysisMode,
    pub provider: Option<LlmProvider>,
    pub context: Option<Context>,
}

/// Runs persona agents against live market data and merges their views.
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    market: Arc<dyn MarketDataSource>,
    models: ModelRegistry,
}

impl AnalysisOrchestrator {
    pub fn new(market: Arc<dyn MarketDataSource>, models: ModelRegistry) -> Self {
        Self { market, models }
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    pub async fn market_snapshot(&self, token: &str, chain: Chain) -> MarketSnapshot {
        self.market.fetch(token, chain).await
    }

    /// Metadata for every persona, analysts first.
    pub fn agent_catalog() -> Vec<AgentConfig> {
        PersonaId::all().into_iter().map(|id| id.persona().config).collect()
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> OrchestratorResult<AnalysisReport> {
        let model = self.models.resolve(request.provider)?;
        let token = request.token.as_str();

        tracing::info!(
            token,
            chain = %request.chain,
            mode = %request.mode,
            backend = model.backend_name(),
            "Starting analysis"
        );

        let snapshot = self.priced_snapshot(token, request.chain).await?;
        let context = request.context.as_ref();

        let agent_signals = run_agents(&model, &request.mode.agents(), token, &snapshot, context).await;
        let tally = SignalTally::from_signals(&agent_signals);

        let risk_assessment = if request.mode.runs_risk_manager() {
            let risk_context = risk_context(context, &agent_signals, &tally);
            let risk_agent = Agent::for_persona(model.clone(), PersonaId::RiskManager);
            Some(risk_agent.analyze(token, &snapshot.data, Some(&risk_context)).await)
        } else {
            None
        };

        let final_decision = PortfolioManagerAgent::new(model.clone())
            .synthesize_signals(token, &snapshot.data, &agent_signals, risk_assessment.as_ref(), context)
            .await;

        let summary = summarize(token, &final_decision, &tally);
        tracing::info!(token, degraded = final_decision.degraded, "{}", summary);

        Ok(AnalysisReport {
            token: token.to_string(),
            chain: request.chain,
            mode: request.mode,
            provider: model.backend_name().to_string(),
            market_data: snapshot.data,
            sources: snapshot.sources,
            agent_signals,
            risk_assessment,
            final_decision,
            summary,
            analyzed_at: Utc::now(),
        })
    }

    /// Three-agent read with no risk pass and no synthesis call.
    pub async fn quick_signal(
        &self,
        token: &str,
        chain: Chain,
        provider: Option<LlmProvider>,
    ) -> OrchestratorResult<QuickSignal> {
        let model = self.models.resolve(provider)?;
        let snapshot = self.priced_snapshot(token, chain).await?;

        let signals = run_agents(&model, &AnalysisMode::Fast.agents(), token, &snapshot, None).await;
        let tally = SignalTally::from_signals(&signals);
        let sentiment = tally.consensus();

        // A neutral call produced by a tie speaks for every agent.
        let tied = sentiment == SignalAction::Neutral && tally.neutral <= tally.bullish.max(tally.bearish);
        let agreeing: Vec<Signal> = signals
            .iter()
            .filter(|s| s.action() == sentiment)
            .cloned()
            .collect();
        let pool: &[Signal] = if tied || agreeing.is_empty() { &signals } else { &agreeing };
        let confidence = round1(average_confidence(pool));

        let quick_take = quick_take(sentiment, pool, signals.len());

        Ok(QuickSignal {
            token: token.to_string(),
            chain,
            price: snapshot.price().unwrap_or_default(),
            change_24h: snapshot.change_24h(),
            sentiment,
            confidence,
            quick_take,
            signals,
        })
    }

    /// Quick signals for up to `MAX_BATCH_TOKENS` tokens, one after another.
    /// A failing token records its error and the batch continues.
    pub async fn quick_signal_batch(
        &self,
        tokens: &[String],
        chain: Chain,
        provider: Option<LlmProvider>,
    ) -> Vec<BatchItem> {
        if tokens.len() > MAX_BATCH_TOKENS {
            tracing::warn!(requested = tokens.len(), "Batch truncated to {} tokens", MAX_BATCH_TOKENS);
        }

        let mut items = Vec::with_capacity(tokens.len().min(MAX_BATCH_TOKENS));
        for token in tokens.iter().take(MAX_BATCH_TOKENS) {
            let item = match self.quick_signal(token, chain, provider).await {
                Ok(signal) => BatchItem {
                    token: token.clone(),
                    signal: Some(signal),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(token = token.as_str(), "Batch quick signal failed: {}", e);
                    BatchItem {
                        token: token.clone(),
                        signal: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            items.push(item);
        }
        items
    }

    async fn priced_snapshot(&self, token: &str, chain: Chain) -> OrchestratorResult<MarketSnapshot> {
        let snapshot = self.market.fetch(token, chain).await;
        if !snapshot.has_price() {
            tracing::warn!(token, chain = %chain, "No usable market data");
            return Err(OrchestratorError::NoMarketData {
                token: token.to_string(),
                chain,
            });
        }
        Ok(snapshot)
    }
}

async fn run_agents(
    model: &Arc<dyn ChatModel>,
    personas: &[PersonaId],
    token: &str,
    snapshot: &MarketSnapshot,
    context: Option<&Context>,
) -> Vec<Signal> {
    let agents: Vec<Agent> = personas
        .iter()
        .map(|id| Agent::for_persona(model.clone(), *id))
        .collect();

    join_all(agents.iter().map(|agent| agent.analyze(token, &snapshot.data, context))).await
}

fn risk_context(caller: Option<&Context>, signals: &[Signal], tally: &SignalTally) -> Context {
    let mut context = caller.cloned().unwrap_or_default();
    context.insert(
        "aggregate_sentiment".to_string(),
        serde_json::Value::String(tally.consensus().as_str().to_string()),
    );
    context.insert(
        "avg_confidence".to_string(),
        serde_json::json!(round1(average_confidence(signals))),
    );
    context
}

fn summarize(token: &str, decision: &FinalDecision, tally: &SignalTally) -> String {
    format!(
        "{}: {} ({} conviction, {:.0}% confidence). {} agents: {} bullish, {} bearish, {} neutral.",
        token.to_uppercase(),
        decision.action.as_str().to_uppercase(),
        decision.conviction.as_str(),
        decision.confidence,
        tally.total(),
        tally.bullish,
        tally.bearish,
        tally.neutral,
    )
}

fn quick_take(sentiment: SignalAction, pool: &[Signal], total: usize) -> String {
    let headline = match sentiment {
        SignalAction::Bullish => "Bullish lean",
        SignalAction::Bearish => "Bearish lean",
        SignalAction::Neutral => "No clear edge",
    };
    let lead = pool
        .iter()
        .max_by(|a, b| a.confidence().total_cmp(&b.confidence()));

    match lead {
        Some(lead) => format!(
            "{} ({}/{} agents). {}: {}",
            headline,
            pool.len(),
            total,
            lead.agent_name(),
            truncate_chars(lead.reasoning(), QUICK_TAKE_CHARS)
        ),
        None => headline.to_string(),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

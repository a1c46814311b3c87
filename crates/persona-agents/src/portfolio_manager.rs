use agent_core::{
    format_value, parse_decision, sanitize_context, truncate_chars, Context, FinalDecision,
    MarketData, Signal,
};
use llm_client::ChatModel;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::personas::{Persona, PersonaId};

const WEIGHTING_RULES: &str = "\
AGENT WEIGHTING GUIDELINES:
- Majors (BTC/ETH): weight Warren Buffett and Charlie Munger higher
- DeFi: weight On-Chain Analyst and Cathie Wood higher
- Memecoins: weight Degen Trader, Pump Trader and Solana Specialist higher
- L1s: balance long-term value (Buffett) against growth (Wood)
- Always: factor in Michael Burry's contrarian view and the Risk Manager's limits
- Agents marked unavailable had no model response; give them no weight";

const DECISION_SCHEMA: &str = r#"Respond with a JSON object:
{
    "action": "buy" | "sell" | "hold" | "avoid",
    "conviction": "high" | "medium" | "low",
    "confidence": 0-100,
    "reasoning": "Your synthesis and decision rationale",
    "execution_plan": {
        "order_type": "market" | "limit",
        "entry_price": "price or 'market'",
        "position_size_pct": "percentage of portfolio",
        "position_size_usd": "dollar amount",
        "stop_loss": "price",
        "take_profit": ["tp1", "tp2", "tp3"]
    },
    "agent_weights_used": {"agent_name": 0.0},
    "consensus_summary": "What agents agreed and disagreed on",
    "key_factors": ["factor1", "factor2"],
    "risks_acknowledged": ["risk1", "risk2"]
}
"#;

/// Synthesizes every agent's signal into one `FinalDecision`.
#[derive(Clone)]
pub struct PortfolioManagerAgent {
    model: Arc<dyn ChatModel>,
    persona: Persona,
}

impl PortfolioManagerAgent {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            persona: PersonaId::PortfolioManager.persona(),
        }
    }

    pub fn system_prompt(&self) -> String {
        let p = &self.persona;
        let mut prompt = String::new();
        let _ = writeln!(prompt, "{}\n", p.identity);
        let _ = writeln!(prompt, "{}:\n{}\n", p.philosophy_heading, p.config.philosophy);
        let _ = writeln!(prompt, "{}:", p.framework_heading);
        for (i, step) in p.framework.iter().enumerate() {
            let _ = writeln!(prompt, "{}. {}", i + 1, step);
        }
        let _ = writeln!(prompt, "\n{}\n\n{}\n", WEIGHTING_RULES, p.voice);
        prompt.push_str(DECISION_SCHEMA);
        prompt
    }

    pub fn user_prompt(
        &self,
        token: &str,
        market_data: &MarketData,
        agent_signals: &[Signal],
        risk_assessment: Option<&Signal>,
        context: Option<&Context>,
    ) -> String {
        let mut prompt = String::new();
        let _ = writeln!(prompt, "Make a final trading decision for {}.\n", token);

        let category = match format_value(market_data, "category").as_str() {
            "N/A" => "unknown".to_string(),
            other => other.to_string(),
        };
        let _ = writeln!(prompt, "MARKET DATA:");
        let _ = writeln!(prompt, "- Current Price: {}", format_value(market_data, "price"));
        let _ = writeln!(prompt, "- Market Cap: {}", format_value(market_data, "market_cap"));
        let _ = writeln!(prompt, "- 24h Volume: {}", format_value(market_data, "volume_24h"));
        let _ = writeln!(prompt, "- 24h Change: {}", format_value(market_data, "change_24h"));
        let _ = writeln!(prompt, "- Token Type: {}\n", category);

        let _ = writeln!(prompt, "AGENT SIGNALS:");
        if agent_signals.is_empty() {
            let _ = writeln!(prompt, "No agent signals available.");
        }
        for signal in agent_signals {
            let _ = writeln!(prompt, "=== {} ===", signal.agent_name());
            if signal.is_unavailable() {
                let _ = writeln!(prompt, "Action: {} (unavailable)", signal.action());
            } else {
                let _ = writeln!(prompt, "Action: {}", signal.action());
            }
            let _ = writeln!(prompt, "Confidence: {:.0}%", signal.confidence());
            let _ = writeln!(prompt, "Reasoning: {}", signal.reasoning());
            let _ = writeln!(prompt, "Key Metrics: {}", signal.key_metrics().join(", "));
            let _ = writeln!(prompt, "Risks: {}\n", signal.risks().join(", "));
        }

        if let Some(risk) = risk_assessment {
            let _ = writeln!(prompt, "=== RISK MANAGER ASSESSMENT ===");
            let _ = writeln!(prompt, "Action: {}", risk.action());
            let _ = writeln!(prompt, "Confidence: {:.0}%", risk.confidence());
            let _ = writeln!(prompt, "Reasoning: {}", risk.reasoning());
            let _ = writeln!(prompt, "Risks: {}\n", risk.risks().join(", "));
        }

        let _ = write!(prompt, "PORTFOLIO CONTEXT:\n{}\n", sanitize_context(context));
        prompt
    }

    /// One decision for `token`. A model failure yields a degraded hold/low/50
    /// decision instead of an error.
    pub async fn synthesize_signals(
        &self,
        token: &str,
        market_data: &MarketData,
        agent_signals: &[Signal],
        risk_assessment: Option<&Signal>,
        context: Option<&Context>,
    ) -> FinalDecision {
        let system = self.system_prompt();
        let user = self.user_prompt(token, market_data, agent_signals, risk_assessment, context);

        match self.model.complete(&system, &user).await {
            Ok(reply) => {
                let decision = parse_decision(&reply);
                tracing::info!(
                    token,
                    action = decision.action.as_str(),
                    conviction = decision.conviction.as_str(),
                    confidence = decision.confidence,
                    signals = agent_signals.len(),
                    "Portfolio decision synthesized"
                );
                decision
            }
            Err(e) => {
                tracing::error!(token, backend = self.model.backend_name(), "Synthesis model call failed: {}", e);
                let mut decision =
                    FinalDecision::fallback(truncate_chars(&format!("Synthesis unavailable: {}", e), 500));
                decision.degraded = true;
                decision
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{Conviction, DecisionAction, SignalAction, SignalOrigin};
    use async_trait::async_trait;
    use llm_client::{LlmError, LlmResult};
    use serde_json::json;

    struct Fixed(Option<&'static str>);

    #[async_trait]
    impl ChatModel for Fixed {
        async fn complete(&self, _system: &str, _user: &str) -> LlmResult<String> {
            self.0
                .map(str::to_string)
                .ok_or(LlmError::Timeout)
        }

        fn backend_name(&self) -> &'static str {
            "fixed"
        }
    }

    fn signals() -> Vec<Signal> {
        vec![
            Signal::new(SignalAction::Bullish, 80.0, "moat", "ETH", "Warren Buffett")
                .unwrap()
                .with_details(vec![], vec!["fee revenue".into()], vec!["regulation".into()]),
            Signal::neutral_default("Analysis unavailable: Timeout", "ETH", "Degen Trader", SignalOrigin::Unavailable),
        ]
    }

    #[test]
    fn test_user_prompt_lists_every_signal() {
        let pm = PortfolioManagerAgent::new(Arc::new(Fixed(None)));
        let market = json!({"price": 3120.5, "category": "major"}).as_object().cloned().unwrap();
        let risk = Signal::new(SignalAction::Neutral, 60.0, "cap at 2%", "ETH", "Risk Manager").unwrap();

        let prompt = pm.user_prompt("ETH", &market, &signals(), Some(&risk), None);
        assert!(prompt.contains("- Current Price: $3,120.50"));
        assert!(prompt.contains("- Market Cap: N/A"));
        assert!(prompt.contains("- Token Type: major"));
        assert!(prompt.contains("=== Warren Buffett ===\nAction: bullish\nConfidence: 80%"));
        assert!(prompt.contains("Key Metrics: fee revenue"));
        assert!(prompt.contains("=== Degen Trader ===\nAction: neutral (unavailable)"));
        assert!(prompt.contains("=== RISK MANAGER ASSESSMENT ===\nAction: neutral"));
        assert!(prompt.ends_with("PORTFOLIO CONTEXT:\nNone provided\n"));
    }

    #[test]
    fn test_user_prompt_without_signals() {
        let pm = PortfolioManagerAgent::new(Arc::new(Fixed(None)));
        let prompt = pm.user_prompt("X", &MarketData::new(), &[], None, None);
        assert!(prompt.contains("No agent signals available."));
        assert!(prompt.contains("- Token Type: unknown"));
        assert!(!prompt.contains("RISK MANAGER"));
    }

    #[test]
    fn test_system_prompt_has_weighting_and_schema() {
        let pm = PortfolioManagerAgent::new(Arc::new(Fixed(None)));
        let prompt = pm.system_prompt();
        assert!(prompt.contains("Memecoins: weight Degen Trader, Pump Trader and Solana Specialist higher"));
        assert!(prompt.contains("\"action\": \"buy\" | \"sell\" | \"hold\" | \"avoid\""));
    }

    #[tokio::test]
    async fn test_synthesize_parses_decision() {
        let pm = PortfolioManagerAgent::new(Arc::new(Fixed(Some(
            r#"{"action": "buy", "conviction": "high", "confidence": 84, "reasoning": "aligned"}"#,
        ))));
        let decision = pm
            .synthesize_signals("ETH", &MarketData::new(), &signals(), None, None)
            .await;
        assert_eq!(decision.action, DecisionAction::Buy);
        assert_eq!(decision.conviction, Conviction::High);
        assert!(!decision.degraded);
    }

    #[tokio::test]
    async fn test_synthesize_degrades_on_model_failure() {
        let pm = PortfolioManagerAgent::new(Arc::new(Fixed(None)));
        let decision = pm
            .synthesize_signals("ETH", &MarketData::new(), &signals(), None, None)
            .await;
        assert_eq!(decision.action, DecisionAction::Hold);
        assert_eq!(decision.conviction, Conviction::Low);
        assert_eq!(decision.confidence, 50.0);
        assert!(decision.degraded);
        assert!(decision.reasoning.contains("Timeout"));
    }
}

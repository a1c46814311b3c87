//! Tolerant extraction of signals and decisions from model replies.
//!
//! Models are asked for JSON but do not always comply, so nothing here fails:
//! a reply that cannot be decoded degrades to default values.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::{
    Conviction, DecisionAction, ExecutionPlan, FinalDecision, OrderType, Signal, SignalAction,
    SignalOrigin,
};

/// Maximum characters of raw reply kept as fallback reasoning
pub const FALLBACK_REASONING_CHARS: usize = 500;

/// Slice from the first `{` to the last `}`, if both exist in that order.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Parse a model reply into a `Signal`. Never fails.
pub fn parse_signal(text: &str, token: &str, agent_name: &str) -> Signal {
    match decode_object(text) {
        Some(obj) => signal_from_object(&obj, text, token, agent_name),
        None => Signal::at_default_confidence(
            keyword_action(text),
            truncate_chars(text, FALLBACK_REASONING_CHARS),
            token,
            agent_name,
            SignalOrigin::TextFallback,
        ),
    }
}

/// Parse a portfolio manager reply. Missing or undecodable JSON yields hold/low/50.
pub fn parse_decision(text: &str) -> FinalDecision {
    let Some(obj) = decode_object(text) else {
        return FinalDecision::fallback(truncate_chars(text, FALLBACK_REASONING_CHARS));
    };

    let action = str_field(&obj, "action")
        .and_then(|s| s.parse::<DecisionAction>().ok())
        .unwrap_or(DecisionAction::Hold);
    let conviction = str_field(&obj, "conviction")
        .and_then(|s| s.parse::<Conviction>().ok())
        .unwrap_or(Conviction::Low);

    let agent_weights_used = obj
        .get("agent_weights_used")
        .and_then(Value::as_object)
        .map(|weights| {
            weights
                .iter()
                .filter_map(|(name, w)| lenient_number(w).map(|w| (name.clone(), w)))
                .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default();

    FinalDecision {
        action,
        conviction,
        confidence: confidence_field(&obj),
        reasoning: str_field(&obj, "reasoning")
            .map(str::to_string)
            .unwrap_or_else(|| truncate_chars(text, FALLBACK_REASONING_CHARS)),
        execution_plan: obj
            .get("execution_plan")
            .and_then(Value::as_object)
            .map(plan_from_object),
        agent_weights_used,
        consensus_summary: str_field(&obj, "consensus_summary")
            .unwrap_or_default()
            .to_string(),
        key_factors: string_list(obj.get("key_factors")),
        risks_acknowledged: string_list(obj.get("risks_acknowledged")),
        degraded: false,
    }
}

/// Number or numeric string such as `"5%"`, `"$1,250"` or `" 72 "`.
pub fn lenient_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, '$' | '%' | ',') && !c.is_whitespace())
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn decode_object(text: &str) -> Option<Map<String, Value>> {
    let candidate = extract_json_object(text)?;
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

fn signal_from_object(obj: &Map<String, Value>, raw: &str, token: &str, agent_name: &str) -> Signal {
    let action = str_field(obj, "action")
        .map(|s| s.parse::<SignalAction>().unwrap_or_else(|_| keyword_action(s)))
        .unwrap_or(SignalAction::Neutral);
    let reasoning = str_field(obj, "reasoning")
        .map(str::to_string)
        .unwrap_or_else(|| truncate_chars(raw, FALLBACK_REASONING_CHARS));

    match Signal::new(action, confidence_field(obj), reasoning.clone(), token, agent_name) {
        Ok(signal) => signal.with_details(
            string_list(obj.get("data_used")),
            string_list(obj.get("key_metrics")),
            string_list(obj.get("risks")),
        ),
        Err(_) => Signal::neutral_default(reasoning, token, agent_name, SignalOrigin::Model),
    }
}

fn plan_from_object(obj: &Map<String, Value>) -> ExecutionPlan {
    ExecutionPlan {
        order_type: str_field(obj, "order_type")
            .and_then(|s| s.parse::<OrderType>().ok())
            .unwrap_or_default(),
        entry_price: text_field(obj.get("entry_price")),
        position_size_pct: obj.get("position_size_pct").and_then(lenient_number),
        position_size_usd: obj.get("position_size_usd").and_then(lenient_number),
        stop_loss: text_field(obj.get("stop_loss")),
        take_profit: string_list(obj.get("take_profit")),
    }
}

fn keyword_action(text: &str) -> SignalAction {
    let lower = text.to_lowercase();
    if lower.contains("bullish") {
        SignalAction::Bullish
    } else if lower.contains("bearish") {
        SignalAction::Bearish
    } else {
        SignalAction::Neutral
    }
}

fn confidence_field(obj: &Map<String, Value>) -> f64 {
    obj.get("confidence")
        .and_then(lenient_number)
        .unwrap_or(50.0)
        .clamp(0.0, 100.0)
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

fn text_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_reply() {
        let signal = parse_signal(
            r#"{"action":"bullish","confidence":82,"reasoning":"x"}"#,
            "SOL",
            "Warren Buffett",
        );
        assert_eq!(signal.action(), SignalAction::Bullish);
        assert_eq!(signal.confidence(), 82.0);
        assert_eq!(signal.reasoning(), "x");
        assert_eq!(signal.token(), "SOL");
        assert_eq!(signal.agent_name(), "Warren Buffett");
        assert!(signal.data_used().is_empty());
        assert!(signal.key_metrics().is_empty());
        assert!(signal.risks().is_empty());
        assert_eq!(signal.origin(), SignalOrigin::Model);
    }

    #[test]
    fn test_json_wrapped_in_prose() {
        let reply = "Here is my view:\n```json\n{\"action\": \"Bearish\", \"confidence\": \"65%\", \
                     \"reasoning\": \"Overextended\", \"risks\": [\"unlock\", 3]}\n```\nThanks";
        let signal = parse_signal(reply, "JUP", "Michael Burry");
        assert_eq!(signal.action(), SignalAction::Bearish);
        assert_eq!(signal.confidence(), 65.0);
        assert_eq!(signal.risks(), ["unlock".to_string(), "3".to_string()]);
    }

    #[test]
    fn test_keyword_fallback_bearish() {
        let signal = parse_signal("I am bearish on this one, no JSON for you", "WIF", "Degen Trader");
        assert_eq!(signal.action(), SignalAction::Bearish);
        assert_eq!(signal.confidence(), 50.0);
        assert_eq!(signal.origin(), SignalOrigin::TextFallback);
    }

    #[test]
    fn test_keyword_fallback_neutral() {
        let signal = parse_signal("Hard to say. Wait and see.", "WIF", "Degen Trader");
        assert_eq!(signal.action(), SignalAction::Neutral);
        assert_eq!(signal.confidence(), 50.0);
        assert_eq!(signal.reasoning(), "Hard to say. Wait and see.");
    }

    #[test]
    fn test_bullish_checked_before_bearish() {
        let signal = parse_signal("not bearish, actually bullish", "X", "A");
        assert_eq!(signal.action(), SignalAction::Bullish);
    }

    #[test]
    fn test_broken_json_falls_back_and_truncates() {
        let reply = format!("{{\"action\": \"bullish\", {}", "a".repeat(1000));
        let signal = parse_signal(&reply, "X", "A");
        assert_eq!(signal.action(), SignalAction::Bullish);
        assert_eq!(signal.origin(), SignalOrigin::TextFallback);
        assert_eq!(signal.reasoning().chars().count(), 500);
    }

    #[test]
    fn test_coerces_bad_fields() {
        let signal = parse_signal(
            r#"{"action":"very bullish!!","confidence":180}"#,
            "X",
            "A",
        );
        assert_eq!(signal.action(), SignalAction::Bullish);
        assert_eq!(signal.confidence(), 100.0);

        let signal = parse_signal(r#"{"action":"moon","confidence":-4}"#, "X", "A");
        assert_eq!(signal.action(), SignalAction::Neutral);
        assert_eq!(signal.confidence(), 0.0);
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(extract_json_object("a {\"b\": {\"c\": 1}} d"), Some("{\"b\": {\"c\": 1}}"));
        assert_eq!(extract_json_object("} backwards {"), None);
        assert_eq!(extract_json_object("nothing"), None);
    }

    #[test]
    fn test_parse_decision_full() {
        let reply = r#"{
            "action": "buy",
            "conviction": "medium",
            "confidence": 71,
            "reasoning": "Value and on-chain agree",
            "execution_plan": {
                "order_type": "limit",
                "entry_price": 142.5,
                "position_size_pct": "3%",
                "position_size_usd": "$300",
                "stop_loss": "128",
                "take_profit": ["155", "170", "190"]
            },
            "agent_weights_used": {"Warren Buffett": 0.3, "On-Chain Analyst": "0.2"},
            "consensus_summary": "6 of 10 bullish",
            "key_factors": ["TVL growth"],
            "risks_acknowledged": ["Beta to BTC"]
        }"#;
        let decision = parse_decision(reply);
        assert_eq!(decision.action, DecisionAction::Buy);
        assert_eq!(decision.conviction, Conviction::Medium);
        assert_eq!(decision.confidence, 71.0);
        let plan = decision.execution_plan.unwrap();
        assert_eq!(plan.order_type, OrderType::Limit);
        assert_eq!(plan.entry_price, "142.5");
        assert_eq!(plan.position_size_pct, Some(3.0));
        assert_eq!(plan.position_size_usd, Some(300.0));
        assert_eq!(plan.take_profit.len(), 3);
        assert_eq!(decision.agent_weights_used.get("On-Chain Analyst"), Some(&0.2));
        assert!(!decision.degraded);
    }

    #[test]
    fn test_parse_decision_fallback() {
        let decision = parse_decision("Buy it all, trust me");
        assert_eq!(decision.action, DecisionAction::Hold);
        assert_eq!(decision.conviction, Conviction::Low);
        assert_eq!(decision.confidence, 50.0);
        assert_eq!(decision.reasoning, "Buy it all, trust me");
        assert!(decision.execution_plan.is_none());
    }

    #[test]
    fn test_lenient_number() {
        assert_eq!(lenient_number(&Value::from("$1,250.5")), Some(1250.5));
        assert_eq!(lenient_number(&Value::from(" 72 ")), Some(72.0));
        assert_eq!(lenient_number(&Value::from("5-10%")), None);
        assert_eq!(lenient_number(&Value::Bool(true)), None);
    }
}

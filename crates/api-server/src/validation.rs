use agent_core::Context;
use portfolio_manager::HunterSignal;
use std::fmt;

pub const MAX_TOKEN_CHARS: usize = 100;
pub const MAX_CONTEXT_KEYS: usize = 20;
pub const MAX_CONTEXT_KEY_CHARS: usize = 50;
pub const MAX_CONTEXT_VALUE_CHARS: usize = 1000;
pub const MAX_SIGNALS_PER_BATCH: usize = 100;

/// `^[a-zA-Z0-9_-]{1,100}$`
fn is_identifier(value: &str) -> bool {
    (1..=MAX_TOKEN_CHARS).contains(&value.len())
        && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// A request field that failed a boundary check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Symbols and addresses: letters, digits, `_` and `-`, 1 to 100 chars.
pub fn validate_token(token: &str) -> Result<(), ValidationError> {
    if is_identifier(token) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "token",
            format!("must match [a-zA-Z0-9_-] and be 1-{} characters", MAX_TOKEN_CHARS),
        ))
    }
}

pub fn validate_context(context: Option<&Context>) -> Result<(), ValidationError> {
    let Some(context) = context else {
        return Ok(());
    };

    if context.len() > MAX_CONTEXT_KEYS {
        return Err(ValidationError::new(
            "context",
            format!("too many keys (max {})", MAX_CONTEXT_KEYS),
        ));
    }

    for (key, value) in context {
        if key.chars().count() > MAX_CONTEXT_KEY_CHARS {
            let short: String = key.chars().take(20).collect();
            return Err(ValidationError::new("context", format!("key too long: {}...", short)));
        }
        let rendered = match value {
            serde_json::Value::String(s) => s.chars().count(),
            other => other.to_string().chars().count(),
        };
        if rendered > MAX_CONTEXT_VALUE_CHARS {
            return Err(ValidationError::new(
                "context",
                format!("value for '{}' too long (max {})", key, MAX_CONTEXT_VALUE_CHARS),
            ));
        }
    }

    Ok(())
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ValidationError::new(field, format!("length must be {}-{}", min, max)));
    }
    Ok(())
}

fn check_list(field: &str, items: &[String], max_items: usize, max_chars: usize) -> Result<(), ValidationError> {
    if items.len() > max_items {
        return Err(ValidationError::new(field, format!("too many entries (max {})", max_items)));
    }
    if items.iter().any(|item| item.chars().count() > max_chars) {
        return Err(ValidationError::new(field, format!("entries must be at most {} characters", max_chars)));
    }
    Ok(())
}

/// Shape checks on a hunter signal. Business filtering happens afterwards.
pub fn validate_hunter_signal(signal: &HunterSignal) -> Result<(), ValidationError> {
    if !is_identifier(&signal.id) {
        return Err(ValidationError::new("id", "must match [a-zA-Z0-9_-] and be 1-100 characters"));
    }
    check_len("type", &signal.signal_type, 1, 50)?;
    check_len("source", &signal.source, 1, 100)?;
    if let Some(token) = &signal.token {
        validate_token(token)?;
    }
    if !(0.0..=100.0).contains(&signal.confidence) {
        return Err(ValidationError::new("confidence", "must be between 0 and 100"));
    }
    check_len("title", &signal.title, 1, 200)?;
    check_len("description", &signal.description, 1, 2000)?;
    check_len("reasoning", &signal.reasoning, 1, 2000)?;
    check_list("riskFactors", &signal.risk_factors, 20, 200)?;
    check_list("tags", &signal.tags, 20, 50)?;
    if signal.metrics.len() > 50 {
        return Err(ValidationError::new("metrics", "too many keys (max 50)"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signal() -> HunterSignal {
        serde_json::from_value(json!({
            "id": "hunt_001",
            "type": "whale_buy",
            "source": "whale-hunter",
            "token": "BONK",
            "action": "buy",
            "confidence": 82,
            "urgency": "immediate",
            "title": "Whale accumulation",
            "description": "Three wallets added 2% of supply",
            "reasoning": "Smart money is early",
            "risk": "high"
        }))
        .unwrap()
    }

    #[test]
    fn test_token_pattern() {
        assert!(validate_token("SOL").is_ok());
        assert!(validate_token("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").is_ok());
        assert!(validate_token("wrapped-btc_v2").is_ok());
        assert!(validate_token("").is_err());
        assert!(validate_token("SOL; DROP TABLE").is_err());
        assert!(validate_token(&"A".repeat(101)).is_err());
    }

    #[test]
    fn test_context_limits() {
        let ok = json!({"notes": "fine"});
        assert!(validate_context(ok.as_object()).is_ok());
        assert!(validate_context(None).is_ok());

        let mut many = serde_json::Map::new();
        for i in 0..21 {
            many.insert(format!("k{}", i), json!(i));
        }
        assert_eq!(validate_context(Some(&many)).unwrap_err().field, "context");

        let long_key = json!({"k".repeat(51): 1});
        assert!(validate_context(long_key.as_object()).is_err());

        let long_value = json!({"notes": "x".repeat(1001)});
        assert!(validate_context(long_value.as_object()).is_err());
    }

    #[test]
    fn test_hunter_signal_shape() {
        assert!(validate_hunter_signal(&signal()).is_ok());

        let mut bad_id = signal();
        bad_id.id = "has space".into();
        assert_eq!(validate_hunter_signal(&bad_id).unwrap_err().field, "id");

        let mut empty_title = signal();
        empty_title.title.clear();
        assert_eq!(validate_hunter_signal(&empty_title).unwrap_err().field, "title");

        let mut too_sure = signal();
        too_sure.confidence = 101.0;
        assert_eq!(validate_hunter_signal(&too_sure).unwrap_err().field, "confidence");

        let mut tags = signal();
        tags.tags = vec!["t".into(); 21];
        assert_eq!(validate_hunter_signal(&tags).unwrap_err().field, "tags");

        let mut factor = signal();
        factor.risk_factors = vec!["r".repeat(201)];
        assert_eq!(validate_hunter_signal(&factor).unwrap_err().field, "riskFactors");
    }
}

//! Context sanitization applied before caller text is interpolated into a prompt.
//!
//! This is a textual filter against casual or accidental prompt injection,
//! not a security boundary.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::Context;

/// Per-value character limit
pub const DEFAULT_MAX_VALUE_CHARS: usize = 500;

/// Context keys that may reach a prompt. Everything else is dropped.
pub const ALLOWED_CONTEXT_KEYS: &[&str] = &[
    "market_sentiment",
    "news_summary",
    "price_action",
    "volume_analysis",
    "aggregate_sentiment",
    "avg_confidence",
    "portfolio",
    "notes",
];

pub const NONE_PROVIDED: &str = "None provided";

lazy_static! {
    static ref INJECTION_PATTERNS: Vec<Regex> = [
        r"(?i)ignore\s+(all\s+)?(previous\s+)?instructions?",
        r"(?i)disregard\s+(all\s+)?(previous\s+)?",
        r"(?i)forget\s+(all\s+)?(previous\s+)?",
        r"(?i)new\s+instructions?:",
        r"(?i)system\s*:",
        r"(?i)assistant\s*:",
        r"(?i)human\s*:",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect();
}

/// Sanitize a context map with the default value limit.
pub fn sanitize_context(context: Option<&Context>) -> String {
    sanitize_context_with_limit(context, DEFAULT_MAX_VALUE_CHARS)
}

/// Render allow-listed entries as `- key: value` lines, or `None provided`.
pub fn sanitize_context_with_limit(context: Option<&Context>, max_chars: usize) -> String {
    let Some(context) = context else {
        return NONE_PROVIDED.to_string();
    };

    let lines: Vec<String> = context
        .iter()
        .filter(|(key, _)| ALLOWED_CONTEXT_KEYS.contains(&key.as_str()))
        .map(|(key, value)| format!("- {}: {}", key, sanitize_value(value, max_chars)))
        .collect();

    if lines.is_empty() {
        NONE_PROVIDED.to_string()
    } else {
        lines.join("\n")
    }
}

/// Truncate, filter injection phrases and neutralize template/fence syntax.
pub fn sanitize_text(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    for pattern in INJECTION_PATTERNS.iter() {
        out = pattern.replace_all(&out, "[FILTERED]").into_owned();
    }
    out.replace('{', "[")
        .replace('}', "]")
        .replace("```", "'''")
}

fn sanitize_value(value: &Value, max_chars: usize) -> String {
    match value {
        Value::String(s) => sanitize_text(s, max_chars),
        other => sanitize_text(&other.to_string(), max_chars),
    }
}

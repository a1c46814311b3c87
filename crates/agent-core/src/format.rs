//! Human-readable rendering of market data for prompts.

use serde_json::Value;

use crate::MarketData;

/// Render every usable entry as a `- Key: value` line.
///
/// Nulls and `"N/A"` strings are skipped. Floats are formatted by key:
/// percent/change fields as `x.xx%`, sub-dollar magnitudes with six decimals,
/// everything else as a dollar amount with thousands separators. The sign
/// goes before the `$`.
pub fn format_market_data(data: &MarketData) -> String {
    let lines: Vec<String> = data
        .iter()
        .filter_map(|(key, value)| {
            let rendered = render(key, value)?;
            Some(format!("- {}: {}", title_case(&key.replace('_', " ")), rendered))
        })
        .collect();

    if lines.is_empty() {
        "No market data available".to_string()
    } else {
        lines.join("\n")
    }
}

/// Format one entry by key, `N/A` when absent or unusable.
pub fn format_value(data: &MarketData, key: &str) -> String {
    data.get(key)
        .and_then(|v| render(key, v))
        .unwrap_or_else(|| "N/A".to_string())
}

fn render(key: &str, value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s == "N/A" => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_f64() => n.as_f64().map(|v| format_float(key, v)),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn format_float(key: &str, value: f64) -> String {
    let key = key.to_ascii_lowercase();
    if key.contains("percent") || key.contains("change") {
        return format!("{:.2}%", value);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    if value.abs() < 1.0 {
        format!("{}${:.6}", sign, value.abs())
    } else {
        format!("{}${}", sign, with_thousands(value.abs()))
    }
}

/// Two decimals with comma-grouped integer part
pub fn with_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// Upper-case a letter when the previous character is not a letter.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_letter = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_letter = true;
        } else {
            out.push(ch);
            prev_letter = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> MarketData {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_price_formats() {
        let md = data(json!({
            "price": 0.00123456,
            "market_cap": 1234567.891,
            "change_24h": 5.2,
            "price_change_percent": -3.456,
        }));
        let out = format_market_data(&md);
        assert_eq!(
            out,
            "- Price: $0.001235\n\
             - Market Cap: $1,234,567.89\n\
             - Change 24H: 5.20%\n\
             - Price Change Percent: -3.46%"
        );
    }

    #[test]
    fn test_skips_missing_values() {
        let md = data(json!({"price": 2.5, "ath": null, "category": "N/A", "dex": "raydium"}));
        let out = format_market_data(&md);
        assert_eq!(out, "- Price: $2.50\n- Dex: raydium");
    }

    #[test]
    fn test_integers_printed_raw() {
        let md = data(json!({"buys_24h": 1200, "holders": 35000}));
        assert_eq!(format_market_data(&md), "- Buys 24H: 1200\n- Holders: 35000");
    }

    #[test]
    fn test_empty_data() {
        assert_eq!(format_market_data(&MarketData::new()), "No market data available");
    }

    #[test]
    fn test_negative_amounts() {
        let md = data(json!({
            "net_flow": -45000.0,
            "funding": -0.25,
            "price_change_24h": -12.5,
        }));
        assert_eq!(format_value(&md, "net_flow"), "-$45,000.00");
        assert_eq!(format_value(&md, "funding"), "-$0.250000");
        assert_eq!(format_value(&md, "price_change_24h"), "-12.50%");
    }

    #[test]
    fn test_with_thousands() {
        assert_eq!(with_thousands(1.0), "1.00");
        assert_eq!(with_thousands(999.999), "1,000.00");
        assert_eq!(with_thousands(1234567.0), "1,234,567.00");
        assert_eq!(with_thousands(-45000.5), "-45,000.50");
    }

    #[test]
    fn test_format_value() {
        let md = data(json!({"volume_24h": 98765.4321}));
        assert_eq!(format_value(&md, "volume_24h"), "$98,765.43");
        assert_eq!(format_value(&md, "market_cap"), "N/A");
    }
}

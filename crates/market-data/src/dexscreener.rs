use agent_core::{Chain, MarketData};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{MarketDataError, MarketDataResult};
use crate::insert_number;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    pairs: Option<Vec<Pair>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pair {
    chain_id: String,
    #[serde(default)]
    dex_id: Option<String>,
    #[serde(default)]
    pair_address: Option<String>,
    base_token: BaseToken,
    #[serde(default)]
    price_usd: Option<String>,
    #[serde(default)]
    price_change: Option<Windows>,
    #[serde(default)]
    volume: Option<Windows>,
    #[serde(default)]
    liquidity: Option<Liquidity>,
    #[serde(default)]
    fdv: Option<f64>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    txns: Option<Txns>,
    #[serde(default)]
    pair_created_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct BaseToken {
    address: String,
    symbol: String,
}

#[derive(Debug, Default, Deserialize)]
struct Windows {
    m5: Option<f64>,
    h1: Option<f64>,
    h6: Option<f64>,
    h24: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Liquidity {
    usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Txns {
    h24: Option<TxnCounts>,
}

#[derive(Debug, Deserialize)]
struct TxnCounts {
    buys: u64,
    sells: u64,
}

fn chain_id(chain: Chain) -> &'static str {
    match chain {
        Chain::Solana => "solana",
        Chain::Ethereum => "ethereum",
        Chain::Base => "base",
        Chain::Arbitrum => "arbitrum",
        Chain::Polygon => "polygon",
        Chain::Bsc => "bsc",
    }
}

/// DEX pair data, the only source for most freshly launched tokens
#[derive(Clone)]
pub struct DexScreenerSource {
    client: Client,
    base_url: String,
}

impl DexScreenerSource {
    pub const NAME: &'static str = "dexscreener";

    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Metrics of the deepest pair for `token` (symbol or mint address) on `chain`
    pub async fn fetch(&self, token: &str, chain: Chain) -> MarketDataResult<MarketData> {
        let response = self
            .client
            .get(format!("{}/latest/dex/search", self.base_url))
            .query(&[("q", token)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MarketDataError::Status(response.status().as_u16()));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| MarketDataError::InvalidResponse(e.to_string()))?;

        let wanted_chain = chain_id(chain);
        let pair = search
            .pairs
            .unwrap_or_default()
            .into_iter()
            .filter(|p| p.chain_id == wanted_chain)
            .filter(|p| {
                p.base_token.symbol.eq_ignore_ascii_case(token) || p.base_token.address == token
            })
            .max_by(|a, b| liquidity_usd(a).total_cmp(&liquidity_usd(b)))
            .ok_or_else(|| MarketDataError::NotFound(format!("{} on {}", token, chain)))?;

        Ok(pair_metrics(pair, Utc::now()))
    }
}

fn liquidity_usd(pair: &Pair) -> f64 {
    pair.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
}

fn pair_metrics(pair: Pair, now: DateTime<Utc>) -> MarketData {
    let mut data = MarketData::new();
    let change = pair.price_change.unwrap_or_default();
    let volume = pair.volume.unwrap_or_default();

    insert_number(
        &mut data,
        "price",
        pair.price_usd.as_deref().and_then(|p| p.parse::<f64>().ok()),
    );
    insert_number(&mut data, "market_cap", pair.market_cap);
    insert_number(&mut data, "fdv", pair.fdv);
    insert_number(&mut data, "volume_24h", volume.h24);
    insert_number(&mut data, "change_24h", change.h24);
    insert_number(&mut data, "liquidity", pair.liquidity.and_then(|l| l.usd));
    insert_number(&mut data, "change_5m", change.m5);
    insert_number(&mut data, "change_1h", change.h1);
    insert_number(&mut data, "change_6h", change.h6);

    if let Some(counts) = pair.txns.and_then(|t| t.h24) {
        data.insert("buys_24h".into(), Value::from(counts.buys));
        data.insert("sells_24h".into(), Value::from(counts.sells));
    }
    if let Some(dex) = pair.dex_id {
        data.insert("dex".into(), Value::from(dex));
    }
    if let Some(address) = pair.pair_address {
        data.insert("pair_address".into(), Value::from(address));
    }
    if let Some(created) = pair.pair_created_at.and_then(DateTime::from_timestamp_millis) {
        data.insert("token_age".into(), Value::from(describe_age(now - created)));
    }
    data
}

fn describe_age(age: chrono::Duration) -> String {
    let days = age.num_days();
    if days >= 1 {
        format!("{} days", days)
    } else {
        let hours = age.num_hours().max(0);
        format!("{} hours", hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pair_metrics_maps_fields() {
        let now = Utc::now();
        let created = (now - chrono::Duration::hours(5)).timestamp_millis();
        let pair: Pair = serde_json::from_value(json!({
            "chainId": "solana",
            "dexId": "pumpswap",
            "pairAddress": "PAIR1",
            "baseToken": {"address": "MINT1", "symbol": "GOAT"},
            "priceUsd": "0.0042",
            "priceChange": {"m5": 1.5, "h1": -2.0, "h6": 10.0, "h24": 55.5},
            "volume": {"h24": 120000.0},
            "liquidity": {"usd": 40000.0},
            "marketCap": 4200000.0,
            "txns": {"h24": {"buys": 900, "sells": 450}},
            "pairCreatedAt": created
        }))
        .unwrap();

        let data = pair_metrics(pair, now);
        assert_eq!(data["price"], json!(0.0042));
        assert_eq!(data["change_24h"], json!(55.5));
        assert_eq!(data["buys_24h"], json!(900));
        assert_eq!(data["dex"], json!("pumpswap"));
        assert_eq!(data["token_age"], json!("5 hours"));
        assert!(!data.contains_key("fdv"));
    }

    #[test]
    fn test_describe_age() {
        assert_eq!(describe_age(chrono::Duration::days(3)), "3 days");
        assert_eq!(describe_age(chrono::Duration::minutes(30)), "0 hours");
    }
}

pub mod coingecko;
pub mod dexscreener;
pub mod error;

pub use coingecko::CoinGeckoSource;
pub use dexscreener::DexScreenerSource;
pub use error::{MarketDataError, MarketDataResult};

use agent_core::{Chain, MarketData, MarketDataSource, MarketSnapshot, SourceReport};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

const MAJORS: &[&str] = &["btc", "eth", "wbtc", "weth"];
const LAYER_ONES: &[&str] = &[
    "sol", "bnb", "avax", "ada", "dot", "near", "apt", "sui", "sei", "atom", "ton", "trx",
];
const DEFI: &[&str] = &[
    "uni", "aave", "jup", "ray", "crv", "mkr", "ldo", "comp", "snx", "pendle", "gmx", "orca",
];
const MEME_DEXES: &[&str] = &["pumpfun", "pumpswap"];
const MEMECOIN_MARKET_CAP: f64 = 50_000_000.0;

/// Configuration for market data sources
#[derive(Debug, Clone)]
pub struct MarketDataConfig {
    pub coingecko_url: String,
    pub coingecko_api_key: Option<String>,
    pub dexscreener_url: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            coingecko_url: std::env::var("COINGECKO_BASE_URL")
                .unwrap_or_else(|_| "https://api.coingecko.com/api/v3".to_string()),
            coingecko_api_key: std::env::var("COINGECKO_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            dexscreener_url: std::env::var("DEXSCREENER_BASE_URL")
                .unwrap_or_else(|_| "https://api.dexscreener.com".to_string()),
            timeout: Duration::from_secs(
                std::env::var("MARKET_DATA_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
            cache_ttl: Duration::from_secs(
                std::env::var("MARKET_DATA_CACHE_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}

struct CacheEntry {
    snapshot: MarketSnapshot,
    cached_at: Instant,
}

/// CoinGecko + DexScreener fetcher with a short-lived snapshot cache.
#[derive(Clone)]
pub struct MarketDataClient {
    coingecko: CoinGeckoSource,
    dexscreener: DexScreenerSource,
    timeout: Duration,
    cache_ttl: Duration,
    cache: Arc<DashMap<(String, Chain), CacheEntry>>,
}

impl MarketDataClient {
    pub fn new(config: MarketDataConfig) -> MarketDataResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("hedge-desk/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            coingecko: CoinGeckoSource::new(
                client.clone(),
                config.coingecko_url,
                config.coingecko_api_key,
            ),
            dexscreener: DexScreenerSource::new(client, config.dexscreener_url),
            timeout: config.timeout,
            cache_ttl: config.cache_ttl,
            cache: Arc::new(DashMap::new()),
        })
    }

    pub fn with_defaults() -> MarketDataResult<Self> {
        Self::new(MarketDataConfig::default())
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        entry.cached_at.elapsed() < self.cache_ttl
    }

    /// Fresh snapshot for `key`. A stale entry is dropped on the way out.
    fn cached(&self, key: &(String, Chain)) -> Option<MarketSnapshot> {
        let fresh = self
            .cache
            .get(key)
            .filter(|entry| self.is_fresh(entry))
            .map(|entry| entry.snapshot.clone());
        if fresh.is_none() {
            self.cache.remove_if(key, |_, entry| !self.is_fresh(entry));
        }
        fresh
    }

    /// Insert after sweeping expired entries, so the map only holds live tokens.
    fn store(&self, key: (String, Chain), snapshot: MarketSnapshot) {
        self.cache.retain(|_, entry| self.is_fresh(entry));
        self.cache.insert(
            key,
            CacheEntry {
                snapshot,
                cached_at: Instant::now(),
            },
        );
    }

    async fn fetch_uncached(&self, token: &str, chain: Chain) -> MarketSnapshot {
        let (gecko, dex) = tokio::join!(
            bounded(self.timeout, self.coingecko.fetch(token)),
            bounded(self.timeout, self.dexscreener.fetch(token, chain)),
        );

        let mut snapshot = MarketSnapshot::new(token, chain);
        for (name, result) in [
            (CoinGeckoSource::NAME, gecko),
            (DexScreenerSource::NAME, dex),
        ] {
            match result {
                Ok(data) => {
                    for (key, value) in data {
                        snapshot.data.entry(key).or_insert(value);
                    }
                    snapshot.sources.push(SourceReport::available(name));
                }
                Err(e) => {
                    tracing::warn!(token, chain = %chain, source = name, "Market data source unavailable: {}", e);
                    snapshot.sources.push(SourceReport::unavailable(name, e.to_string()));
                }
            }
        }

        if !snapshot.data.is_empty() {
            let category = classify(token, &snapshot.data);
            snapshot.data.insert("category".into(), Value::from(category));
        }
        snapshot
    }
}

#[async_trait]
impl MarketDataSource for MarketDataClient {
    async fn fetch(&self, token: &str, chain: Chain) -> MarketSnapshot {
        let key = (token.to_ascii_uppercase(), chain);
        if let Some(snapshot) = self.cached(&key) {
            tracing::debug!(token, chain = %chain, "Market data cache hit");
            return snapshot;
        }

        let snapshot = self.fetch_uncached(token, chain).await;
        if snapshot.has_price() {
            self.store(key, snapshot.clone());
        }
        snapshot
    }

    fn source_name(&self) -> &'static str {
        "coingecko+dexscreener"
    }
}

async fn bounded<T>(
    limit: Duration,
    fut: impl Future<Output = MarketDataResult<T>>,
) -> MarketDataResult<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(MarketDataError::Timeout(limit.as_secs())),
    }
}

/// Coarse asset category used to weight agents during synthesis.
pub fn classify(token: &str, data: &MarketData) -> &'static str {
    let symbol = token.to_ascii_lowercase();
    if MAJORS.contains(&symbol.as_str()) {
        return "major";
    }
    if LAYER_ONES.contains(&symbol.as_str()) {
        return "l1";
    }
    if DEFI.contains(&symbol.as_str()) {
        return "defi";
    }

    let meme_dex = data
        .get("dex")
        .and_then(Value::as_str)
        .map(|dex| MEME_DEXES.contains(&dex))
        .unwrap_or(false);
    let small_cap = data
        .get("market_cap")
        .and_then(Value::as_f64)
        .map(|cap| cap < MEMECOIN_MARKET_CAP)
        .unwrap_or(false);

    if meme_dex || small_cap {
        "memecoin"
    } else {
        "altcoin"
    }
}

/// Insert a finite float, skipping missing values.
pub(crate) fn insert_number(data: &mut MarketData, key: &str, value: Option<f64>) {
    if let Some(v) = value.filter(|v| v.is_finite()) {
        data.insert(key.to_string(), Value::from(v));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::Availability;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> MarketDataClient {
        MarketDataClient::new(MarketDataConfig {
            coingecko_url: server.uri(),
            coingecko_api_key: None,
            dexscreener_url: server.uri(),
            timeout: Duration::from_secs(2),
            cache_ttl: Duration::from_secs(60),
        })
        .unwrap()
    }

    async fn mount_sol_markets(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/coins/markets"))
            .and(query_param("ids", "solana"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "current_price": 142.5,
                "market_cap": 65000000000.0,
                "total_volume": 2100000000.0,
                "price_change_percentage_24h": 3.2,
                "ath": 259.0
            }])))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_merges_sources_coingecko_first() {
        let server = MockServer::start().await;
        mount_sol_markets(&server).await;
        Mock::given(method("GET"))
            .and(path("/latest/dex/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pairs": [
                    {
                        "chainId": "solana", "dexId": "raydium", "pairAddress": "P1",
                        "baseToken": {"address": "So111", "symbol": "SOL"},
                        "priceUsd": "142.1", "liquidity": {"usd": 9000000.0},
                        "priceChange": {"h1": 0.4}
                    },
                    {
                        "chainId": "ethereum", "dexId": "uniswap",
                        "baseToken": {"address": "0xsol", "symbol": "SOL"},
                        "priceUsd": "140.0", "liquidity": {"usd": 99000000.0}
                    }
                ]
            })))
            .mount(&server)
            .await;

        let snapshot = client_for(&server).fetch("SOL", Chain::Solana).await;
        assert_eq!(snapshot.price(), Some(142.5));
        assert_eq!(snapshot.data["change_1h"], json!(0.4));
        assert_eq!(snapshot.data["dex"], json!("raydium"));
        assert_eq!(snapshot.data["category"], json!("l1"));
        assert!(snapshot.sources.iter().all(|s| s.availability.is_available()));
        let keys: Vec<&String> = snapshot.data.keys().collect();
        assert_eq!(keys[0], "price");
    }

    #[tokio::test]
    async fn test_failed_source_reported_unavailable() {
        let server = MockServer::start().await;
        mount_sol_markets(&server).await;
        Mock::given(method("GET"))
            .and(path("/latest/dex/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let snapshot = client_for(&server).fetch("SOL", Chain::Solana).await;
        assert!(snapshot.has_price());
        let dex = snapshot
            .sources
            .iter()
            .find(|s| s.source == DexScreenerSource::NAME)
            .unwrap();
        assert_eq!(
            dex.availability,
            Availability::Unavailable { reason: "HTTP 503".into() }
        );
    }

    #[tokio::test]
    async fn test_unknown_token_has_no_price() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"coins": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/latest/dex/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pairs": null})))
            .mount(&server)
            .await;

        let snapshot = client_for(&server).fetch("NOPE", Chain::Base).await;
        assert!(!snapshot.has_price());
        assert!(snapshot.data.is_empty());
        assert_eq!(snapshot.sources.len(), 2);
        assert!(snapshot.sources.iter().all(|s| !s.availability.is_available()));
    }

    #[tokio::test]
    async fn test_snapshot_cached_per_token_and_chain() {
        let server = MockServer::start().await;
        mount_sol_markets(&server).await;
        Mock::given(method("GET"))
            .and(path("/latest/dex/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pairs": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let first = client.fetch("SOL", Chain::Solana).await;
        let second = client.fetch("sol", Chain::Solana).await;
        assert_eq!(first.price(), second.price());
        assert_eq!(first.fetched_at, second.fetched_at);
    }

    #[tokio::test]
    async fn test_expired_entries_are_dropped() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let stale = Instant::now().checked_sub(Duration::from_secs(120)).unwrap();
        for token in ["OLD1", "OLD2"] {
            client.cache.insert(
                (token.to_string(), Chain::Solana),
                CacheEntry {
                    snapshot: MarketSnapshot::new(token, Chain::Solana),
                    cached_at: stale,
                },
            );
        }

        assert!(client.cached(&("OLD1".to_string(), Chain::Solana)).is_none());
        assert_eq!(client.cache.len(), 1);

        client.store(("NEW".to_string(), Chain::Solana), MarketSnapshot::new("NEW", Chain::Solana));
        assert_eq!(client.cache.len(), 1);
        assert!(client.cached(&("NEW".to_string(), Chain::Solana)).is_some());
    }

    #[test]
    fn test_classify() {
        let mut data = MarketData::new();
        assert_eq!(classify("ETH", &data), "major");
        assert_eq!(classify("JUP", &data), "defi");
        assert_eq!(classify("RNDR", &data), "altcoin");
        data.insert("market_cap".into(), json!(3_000_000.0));
        assert_eq!(classify("GOAT", &data), "memecoin");
        data.insert("market_cap".into(), json!(900_000_000.0));
        data.insert("dex".into(), json!("pumpswap"));
        assert_eq!(classify("FART", &data), "memecoin");
    }
}

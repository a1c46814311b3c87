use agent_core::MarketData;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{MarketDataError, MarketDataResult};
use crate::insert_number;

/// Well-known symbols that CoinGecko's search ranks poorly or ambiguously
const KNOWN_IDS: &[(&str, &str)] = &[
    ("btc", "bitcoin"),
    ("eth", "ethereum"),
    ("sol", "solana"),
    ("bnb", "binancecoin"),
    ("xrp", "ripple"),
    ("ada", "cardano"),
    ("avax", "avalanche-2"),
    ("doge", "dogecoin"),
    ("dot", "polkadot"),
    ("link", "chainlink"),
    ("uni", "uniswap"),
    ("aave", "aave"),
    ("arb", "arbitrum"),
    ("op", "optimism"),
    ("sui", "sui"),
    ("ton", "the-open-network"),
    ("jup", "jupiter-exchange-solana"),
    ("bonk", "bonk"),
    ("wif", "dogwifcoin"),
    ("pepe", "pepe"),
];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    coins: Vec<SearchCoin>,
}

#[derive(Debug, Deserialize)]
struct SearchCoin {
    id: String,
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct CoinMarket {
    current_price: Option<f64>,
    market_cap: Option<f64>,
    total_volume: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    price_change_percentage_7d_in_currency: Option<f64>,
    price_change_percentage_30d_in_currency: Option<f64>,
    ath: Option<f64>,
    ath_change_percentage: Option<f64>,
    fully_diluted_valuation: Option<f64>,
    circulating_supply: Option<f64>,
}

/// CoinGecko market data for listed tokens
#[derive(Clone)]
pub struct CoinGeckoSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoSource {
    pub const NAME: &'static str = "coingecko";

    pub fn new(client: Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.get(format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.header("x-cg-pro-api-key", key),
            None => builder,
        }
    }

    async fn resolve_id(&self, token: &str) -> MarketDataResult<String> {
        let symbol = token.to_ascii_lowercase();
        if let Some((_, id)) = KNOWN_IDS.iter().find(|(s, _)| *s == symbol) {
            return Ok(id.to_string());
        }

        let response = self.get("/search").query(&[("query", token)]).send().await?;
        if !response.status().is_success() {
            return Err(MarketDataError::Status(response.status().as_u16()));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| MarketDataError::InvalidResponse(e.to_string()))?;

        search
            .coins
            .into_iter()
            .find(|coin| coin.symbol.eq_ignore_ascii_case(token))
            .map(|coin| coin.id)
            .ok_or_else(|| MarketDataError::NotFound(token.to_string()))
    }

    /// Price, supply and performance metrics for `token`
    pub async fn fetch(&self, token: &str) -> MarketDataResult<MarketData> {
        let id = self.resolve_id(token).await?;

        let response = self
            .get("/coins/markets")
            .query(&[
                ("vs_currency", "usd"),
                ("ids", id.as_str()),
                ("price_change_percentage", "7d,30d"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MarketDataError::Status(response.status().as_u16()));
        }

        let markets: Vec<CoinMarket> = response
            .json()
            .await
            .map_err(|e| MarketDataError::InvalidResponse(e.to_string()))?;
        let market = markets
            .into_iter()
            .next()
            .ok_or_else(|| MarketDataError::NotFound(id.clone()))?;

        let mut data = MarketData::new();
        insert_number(&mut data, "price", market.current_price);
        insert_number(&mut data, "market_cap", market.market_cap);
        insert_number(&mut data, "volume_24h", market.total_volume);
        insert_number(&mut data, "change_24h", market.price_change_percentage_24h);
        insert_number(&mut data, "change_7d", market.price_change_percentage_7d_in_currency);
        insert_number(&mut data, "change_30d", market.price_change_percentage_30d_in_currency);
        insert_number(&mut data, "ath", market.ath);
        insert_number(&mut data, "ath_change", market.ath_change_percentage);
        insert_number(&mut data, "fdv", market.fully_diluted_valuation);
        insert_number(&mut data, "circulating_supply", market.circulating_supply);

        tracing::debug!(token, coin_id = %id, fields = data.len(), "CoinGecko data fetched");
        Ok(data)
    }
}

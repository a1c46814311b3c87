use async_trait::async_trait;
use crate::{Chain, MarketSnapshot};

/// Trait for market data providers.
///
/// Fetching never fails outright: each upstream that could not be reached is
/// reported as unavailable in `MarketSnapshot::sources`.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch(&self, token: &str, chain: Chain) -> MarketSnapshot;

    fn source_name(&self) -> &'static str;
}

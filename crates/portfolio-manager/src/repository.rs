use agent_core::Chain;
use async_trait::async_trait;
use std::sync::Arc;

use crate::db::PortfolioDb;
use crate::error::RepoResult;
use crate::memory::{MemoryPositions, MemorySignals, MemoryStats, MemoryTrades};
use crate::models::{
    DailyStats, HunterSignal, NewPosition, NewTrade, Position, PositionChange, SignalStatus, StoredSignal, Trade,
};
use crate::sqlite::{SqlitePositions, SqliteSignals, SqliteStats, SqliteTrades};

#[async_trait]
pub trait PositionRepository: Send + Sync {
    /// Open a position and record its opening trade. Conflict when one is
    /// already open for the token and chain.
    async fn create(&self, position: NewPosition) -> RepoResult<PositionChange>;
    async fn list_open(&self) -> RepoResult<Vec<Position>>;
    /// Every position, newest first.
    async fn list_all(&self) -> RepoResult<Vec<Position>>;
    async fn find_open(&self, token: &str, chain: Chain) -> RepoResult<Option<Position>>;
    /// Refresh the price and recompute P&L. NotFound without an open position.
    async fn update_price(&self, token: &str, chain: Chain, current_price: f64) -> RepoResult<Position>;
    /// Mark the open position closed and record the closing trade at the last
    /// known price. NotFound when missing or already closed.
    async fn close(&self, token: &str, chain: Chain) -> RepoResult<PositionChange>;
}

#[async_trait]
pub trait TradeRepository: Send + Sync {
    async fn record(&self, trade: NewTrade) -> RepoResult<Trade>;
    /// Trades executed since midnight UTC, newest first.
    async fn list_today(&self) -> RepoResult<Vec<Trade>>;
    async fn list_recent(&self, limit: usize) -> RepoResult<Vec<Trade>>;
    async fn list_for_position(&self, position_id: &str) -> RepoResult<Vec<Trade>>;
}

#[async_trait]
pub trait SignalRepository: Send + Sync {
    /// Store as queued. Conflict on a duplicate id.
    async fn create(&self, signal: HunterSignal) -> RepoResult<StoredSignal>;
    async fn get(&self, id: &str) -> RepoResult<Option<StoredSignal>>;
    /// Queued signals, newest first.
    async fn queue(&self, limit: usize) -> RepoResult<Vec<StoredSignal>>;
    async fn transition(
        &self,
        id: &str,
        next: SignalStatus,
        analysis: Option<serde_json::Value>,
    ) -> RepoResult<StoredSignal>;
    /// Drop queued signals only, returning how many went.
    async fn clear_queue(&self) -> RepoResult<u64>;
}

#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn today(&self) -> RepoResult<DailyStats>;
    async fn add_pnl(&self, amount: f64) -> RepoResult<DailyStats>;
    async fn increment_trades(&self) -> RepoResult<DailyStats>;
    async fn record_signals(&self, received: i64, queued: i64, rejected: i64) -> RepoResult<DailyStats>;
    /// Sum of P&L over every recorded day.
    async fn total_pnl(&self) -> RepoResult<f64>;
}

/// One handle per store, chosen once at start-up.
#[derive(Clone)]
pub struct Repositories {
    pub positions: Arc<dyn PositionRepository>,
    pub trades: Arc<dyn TradeRepository>,
    pub signals: Arc<dyn SignalRepository>,
    pub stats: Arc<dyn StatsRepository>,
    backend: &'static str,
}

impl Repositories {
    pub fn in_memory() -> Self {
        let trades = MemoryTrades::default();
        Self {
            positions: Arc::new(MemoryPositions::with_ledger(&trades)),
            trades: Arc::new(trades),
            signals: Arc::new(MemorySignals::default()),
            stats: Arc::new(MemoryStats::default()),
            backend: "memory",
        }
    }

    pub fn sqlite(db: &PortfolioDb) -> Self {
        Self {
            positions: Arc::new(SqlitePositions::new(db.clone())),
            trades: Arc::new(SqliteTrades::new(db.clone())),
            signals: Arc::new(SqliteSignals::new(db.clone())),
            stats: Arc::new(SqliteStats::new(db.clone())),
            backend: "sqlite",
        }
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }
}

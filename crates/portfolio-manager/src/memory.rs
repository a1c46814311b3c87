//! Process-local stores used when no database is configured. Data is lost on
//! restart.

use agent_core::Chain;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{RepoError, RepoResult};
use crate::models::*;
use crate::pnl;
use crate::repository::{PositionRepository, SignalRepository, StatsRepository, TradeRepository};

type Ledger = Arc<RwLock<Vec<Trade>>>;

/// Positions share the trade ledger so open and close land together.
#[derive(Default)]
pub struct MemoryPositions {
    positions: RwLock<Vec<Position>>,
    trades: Ledger,
}

impl MemoryPositions {
    pub fn with_ledger(trades: &MemoryTrades) -> Self {
        Self {
            positions: RwLock::default(),
            trades: trades.trades.clone(),
        }
    }
}

#[async_trait]
impl PositionRepository for MemoryPositions {
    async fn create(&self, new: NewPosition) -> RepoResult<PositionChange> {
        let mut positions = self.positions.write().await;
        if positions.iter().any(|p| p.is_open() && p.matches(&new.token, new.chain)) {
            return Err(RepoError::Conflict(format!("Open position for {} on {}", new.token, new.chain)));
        }

        let position = Position::open(new);
        let trade = NewTrade::opening(&position).execute();
        self.trades.write().await.push(trade.clone());
        positions.push(position.clone());

        tracing::info!(token = position.token.as_str(), chain = %position.chain, size = position.size, "Position opened");
        Ok(PositionChange { position, trade })
    }

    async fn list_open(&self) -> RepoResult<Vec<Position>> {
        let positions = self.positions.read().await;
        Ok(positions.iter().filter(|p| p.is_open()).cloned().collect())
    }

    async fn list_all(&self) -> RepoResult<Vec<Position>> {
        let positions = self.positions.read().await;
        Ok(positions.iter().rev().cloned().collect())
    }

    async fn find_open(&self, token: &str, chain: Chain) -> RepoResult<Option<Position>> {
        let positions = self.positions.read().await;
        Ok(positions.iter().find(|p| p.is_open() && p.matches(token, chain)).cloned())
    }

    async fn update_price(&self, token: &str, chain: Chain, current_price: f64) -> RepoResult<Position> {
        let mut positions = self.positions.write().await;
        let position = positions
            .iter_mut()
            .find(|p| p.is_open() && p.matches(token, chain))
            .ok_or_else(|| RepoError::NotFound(format!("Open position for {} on {}", token, chain)))?;

        let pnl = pnl::unrealized(position.size, position.entry_price, current_price);
        position.current_price = current_price;
        position.pnl = pnl.pnl;
        position.pnl_percent = pnl.pnl_percent;
        Ok(position.clone())
    }

    async fn close(&self, token: &str, chain: Chain) -> RepoResult<PositionChange> {
        let mut positions = self.positions.write().await;
        let position = positions
            .iter_mut()
            .find(|p| p.is_open() && p.matches(token, chain))
            .ok_or_else(|| RepoError::NotFound(format!("Open position for {} on {}", token, chain)))?;

        position.status = PositionStatus::Closed;
        position.closed_at = Some(Utc::now());
        let trade = NewTrade::closing(position).execute();
        self.trades.write().await.push(trade.clone());

        tracing::info!(token, chain = %chain, pnl = position.pnl, "Position closed");
        Ok(PositionChange {
            position: position.clone(),
            trade,
        })
    }
}

#[derive(Default)]
pub struct MemoryTrades {
    trades: Ledger,
}

#[async_trait]
impl TradeRepository for MemoryTrades {
    async fn record(&self, new: NewTrade) -> RepoResult<Trade> {
        let trade = new.execute();
        self.trades.write().await.push(trade.clone());
        Ok(trade)
    }

    async fn list_today(&self) -> RepoResult<Vec<Trade>> {
        let today = Utc::now().date_naive();
        let trades = self.trades.read().await;
        Ok(trades
            .iter()
            .rev()
            .filter(|t| t.executed_at.date_naive() == today)
            .cloned()
            .collect())
    }

    async fn list_recent(&self, limit: usize) -> RepoResult<Vec<Trade>> {
        let trades = self.trades.read().await;
        Ok(trades.iter().rev().take(limit).cloned().collect())
    }

    async fn list_for_position(&self, position_id: &str) -> RepoResult<Vec<Trade>> {
        let trades = self.trades.read().await;
        Ok(trades
            .iter()
            .filter(|t| t.position_id == position_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemorySignals {
    // insertion order doubles as arrival order
    signals: RwLock<Vec<StoredSignal>>,
}

#[async_trait]
impl SignalRepository for MemorySignals {
    async fn create(&self, signal: HunterSignal) -> RepoResult<StoredSignal> {
        let mut signals = self.signals.write().await;
        if signals.iter().any(|s| s.id() == signal.id) {
            return Err(RepoError::Conflict(format!("Signal {}", signal.id)));
        }
        let stored = StoredSignal::queued(signal);
        signals.push(stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<StoredSignal>> {
        let signals = self.signals.read().await;
        Ok(signals.iter().find(|s| s.id() == id).cloned())
    }

    async fn queue(&self, limit: usize) -> RepoResult<Vec<StoredSignal>> {
        let signals = self.signals.read().await;
        Ok(signals
            .iter()
            .rev()
            .filter(|s| s.status == SignalStatus::Queued)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn transition(
        &self,
        id: &str,
        next: SignalStatus,
        analysis: Option<serde_json::Value>,
    ) -> RepoResult<StoredSignal> {
        let mut signals = self.signals.write().await;
        let stored = signals
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or_else(|| RepoError::NotFound(format!("Signal {}", id)))?;

        let from = stored.status;
        stored.advance(next, analysis)?;
        tracing::info!(signal_id = id, from = %from, to = %next, "Signal status changed");
        Ok(stored.clone())
    }

    async fn clear_queue(&self) -> RepoResult<u64> {
        let mut signals = self.signals.write().await;
        let before = signals.len();
        signals.retain(|s| s.status != SignalStatus::Queued);
        Ok((before - signals.len()) as u64)
    }
}

#[derive(Default)]
pub struct MemoryStats {
    days: RwLock<BTreeMap<NaiveDate, DailyStats>>,
}

impl MemoryStats {
    async fn update_today(&self, apply: impl FnOnce(&mut DailyStats) + Send) -> DailyStats {
        let today = Utc::now().date_naive();
        let mut days = self.days.write().await;
        let stats = days.entry(today).or_insert_with(|| DailyStats::empty(today));
        apply(stats);
        stats.clone()
    }
}

#[async_trait]
impl StatsRepository for MemoryStats {
    async fn today(&self) -> RepoResult<DailyStats> {
        Ok(self.update_today(|_| {}).await)
    }

    async fn add_pnl(&self, amount: f64) -> RepoResult<DailyStats> {
        Ok(self.update_today(|s| s.pnl += amount).await)
    }

    async fn increment_trades(&self) -> RepoResult<DailyStats> {
        Ok(self.update_today(|s| s.trades_count += 1).await)
    }

    async fn record_signals(&self, received: i64, queued: i64, rejected: i64) -> RepoResult<DailyStats> {
        Ok(self
            .update_today(|s| {
                s.signals_received += received;
                s.signals_queued += queued;
                s.signals_rejected += rejected;
            })
            .await)
    }

    async fn total_pnl(&self) -> RepoResult<f64> {
        let days = self.days.read().await;
        Ok(days.values().map(|s| s.pnl).sum())
    }
}

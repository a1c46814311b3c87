use agent_core::Chain;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteConnection;

use crate::db::PortfolioDb;
use crate::error::{RepoError, RepoResult};
use crate::models::*;
use crate::pnl;
use crate::repository::{PositionRepository, SignalRepository, StatsRepository, TradeRepository};

fn parse_chain(raw: &str) -> RepoResult<Chain> {
    raw.parse::<Chain>()
        .map_err(|e| RepoError::InvalidData(e.to_string()))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[derive(sqlx::FromRow)]
struct PositionRow {
    id: String,
    token: String,
    chain: String,
    size: f64,
    entry_price: f64,
    current_price: f64,
    pnl: f64,
    pnl_percent: f64,
    status: String,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

impl TryFrom<PositionRow> for Position {
    type Error = RepoError;

    fn try_from(row: PositionRow) -> RepoResult<Self> {
        Ok(Position {
            id: row.id,
            token: row.token,
            chain: parse_chain(&row.chain)?,
            size: row.size,
            entry_price: row.entry_price,
            current_price: row.current_price,
            pnl: row.pnl,
            pnl_percent: row.pnl_percent,
            status: row.status.parse()?,
            opened_at: row.opened_at,
            closed_at: row.closed_at,
        })
    }
}

const OPEN_POSITION: &str =
    "SELECT * FROM positions WHERE token = ? COLLATE NOCASE AND chain = ? AND status = 'open' LIMIT 1";

pub struct SqlitePositions {
    db: PortfolioDb,
}

impl SqlitePositions {
    pub fn new(db: PortfolioDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PositionRepository for SqlitePositions {
    async fn create(&self, new: NewPosition) -> RepoResult<PositionChange> {
        let mut tx = self.db.begin_write().await?;

        let existing = sqlx::query_as::<_, PositionRow>(OPEN_POSITION)
            .bind(&new.token)
            .bind(new.chain.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(RepoError::Conflict(format!("Open position for {} on {}", new.token, new.chain)));
        }

        let position = Position::open(new);
        let inserted = sqlx::query(
            r#"
            INSERT INTO positions (id, token, chain, size, entry_price, current_price, pnl, pnl_percent, status, opened_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, 0, 'open', ?)
            "#,
        )
        .bind(&position.id)
        .bind(&position.token)
        .bind(position.chain.as_str())
        .bind(position.size)
        .bind(position.entry_price)
        .bind(position.current_price)
        .bind(position.opened_at)
        .execute(&mut *tx)
        .await;

        // idx_positions_one_open enforces the same rule
        if let Err(e) = inserted {
            return Err(if is_unique_violation(&e) {
                RepoError::Conflict(format!("Open position for {} on {}", position.token, position.chain))
            } else {
                e.into()
            });
        }

        let trade = NewTrade::opening(&position).execute();
        insert_trade(&mut tx, &trade).await?;

        tx.commit().await?;
        tracing::info!(token = position.token.as_str(), chain = %position.chain, size = position.size, "Position opened");
        Ok(PositionChange { position, trade })
    }

    async fn list_open(&self) -> RepoResult<Vec<Position>> {
        let rows = sqlx::query_as::<_, PositionRow>(
            "SELECT * FROM positions WHERE status = 'open' ORDER BY opened_at",
        )
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(Position::try_from).collect()
    }

    async fn list_all(&self) -> RepoResult<Vec<Position>> {
        let rows = sqlx::query_as::<_, PositionRow>(
            "SELECT * FROM positions ORDER BY opened_at DESC, rowid DESC",
        )
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(Position::try_from).collect()
    }

    async fn find_open(&self, token: &str, chain: Chain) -> RepoResult<Option<Position>> {
        let row = sqlx::query_as::<_, PositionRow>(OPEN_POSITION)
            .bind(token)
            .bind(chain.as_str())
            .fetch_optional(self.db.pool())
            .await?;

        row.map(Position::try_from).transpose()
    }

    async fn update_price(&self, token: &str, chain: Chain, current_price: f64) -> RepoResult<Position> {
        let mut tx = self.db.begin_write().await?;

        let row = sqlx::query_as::<_, PositionRow>(OPEN_POSITION)
            .bind(token)
            .bind(chain.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Open position for {} on {}", token, chain)))?;

        let mut position = Position::try_from(row)?;
        let pnl = pnl::unrealized(position.size, position.entry_price, current_price);
        position.current_price = current_price;
        position.pnl = pnl.pnl;
        position.pnl_percent = pnl.pnl_percent;

        sqlx::query("UPDATE positions SET current_price = ?, pnl = ?, pnl_percent = ? WHERE id = ?")
            .bind(position.current_price)
            .bind(position.pnl)
            .bind(position.pnl_percent)
            .bind(&position.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(position)
    }

    async fn close(&self, token: &str, chain: Chain) -> RepoResult<PositionChange> {
        let mut tx = self.db.begin_write().await?;

        let row = sqlx::query_as::<_, PositionRow>(OPEN_POSITION)
            .bind(token)
            .bind(chain.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Open position for {} on {}", token, chain)))?;

        let mut position = Position::try_from(row)?;
        position.status = PositionStatus::Closed;
        position.closed_at = Some(Utc::now());

        sqlx::query("UPDATE positions SET status = 'closed', closed_at = ? WHERE id = ? AND status = 'open'")
            .bind(position.closed_at)
            .bind(&position.id)
            .execute(&mut *tx)
            .await?;

        let trade = NewTrade::closing(&position).execute();
        insert_trade(&mut tx, &trade).await?;

        tx.commit().await?;
        tracing::info!(token, chain = %chain, pnl = position.pnl, "Position closed");
        Ok(PositionChange { position, trade })
    }
}

#[derive(sqlx::FromRow)]
struct TradeRow {
    id: String,
    position_id: String,
    kind: String,
    token: String,
    chain: String,
    size: f64,
    price: f64,
    pnl: Option<f64>,
    executed_at: DateTime<Utc>,
}

impl TryFrom<TradeRow> for Trade {
    type Error = RepoError;

    fn try_from(row: TradeRow) -> RepoResult<Self> {
        Ok(Trade {
            id: row.id,
            position_id: row.position_id,
            kind: row.kind.parse()?,
            token: row.token,
            chain: parse_chain(&row.chain)?,
            size: row.size,
            price: row.price,
            pnl: row.pnl,
            executed_at: row.executed_at,
        })
    }
}

async fn insert_trade(conn: &mut SqliteConnection, trade: &Trade) -> RepoResult<()> {
    sqlx::query(
        r#"
        INSERT INTO trades (id, position_id, kind, token, chain, size, price, pnl, executed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&trade.id)
    .bind(&trade.position_id)
    .bind(trade.kind.as_str())
    .bind(&trade.token)
    .bind(trade.chain.as_str())
    .bind(trade.size)
    .bind(trade.price)
    .bind(trade.pnl)
    .bind(trade.executed_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub struct SqliteTrades {
    db: PortfolioDb,
}

impl SqliteTrades {
    pub fn new(db: PortfolioDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TradeRepository for SqliteTrades {
    async fn record(&self, new: NewTrade) -> RepoResult<Trade> {
        let trade = new.execute();
        let mut conn = self.db.pool().acquire().await?;
        insert_trade(&mut conn, &trade).await?;
        Ok(trade)
    }

    async fn list_today(&self) -> RepoResult<Vec<Trade>> {
        let today = Utc::now().date_naive().to_string();
        let rows = sqlx::query_as::<_, TradeRow>(
            "SELECT * FROM trades WHERE substr(executed_at, 1, 10) = ? ORDER BY executed_at DESC, rowid DESC",
        )
        .bind(today)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(Trade::try_from).collect()
    }

    async fn list_recent(&self, limit: usize) -> RepoResult<Vec<Trade>> {
        let rows = sqlx::query_as::<_, TradeRow>(
            "SELECT * FROM trades ORDER BY executed_at DESC, rowid DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(Trade::try_from).collect()
    }

    async fn list_for_position(&self, position_id: &str) -> RepoResult<Vec<Trade>> {
        let rows = sqlx::query_as::<_, TradeRow>(
            "SELECT * FROM trades WHERE position_id = ? ORDER BY executed_at, rowid",
        )
        .bind(position_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(Trade::try_from).collect()
    }
}

#[derive(sqlx::FromRow)]
struct SignalRow {
    payload: String,
    status: String,
    analysis: Option<String>,
    history: String,
    received_at: DateTime<Utc>,
    analyzed_at: Option<DateTime<Utc>>,
}

impl TryFrom<SignalRow> for StoredSignal {
    type Error = RepoError;

    fn try_from(row: SignalRow) -> RepoResult<Self> {
        Ok(StoredSignal {
            signal: serde_json::from_str(&row.payload)?,
            status: row.status.parse()?,
            analysis: row.analysis.as_deref().map(serde_json::from_str).transpose()?,
            received_at: row.received_at,
            analyzed_at: row.analyzed_at,
            history: serde_json::from_str(&row.history)?,
        })
    }
}

pub struct SqliteSignals {
    db: PortfolioDb,
}

impl SqliteSignals {
    pub fn new(db: PortfolioDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SignalRepository for SqliteSignals {
    async fn create(&self, signal: HunterSignal) -> RepoResult<StoredSignal> {
        let stored = StoredSignal::queued(signal);

        let result = sqlx::query(
            r#"
            INSERT INTO signals (id, payload, status, history, received_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(stored.id())
        .bind(serde_json::to_string(&stored.signal)?)
        .bind(stored.status.as_str())
        .bind(serde_json::to_string(&stored.history)?)
        .bind(stored.received_at)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::Conflict(format!("Signal {}", stored.id())));
        }
        Ok(stored)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<StoredSignal>> {
        let row = sqlx::query_as::<_, SignalRow>("SELECT * FROM signals WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(StoredSignal::try_from).transpose()
    }

    async fn queue(&self, limit: usize) -> RepoResult<Vec<StoredSignal>> {
        let rows = sqlx::query_as::<_, SignalRow>(
            "SELECT * FROM signals WHERE status = 'queued' ORDER BY received_at DESC, rowid DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(StoredSignal::try_from).collect()
    }

    async fn transition(
        &self,
        id: &str,
        next: SignalStatus,
        analysis: Option<serde_json::Value>,
    ) -> RepoResult<StoredSignal> {
        let mut tx = self.db.begin_write().await?;

        let row = sqlx::query_as::<_, SignalRow>("SELECT * FROM signals WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Signal {}", id)))?;

        let mut stored = StoredSignal::try_from(row)?;
        let from = stored.status;
        stored.advance(next, analysis)?;

        let analysis_json = stored.analysis.as_ref().map(serde_json::to_string).transpose()?;
        sqlx::query("UPDATE signals SET status = ?, analysis = ?, history = ?, analyzed_at = ? WHERE id = ?")
            .bind(stored.status.as_str())
            .bind(analysis_json)
            .bind(serde_json::to_string(&stored.history)?)
            .bind(stored.analyzed_at)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(signal_id = id, from = %from, to = %next, "Signal status changed");
        Ok(stored)
    }

    async fn clear_queue(&self) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM signals WHERE status = 'queued'")
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    date: NaiveDate,
    pnl: f64,
    trades_count: i64,
    signals_received: i64,
    signals_queued: i64,
    signals_rejected: i64,
}

impl From<StatsRow> for DailyStats {
    fn from(row: StatsRow) -> Self {
        DailyStats {
            date: row.date,
            pnl: row.pnl,
            trades_count: row.trades_count,
            signals_received: row.signals_received,
            signals_queued: row.signals_queued,
            signals_rejected: row.signals_rejected,
        }
    }
}

pub struct SqliteStats {
    db: PortfolioDb,
}

impl SqliteStats {
    pub fn new(db: PortfolioDb) -> Self {
        Self { db }
    }

    /// Run `update` against today's row (created on demand) and return it.
    async fn bump(&self, update: &str, deltas: &[Delta]) -> RepoResult<DailyStats> {
        let today = Utc::now().date_naive();
        let mut tx = self.db.begin_write().await?;

        sqlx::query("INSERT INTO daily_stats (date) VALUES (?) ON CONFLICT(date) DO NOTHING")
            .bind(today)
            .execute(&mut *tx)
            .await?;

        if !update.is_empty() {
            let sql = format!("UPDATE daily_stats SET {} WHERE date = ?", update);
            let mut query = sqlx::query(&sql);
            for delta in deltas {
                query = match *delta {
                    Delta::Amount(value) => query.bind(value),
                    Delta::Count(value) => query.bind(value),
                };
            }
            query.bind(today).execute(&mut *tx).await?;
        }

        let row = sqlx::query_as::<_, StatsRow>("SELECT * FROM daily_stats WHERE date = ?")
            .bind(today)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.into())
    }
}

/// Bound value for a stats update, typed like its column.
enum Delta {
    Amount(f64),
    Count(i64),
}

#[async_trait]
impl StatsRepository for SqliteStats {
    async fn today(&self) -> RepoResult<DailyStats> {
        let today = Utc::now().date_naive();
        let row = sqlx::query_as::<_, StatsRow>("SELECT * FROM daily_stats WHERE date = ?")
            .bind(today)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(DailyStats::from).unwrap_or_else(|| DailyStats::empty(today)))
    }

    async fn add_pnl(&self, amount: f64) -> RepoResult<DailyStats> {
        self.bump("pnl = pnl + ?", &[Delta::Amount(amount)]).await
    }

    async fn increment_trades(&self) -> RepoResult<DailyStats> {
        self.bump("trades_count = trades_count + 1", &[]).await
    }

    async fn record_signals(&self, received: i64, queued: i64, rejected: i64) -> RepoResult<DailyStats> {
        self.bump(
            "signals_received = signals_received + ?, \
             signals_queued = signals_queued + ?, \
             signals_rejected = signals_rejected + ?",
            &[Delta::Count(received), Delta::Count(queued), Delta::Count(rejected)],
        )
        .await
    }

    async fn total_pnl(&self) -> RepoResult<f64> {
        let (total,): (f64,) = sqlx::query_as("SELECT COALESCE(SUM(pnl), 0.0) FROM daily_stats")
            .fetch_one(self.db.pool())
            .await?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::hunter;
    use crate::repository::Repositories;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    async fn db() -> PortfolioDb {
        PortfolioDb::new("sqlite::memory:").await.unwrap()
    }

    fn new_position(token: &str, chain: Chain) -> NewPosition {
        NewPosition {
            token: token.to_string(),
            chain,
            size: 200.0,
            entry_price: 0.5,
        }
    }

    #[tokio::test]
    async fn test_position_round_trip() {
        let repo = SqlitePositions::new(db().await);
        let opened = repo.create(new_position("POPCAT", Chain::Solana)).await.unwrap();

        assert_eq!(opened.trade.kind, TradeKind::Open);
        assert_eq!(opened.trade.price, 0.5);

        let found = repo.find_open("popcat", Chain::Solana).await.unwrap().unwrap();
        assert_eq!(found.id, opened.position.id);
        assert_eq!(found.status, PositionStatus::Open);

        let updated = repo.update_price("POPCAT", Chain::Solana, 0.75).await.unwrap();
        assert_eq!(updated.pnl_percent, 50.0);
        assert_eq!(updated.pnl, 100.0);

        let closed = repo.close("POPCAT", Chain::Solana).await.unwrap();
        assert!(closed.position.closed_at.is_some());
        assert_eq!(closed.position.pnl, 100.0);
        assert_eq!(closed.trade.kind, TradeKind::Close);
        assert_eq!(closed.trade.price, 0.75);
        assert_eq!(closed.trade.pnl, Some(100.0));

        assert!(repo.list_open().await.unwrap().is_empty());
        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, PositionStatus::Closed);
        assert_eq!(all[0].current_price, 0.75);
    }

    #[tokio::test]
    async fn test_close_missing_or_closed() {
        let repo = SqlitePositions::new(db().await);
        assert!(matches!(
            repo.close("ghost", Chain::Base).await.unwrap_err(),
            RepoError::NotFound(_)
        ));

        repo.create(new_position("AERO", Chain::Base)).await.unwrap();
        repo.close("AERO", Chain::Base).await.unwrap();
        assert_err!(repo.close("AERO", Chain::Base).await);
        assert_err!(repo.update_price("AERO", Chain::Base, 1.0).await);
    }

    #[tokio::test]
    async fn test_duplicate_open_position_conflicts() {
        let repo = SqlitePositions::new(db().await);
        repo.create(new_position("PEPE", Chain::Ethereum)).await.unwrap();
        assert!(matches!(
            repo.create(new_position("pepe", Chain::Ethereum)).await.unwrap_err(),
            RepoError::Conflict(_)
        ));
        // a different chain is a different position
        assert!(repo.create(new_position("PEPE", Chain::Base)).await.is_ok());
    }

    #[tokio::test]
    async fn test_trades() {
        let database = db().await;
        let positions = SqlitePositions::new(database.clone());
        let trades = SqliteTrades::new(database);

        let position = positions.create(new_position("JTO", Chain::Solana)).await.unwrap().position;
        let close = positions.close("JTO", Chain::Solana).await.unwrap().trade;
        assert_eq!(close.pnl, Some(0.0));

        let manual = trades.record(NewTrade::closing(&position)).await.unwrap();
        assert_eq!(manual.position_id, position.id);

        let today = trades.list_today().await.unwrap();
        assert_eq!(today.len(), 3);
        assert_eq!(today[0].id, manual.id);

        let recent = trades.list_recent(1).await.unwrap();
        assert_eq!(recent.len(), 1);

        let for_position = trades.list_for_position(&position.id).await.unwrap();
        assert_eq!(for_position[0].kind, TradeKind::Open);
        assert_eq!(for_position[1].kind, TradeKind::Close);
        assert_eq!(for_position[0].chain, Chain::Solana);
    }

    #[tokio::test]
    async fn test_failed_close_records_no_trade() {
        let database = db().await;
        let positions = SqlitePositions::new(database.clone());
        let trades = SqliteTrades::new(database);

        positions.create(new_position("ORCA", Chain::Solana)).await.unwrap();
        positions.close("ORCA", Chain::Solana).await.unwrap();
        assert_err!(positions.close("ORCA", Chain::Solana).await);
        assert_err!(positions.close("ORCA", Chain::Base).await);

        assert_eq!(trades.list_recent(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unique_open_index() {
        let database = db().await;
        let repo = SqlitePositions::new(database.clone());
        let opened = repo.create(new_position("BONK", Chain::Solana)).await.unwrap().position;

        // a second open row for the same token and chain is refused by the schema itself
        let err = sqlx::query(
            "INSERT INTO positions (id, token, chain, size, entry_price, current_price, status, opened_at) \
             VALUES ('dup', 'bonk', 'solana', 1, 1, 1, 'open', ?)",
        )
        .bind(Utc::now())
        .execute(database.pool())
        .await
        .unwrap_err();
        assert!(is_unique_violation(&err));

        repo.close("BONK", Chain::Solana).await.unwrap();
        let reopened = repo.create(new_position("bonk", Chain::Solana)).await.unwrap().position;
        assert_ne!(reopened.id, opened.id);
    }

    async fn file_db(dir: &tempfile::TempDir) -> PortfolioDb {
        let url = format!("sqlite://{}", dir.path().join("desk.db").display());
        PortfolioDb::new(&url).await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_opens_on_file_db() {
        let dir = tempfile::tempdir().unwrap();
        let repos = Repositories::sqlite(&file_db(&dir).await);

        for round in 0..10 {
            // distinct tokens: every open must succeed
            let distinct = (0..5).map(|i| {
                let repos = repos.clone();
                tokio::spawn(async move {
                    repos.positions.create(new_position(&format!("TOK{}X{}", round, i), Chain::Solana)).await
                })
            });
            for handle in futures_util::future::join_all(distinct).await {
                assert_ok!(handle.unwrap());
            }

            // same token: exactly one wins, the rest conflict
            let same = (0..5).map(|_| {
                let repos = repos.clone();
                tokio::spawn(async move {
                    repos.positions.create(new_position(&format!("SAME{}", round), Chain::Base)).await
                })
            });
            let mut opened = 0;
            for handle in futures_util::future::join_all(same).await {
                match handle.unwrap() {
                    Ok(_) => opened += 1,
                    Err(RepoError::Conflict(_)) => {}
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
            assert_eq!(opened, 1);
        }

        assert_eq!(repos.positions.list_open().await.unwrap().len(), 60);
        assert_eq!(repos.trades.list_recent(1000).await.unwrap().len(), 60);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_on_file_db() {
        let dir = tempfile::tempdir().unwrap();
        let repos = Repositories::sqlite(&file_db(&dir).await);

        for i in 0..8 {
            repos.signals.create(hunter(&format!("sig-{}", i))).await.unwrap();
        }

        let tasks = (0..8).map(|i| {
            let repos = repos.clone();
            tokio::spawn(async move {
                let id = format!("sig-{}", i);
                repos.signals.transition(&id, SignalStatus::Analyzing, None).await?;
                repos.stats.record_signals(1, 1, 0).await?;
                repos.stats.add_pnl(1.5).await?;
                repos.signals.transition(&id, SignalStatus::Analyzed, Some(json!({"i": i}))).await
            })
        });
        for handle in futures_util::future::join_all(tasks).await {
            assert_ok!(handle.unwrap());
        }

        let stats = repos.stats.today().await.unwrap();
        assert_eq!(stats.signals_received, 8);
        assert_eq!(stats.pnl, 12.0);
        assert!(repos.signals.queue(50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_signal_lifecycle() {
        let repo = SqliteSignals::new(db().await);
        repo.create(hunter("s-1")).await.unwrap();
        repo.create(hunter("s-2")).await.unwrap();
        assert!(matches!(
            repo.create(hunter("s-1")).await.unwrap_err(),
            RepoError::Conflict(_)
        ));

        let queue = repo.queue(50).await.unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].id(), "s-2");

        repo.transition("s-1", SignalStatus::Analyzing, None).await.unwrap();
        repo.transition("s-1", SignalStatus::Analyzed, Some(json!({"sentiment": "bullish"})))
            .await
            .unwrap();

        let stored = repo.get("s-1").await.unwrap().unwrap();
        assert_eq!(stored.status, SignalStatus::Analyzed);
        assert_eq!(stored.history.len(), 3);
        assert_eq!(stored.analysis.unwrap()["sentiment"], "bullish");
        assert_eq!(stored.signal, hunter("s-1"));

        assert!(matches!(
            repo.transition("s-1", SignalStatus::Failed, None).await.unwrap_err(),
            RepoError::InvalidTransition { .. }
        ));

        assert_eq!(repo.clear_queue().await.unwrap(), 1);
        assert!(repo.get("s-2").await.unwrap().is_none());
        assert!(repo.get("s-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stats() {
        let repo = SqliteStats::new(db().await);
        assert_eq!(repo.today().await.unwrap().pnl, 0.0);

        repo.add_pnl(7.25).await.unwrap();
        repo.increment_trades().await.unwrap();
        let stats = repo.record_signals(5, 3, 2).await.unwrap();

        assert_eq!(stats.date, Utc::now().date_naive());
        assert_eq!(stats.pnl, 7.25);
        assert_eq!(stats.trades_count, 1);
        assert_eq!(stats.signals_received, 5);
        assert_eq!(stats.signals_rejected, 2);
        assert_eq!(repo.total_pnl().await.unwrap(), 7.25);
    }
}

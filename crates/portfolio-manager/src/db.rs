use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Transaction;
use std::str::FromStr;
use std::time::Duration;

use crate::error::RepoResult;

#[derive(Clone)]
pub struct PortfolioDb {
    pool: SqlitePool,
}

impl PortfolioDb {
    /// Connect, creating the database file if needed, and apply the schema.
    pub async fn new(database_url: &str) -> RepoResult<Self> {
        // Every pooled connection to `:memory:` would get its own empty
        // database, so in-memory URLs hold exactly one connection forever.
        let in_memory = database_url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;

        let db = Self { pool };
        db.init_schema().await?;

        tracing::info!(in_memory, "Portfolio database ready");
        Ok(db)
    }

    async fn init_schema(&self) -> RepoResult<()> {
        let schema = include_str!("../schema.sql");

        // sqlx executes one statement per query
        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&self.pool).await?;
            }
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Read-then-write transaction. Takes the write lock at `BEGIN`, so
    /// concurrent writers wait out the busy timeout instead of failing.
    pub async fn begin_write(&self) -> RepoResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }
}

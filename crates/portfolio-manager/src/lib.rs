pub mod db;
pub mod error;
pub mod memory;
pub mod models;
pub mod pnl;
pub mod repository;
pub mod sqlite;

pub use db::PortfolioDb;
pub use error::{RepoError, RepoResult};
pub use models::*;
pub use repository::{
    PositionRepository, Repositories, SignalRepository, StatsRepository, TradeRepository,
};

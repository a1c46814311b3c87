use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    #[default]
    Paper,
    Micro,
    Live,
}

impl TradingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradingMode::Paper => "paper",
            TradingMode::Micro => "micro",
            TradingMode::Live => "live",
        }
    }

    /// Modes that move real funds.
    pub fn needs_approval(&self) -> bool {
        !matches!(self, TradingMode::Paper)
    }
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradingMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paper" => Ok(TradingMode::Paper),
            "micro" => Ok(TradingMode::Micro),
            "live" => Ok(TradingMode::Live),
            other => Err(anyhow::anyhow!("unknown trading mode '{}'", other)),
        }
    }
}

/// Server settings read from the environment at start-up.
#[derive(Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Unset means protected routes are open (development mode)
    pub api_key: Option<String>,
    pub allowed_origins: Vec<String>,
    pub trading_mode: TradingMode,
    pub max_position_size_usd: f64,
    pub daily_loss_limit_usd: f64,
    pub require_approval: bool,
    pub enable_live_trading: bool,
    pub mode_approval_code: Option<String>,
    /// Unset selects the in-memory repositories
    pub database_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            api_key: None,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            trading_mode: TradingMode::Paper,
            max_position_size_usd: 1000.0,
            daily_loss_limit_usd: 100.0,
            require_approval: true,
            enable_live_trading: false,
            mode_approval_code: None,
            database_url: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("API_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()?;

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let trading_mode = std::env::var("TRADING_MODE")
            .unwrap_or_else(|_| "paper".to_string())
            .parse()?;
        let max_position_size_usd = std::env::var("MAX_POSITION_SIZE_USD")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()?;
        let daily_loss_limit_usd = std::env::var("DAILY_LOSS_LIMIT_USD")
            .unwrap_or_else(|_| "100".to_string())
            .parse()?;
        let require_approval = std::env::var("REQUIRE_APPROVAL")
            .unwrap_or_else(|_| "true".to_string())
            .parse()?;
        let enable_live_trading = std::env::var("ENABLE_LIVE_TRADING")
            .unwrap_or_else(|_| "false".to_string())
            .parse()?;

        Ok(Self {
            host,
            port,
            api_key: non_empty_env("HEDGE_DESK_API_KEY"),
            allowed_origins,
            trading_mode,
            max_position_size_usd,
            daily_loss_limit_usd,
            require_approval,
            enable_live_trading,
            mode_approval_code: non_empty_env("MODE_APPROVAL_CODE"),
            database_url: non_empty_env("DATABASE_URL"),
        })
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_deref().map(crate::auth::mask_api_key))
            .field("allowed_origins", &self.allowed_origins)
            .field("trading_mode", &self.trading_mode)
            .field("max_position_size_usd", &self.max_position_size_usd)
            .field("daily_loss_limit_usd", &self.daily_loss_limit_usd)
            .field("require_approval", &self.require_approval)
            .field("enable_live_trading", &self.enable_live_trading)
            .field("mode_approval_code", &self.mode_approval_code.as_ref().map(|_| "****"))
            .field("database_url", &self.database_url)
            .finish()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trading_mode_parse() {
        assert_eq!("LIVE".parse::<TradingMode>().unwrap(), TradingMode::Live);
        assert!("yolo".parse::<TradingMode>().is_err());
        assert!(TradingMode::Micro.needs_approval());
        assert!(!TradingMode::Paper.needs_approval());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let settings = Settings {
            api_key: Some("hd_live_0123456789abcdef".into()),
            mode_approval_code: Some("let-me-in".into()),
            ..Settings::default()
        };
        let printed = format!("{:?}", settings);
        assert!(printed.contains("hd_l...cdef"));
        assert!(!printed.contains("0123456789"));
        assert!(!printed.contains("let-me-in"));
    }
}

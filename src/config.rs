//! Configuration management for the risk monitor
//!
//! Loads configuration from environment variables (via .env file) and provides
//! validated, type-safe access to all run parameters. Built once at start-up
//! and handed to each collaborator constructor.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Smallest calendar window that still yields 200 trading sessions
pub const MIN_MARKET_WINDOW_DAYS: u32 = 300;

/// Complete configuration for one risk-monitor run
#[derive(Debug, Clone)]
pub struct Config {
    pub sources: SourceConfig,
    pub fred: FredConfig,
    pub market: MarketConfig,
    pub ledger: LedgerConfig,
    pub notification: NotificationConfig,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

/// Macro series identifiers consumed by the engine
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// 10y-3m treasury spread series
    pub yield_spread_series: String,
    /// Financial conditions index series
    pub financial_conditions_series: String,
}

/// FRED API access
#[derive(Debug, Clone)]
pub struct FredConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Market price source (Yahoo Finance chart API)
#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub base_url: String,
    /// Benchmark equity (close + 200-sample mean)
    pub equity_symbol: String,
    /// Volatility index
    pub volatility_symbol: String,
    /// High-yield bond proxy (ratio numerator)
    pub high_yield_symbol: String,
    /// Investment-grade bond proxy (ratio denominator)
    pub investment_grade_symbol: String,
    /// Calendar days of history to request
    pub window_days: u32,
    pub timeout_secs: u64,
}

impl MarketConfig {
    /// Symbols in the order they are fetched
    pub fn symbols(&self) -> Vec<String> {
        vec![
            self.equity_symbol.clone(),
            self.volatility_symbol.clone(),
            self.high_yield_symbol.clone(),
            self.investment_grade_symbol.clone(),
        ]
    }
}

/// Where the daily ledger lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    Csv,
    Sqlite,
    Sheets,
    Memory,
}

impl FromStr for LedgerBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(LedgerBackend::Csv),
            "sqlite" => Ok(LedgerBackend::Sqlite),
            "sheets" => Ok(LedgerBackend::Sheets),
            "memory" => Ok(LedgerBackend::Memory),
            other => anyhow::bail!("Unknown LEDGER_BACKEND '{}'", other),
        }
    }
}

/// Ledger store configuration
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    pub csv_path: PathBuf,
    pub sqlite_path: PathBuf,
    /// Spreadsheet id for the Sheets backend
    pub sheet_key: String,
    /// OAuth bearer token for the Sheets backend (obtained outside this process)
    pub sheets_access_token: String,
    pub timeout_secs: u64,
}

/// Notification channel selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Line,
    Telegram,
    Log,
}

impl FromStr for NotificationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(NotificationKind::Line),
            "telegram" => Ok(NotificationKind::Telegram),
            "log" => Ok(NotificationKind::Log),
            other => anyhow::bail!("Unknown NOTIFY_CHANNEL '{}'", other),
        }
    }
}

/// Notification credentials
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub channel: NotificationKind,
    pub line_token: String,
    pub line_user_id: String,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub timeout_secs: u64,
}

impl NotificationConfig {
    /// Whether the selected channel has the credentials it needs
    pub fn has_credentials(&self) -> bool {
        match self.channel {
            NotificationKind::Line => !self.line_token.is_empty() && !self.line_user_id.is_empty(),
            NotificationKind::Telegram => {
                !self.telegram_bot_token.is_empty() && !self.telegram_chat_id.is_empty()
            }
            NotificationKind::Log => true,
        }
    }
}

/// Execution-date settings
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// UTC offset (hours) used to compute the execution date
    pub utc_offset_hours: i32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Expects a .env file in the working directory or environment variables to be set.
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (ignoring error if not found)
        let _ = dotenv::dotenv();

        let timeout_secs = get_env_u64("HTTP_TIMEOUT_SECS", 10)?;

        Ok(Config {
            sources: SourceConfig {
                yield_spread_series: get_env_string("YIELD_SPREAD_SERIES", "T10Y3M")?,
                financial_conditions_series: get_env_string("FINANCIAL_CONDITIONS_SERIES", "NFCI")?,
            },
            fred: FredConfig {
                api_key: get_env_string("FRED_API_KEY", "")?,
                base_url: get_env_string("FRED_BASE_URL", "https://api.stlouisfed.org/fred")?,
                timeout_secs,
            },
            market: MarketConfig {
                base_url: get_env_string("MARKET_BASE_URL", "https://query1.finance.yahoo.com")?,
                equity_symbol: get_env_string("EQUITY_SYMBOL", "SPY")?,
                volatility_symbol: get_env_string("VOLATILITY_SYMBOL", "^VIX")?,
                high_yield_symbol: get_env_string("HIGH_YIELD_SYMBOL", "HYG")?,
                investment_grade_symbol: get_env_string("INVESTMENT_GRADE_SYMBOL", "IEF")?,
                window_days: get_env_u32("MARKET_WINDOW_DAYS", 400)?,
                timeout_secs,
            },
            ledger: LedgerConfig {
                backend: get_env_parsed("LEDGER_BACKEND", LedgerBackend::Csv)?,
                csv_path: PathBuf::from(get_env_string("LEDGER_CSV_PATH", "./data/risk_ledger.csv")?),
                sqlite_path: PathBuf::from(get_env_string("LEDGER_SQLITE_PATH", "./data/risk_ledger.db")?),
                sheet_key: get_env_string("SHEET_KEY", "")?,
                sheets_access_token: get_env_string("SHEETS_ACCESS_TOKEN", "")?,
                timeout_secs,
            },
            notification: NotificationConfig {
                channel: get_env_parsed("NOTIFY_CHANNEL", NotificationKind::Line)?,
                line_token: get_env_string("LINE_TOKEN", "")?,
                line_user_id: get_env_string("LINE_USER_ID", "")?,
                telegram_bot_token: get_env_string("TELEGRAM_BOT_TOKEN", "")?,
                telegram_chat_id: get_env_string("TELEGRAM_CHAT_ID", "")?,
                timeout_secs,
            },
            schedule: ScheduleConfig {
                utc_offset_hours: get_env_i32("EXECUTION_UTC_OFFSET_HOURS", 8)?,
            },
            logging: LoggingConfig {
                log_level: get_env_string("LOG_LEVEL", "info")?,
            },
        })
    }

    /// Validate configuration values are within acceptable ranges
    pub fn validate(&self) -> Result<()> {
        // Sources
        if self.sources.yield_spread_series.is_empty() {
            anyhow::bail!("YIELD_SPREAD_SERIES must be set");
        }
        if self.sources.financial_conditions_series.is_empty() {
            anyhow::bail!("FINANCIAL_CONDITIONS_SERIES must be set");
        }
        if self.fred.api_key.is_empty() {
            log::warn!("FRED_API_KEY is empty - macro indicators will fall back to neutral defaults");
        }

        // Market
        if self.market.window_days < MIN_MARKET_WINDOW_DAYS {
            anyhow::bail!("MARKET_WINDOW_DAYS must be ≥ {}", MIN_MARKET_WINDOW_DAYS);
        }
        let symbols = self.market.symbols();
        if symbols.iter().any(|s| s.is_empty()) {
            anyhow::bail!("Market symbols must not be empty");
        }
        for (i, symbol) in symbols.iter().enumerate() {
            if symbols[..i].contains(symbol) {
                anyhow::bail!("Market symbol {} is configured twice", symbol);
            }
        }
        if self.market.timeout_secs == 0 {
            anyhow::bail!("HTTP_TIMEOUT_SECS must be > 0");
        }

        // Ledger
        if self.ledger.backend == LedgerBackend::Sheets {
            if self.ledger.sheet_key.is_empty() {
                anyhow::bail!("SHEET_KEY must be set for the sheets ledger");
            }
            if self.ledger.sheets_access_token.is_empty() {
                anyhow::bail!("SHEETS_ACCESS_TOKEN must be set for the sheets ledger");
            }
        }
        if self.ledger.backend == LedgerBackend::Memory {
            log::warn!("LEDGER_BACKEND=memory - results will not persist across runs");
        }

        // Notification
        if !self.notification.has_credentials() {
            log::warn!(
                "{:?} credentials are empty - notifications will only be logged",
                self.notification.channel
            );
        }

        // Schedule
        if !(-12..=14).contains(&self.schedule.utc_offset_hours) {
            anyhow::bail!("EXECUTION_UTC_OFFSET_HOURS must be between -12 and 14");
        }

        Ok(())
    }
}

// Helper functions for environment variable parsing

fn get_env_string(key: &str, default: &str) -> Result<String> {
    Ok(env::var(key).unwrap_or_else(|_| default.to_string()))
}

fn get_env_u32(key: &str, default: u32) -> Result<u32> {
    get_env_parsed(key, default)
}

fn get_env_u64(key: &str, default: u64) -> Result<u64> {
    get_env_parsed(key, default)
}

fn get_env_i32(key: &str, default: i32) -> Result<i32> {
    get_env_parsed(key, default)
}

fn get_env_parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .context(format!("Invalid {} value", key)),
        _ => Ok(default),
    }
}

/// Fully populated configuration for unit tests
#[cfg(test)]
pub(crate) fn sample_config() -> Config {
    Config {
        sources: SourceConfig {
            yield_spread_series: "T10Y3M".to_string(),
            financial_conditions_series: "NFCI".to_string(),
        },
        fred: FredConfig {
            api_key: "key".to_string(),
            base_url: "https://api.stlouisfed.org/fred".to_string(),
            timeout_secs: 10,
        },
        market: MarketConfig {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            equity_symbol: "SPY".to_string(),
            volatility_symbol: "^VIX".to_string(),
            high_yield_symbol: "HYG".to_string(),
            investment_grade_symbol: "IEF".to_string(),
            window_days: 400,
            timeout_secs: 10,
        },
        ledger: LedgerConfig {
            backend: LedgerBackend::Csv,
            csv_path: PathBuf::from("./data/risk_ledger.csv"),
            sqlite_path: PathBuf::from("./data/risk_ledger.db"),
            sheet_key: String::new(),
            sheets_access_token: String::new(),
            timeout_secs: 10,
        },
        notification: NotificationConfig {
            channel: NotificationKind::Line,
            line_token: "token".to_string(),
            line_user_id: "user".to_string(),
            telegram_bot_token: String::new(),
            telegram_chat_id: String::new(),
            timeout_secs: 10,
        },
        schedule: ScheduleConfig { utc_offset_hours: 8 },
        logging: LoggingConfig {
            log_level: "info".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation_success() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_short_window() {
        let mut config = sample_config();
        config.market.window_days = 200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_duplicate_symbols() {
        let mut config = sample_config();
        config.market.investment_grade_symbol = "HYG".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_sheets_requires_credentials() {
        let mut config = sample_config();
        config.ledger.backend = LedgerBackend::Sheets;
        assert!(config.validate().is_err());

        config.ledger.sheet_key = "sheet".to_string();
        assert!(config.validate().is_err());

        config.ledger.sheets_access_token = "ya29.token".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_offset() {
        let mut config = sample_config();
        config.schedule.utc_offset_hours = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_notification_credentials_is_not_fatal() {
        let mut config = sample_config();
        config.notification.line_token.clear();
        assert!(!config.notification.has_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_and_channel_parsing() {
        assert_eq!("CSV".parse::<LedgerBackend>().unwrap(), LedgerBackend::Csv);
        assert_eq!(" sheets ".parse::<LedgerBackend>().unwrap(), LedgerBackend::Sheets);
        assert!("postgres".parse::<LedgerBackend>().is_err());
        assert_eq!("telegram".parse::<NotificationKind>().unwrap(), NotificationKind::Telegram);
        assert!("email".parse::<NotificationKind>().is_err());
    }

    #[test]
    fn test_log_level_from_env() {
        std::env::set_var("LOG_LEVEL", "debug");
        let config = Config::from_env().unwrap();
        std::env::remove_var("LOG_LEVEL");
        assert_eq!(config.logging.log_level, "debug");
    }

    #[test]
    fn test_market_symbols_order() {
        let config = sample_config();
        assert_eq!(config.market.symbols(), vec!["SPY", "^VIX", "HYG", "IEF"]);
    }
}

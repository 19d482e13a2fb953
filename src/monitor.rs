//! 🧭 Daily run orchestration
//!
//! providers → snapshot → engine → ledger → (if newly recorded) notification.
//! Every step runs in sequence; a fatal failure stops the run and is reported
//! once by the caller through [`RiskMonitor::report_failure`].

use anyhow::{Context, Result};
use chrono::Datelike;
use log::{error, info, warn};
use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, LedgerBackend, MarketConfig, SourceConfig};
use crate::ledger::{
    CsvLedgerStore, DailyLedger, LedgerError, LedgerRecord, LedgerStore, MemoryLedgerStore,
    SheetsLedgerStore, SqliteLedgerStore,
};
use crate::notify::{self, NotificationChannel};
use crate::providers::indicators::{MarketIndicators, SymbolRoles};
use crate::providers::{FredClient, MacroDataProvider, MarketDataProvider, ProviderError, YahooChartClient};
use crate::risk_engine::{format_daily_report, format_failure, should_notify, RiskScoringEngine, ScoringResult};
use crate::snapshot::{IndicatorSnapshot, MacroReading};

/// Fatal conditions for a run
#[derive(Error, Debug)]
pub enum RunError {
    #[error("market data unavailable: {0}")]
    MarketData(#[from] ProviderError),

    #[error("{0}")]
    Persistence(#[from] LedgerError),
}

/// Non-error end states of a run
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// New day written; `notified` reports whether delivery succeeded
    Recorded {
        result: ScoringResult,
        notified: bool,
    },
    /// Day already in the ledger; nothing written, nothing sent
    AlreadyRecorded,
}

/// Which series and symbols a run reads
#[derive(Debug, Clone)]
pub struct DataSources {
    pub yield_spread_series: String,
    pub financial_conditions_series: String,
    pub equity_symbol: String,
    pub volatility_symbol: String,
    pub high_yield_symbol: String,
    pub investment_grade_symbol: String,
    pub window_days: u32,
}

impl DataSources {
    pub fn from_config(sources: &SourceConfig, market: &MarketConfig) -> Self {
        Self {
            yield_spread_series: sources.yield_spread_series.clone(),
            financial_conditions_series: sources.financial_conditions_series.clone(),
            equity_symbol: market.equity_symbol.clone(),
            volatility_symbol: market.volatility_symbol.clone(),
            high_yield_symbol: market.high_yield_symbol.clone(),
            investment_grade_symbol: market.investment_grade_symbol.clone(),
            window_days: market.window_days,
        }
    }

    fn symbols(&self) -> Vec<String> {
        vec![
            self.equity_symbol.clone(),
            self.volatility_symbol.clone(),
            self.high_yield_symbol.clone(),
            self.investment_grade_symbol.clone(),
        ]
    }

    fn roles(&self) -> SymbolRoles<'_> {
        SymbolRoles {
            equity: &self.equity_symbol,
            volatility: &self.volatility_symbol,
            high_yield: &self.high_yield_symbol,
            investment_grade: &self.investment_grade_symbol,
        }
    }
}

pub struct RiskMonitor {
    sources: DataSources,
    engine: RiskScoringEngine,
    macro_data: Box<dyn MacroDataProvider>,
    market_data: Box<dyn MarketDataProvider>,
    ledger: DailyLedger,
    notifier: Box<dyn NotificationChannel>,
    clock: Box<dyn Clock>,
}

impl RiskMonitor {
    pub fn new(
        sources: DataSources,
        macro_data: Box<dyn MacroDataProvider>,
        market_data: Box<dyn MarketDataProvider>,
        ledger: DailyLedger,
        notifier: Box<dyn NotificationChannel>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            sources,
            engine: RiskScoringEngine::new(),
            macro_data,
            market_data,
            ledger,
            notifier,
            clock,
        }
    }

    /// Wire the HTTP providers, configured ledger backend and notification channel
    pub fn from_config(config: &Config) -> Result<Self> {
        let clock = SystemClock::with_utc_offset_hours(config.schedule.utc_offset_hours)
            .context("Invalid EXECUTION_UTC_OFFSET_HOURS")?;

        let macro_data = FredClient::new(&config.fred.base_url, &config.fred.api_key, config.fred.timeout_secs)
            .context("Failed to build FRED client")?;
        let market_data = YahooChartClient::new(&config.market.base_url, config.market.timeout_secs)
            .context("Failed to build market data client")?;

        let store: Box<dyn LedgerStore> = match config.ledger.backend {
            LedgerBackend::Csv => Box::new(CsvLedgerStore::new(&config.ledger.csv_path)),
            LedgerBackend::Sqlite => Box::new(SqliteLedgerStore::open(&config.ledger.sqlite_path)),
            LedgerBackend::Sheets => Box::new(
                SheetsLedgerStore::new(
                    &config.ledger.sheet_key,
                    &config.ledger.sheets_access_token,
                    clock.today().year(),
                    config.ledger.timeout_secs,
                )
                .context("Failed to build Sheets client")?,
            ),
            LedgerBackend::Memory => Box::new(MemoryLedgerStore::new()),
        };
        info!("✅ Ledger backend: {}", store.name());

        let notifier = notify::channel_from_config(&config.notification)
            .context("Failed to build notification client")?;
        info!("✅ Notification channel: {}", notifier.name());

        Ok(Self::new(
            DataSources::from_config(&config.sources, &config.market),
            Box::new(macro_data),
            Box::new(market_data),
            DailyLedger::new(store),
            notifier,
            Box::new(clock),
        ))
    }

    /// Fetch every input; macro failures degrade to defaults, market failures are fatal
    pub async fn collect_snapshot(&self) -> Result<IndicatorSnapshot, RunError> {
        info!("📡 Fetching data...");

        let spread_id = &self.sources.yield_spread_series;
        let fci_id = &self.sources.financial_conditions_series;
        let yield_spread = MacroReading::from_fetch(spread_id, self.macro_data.fetch_latest(spread_id).await);
        let financial_conditions =
            MacroReading::from_fetch(fci_id, self.macro_data.fetch_latest(fci_id).await);

        let table = self
            .market_data
            .fetch_series(&self.sources.symbols(), self.sources.window_days)
            .await?;
        let market = MarketIndicators::from_table(&table, &self.sources.roles())?;

        let snapshot = IndicatorSnapshot::assemble(&yield_spread, &financial_conditions, &market);
        info!(
            "✅ Snapshot for {}: spread={:.2}{} fci={:.2}{} vix={:.1} close={:.2}/ma200={:.2} credit={:.4}/ma60={:.4}",
            snapshot.observation_date,
            snapshot.yield_spread,
            if yield_spread.is_defaulted() { " (default)" } else { "" },
            snapshot.financial_conditions_index,
            if financial_conditions.is_defaulted() { " (default)" } else { "" },
            snapshot.vix,
            snapshot.equity_close,
            snapshot.equity_ma200,
            snapshot.credit_ratio_current,
            snapshot.credit_ratio_ma60,
        );
        Ok(snapshot)
    }

    /// One complete daily run
    pub async fn run(&self) -> Result<RunOutcome, RunError> {
        let execution_date = self.clock.today();
        info!("🧭 Risk run for {}", execution_date);

        let snapshot = self.collect_snapshot().await?;

        info!("🧮 Calculating risk...");
        let result = self.engine.evaluate(&snapshot);
        info!(
            "✅ Score {} → level {} ({} reasons)",
            result.score,
            result.level.as_u8(),
            result.reasons.len()
        );

        info!("💾 Saving to {} ledger...", self.ledger.store_name());
        let record = LedgerRecord::new(execution_date, &snapshot, &result)?;
        let outcome = self.ledger.try_record(&record).await?;

        if !should_notify(outcome) {
            info!("⏭️  {} already executed, skipping notification", execution_date);
            return Ok(RunOutcome::AlreadyRecorded);
        }

        let message = format_daily_report(execution_date, &result);
        let notified = notify::deliver(self.notifier.as_ref(), &message).await;
        if !notified {
            warn!("⚠️  Daily report recorded but not delivered");
        }

        Ok(RunOutcome::Recorded { result, notified })
    }

    /// Best-effort notification of a fatal error
    pub async fn report_failure(&self, err: &RunError) {
        let message = format_failure(err);
        error!("❌ {}", message);
        notify::deliver(self.notifier.as_ref(), &message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::sample_config;
    use tempfile::tempdir;

    #[test]
    fn test_unreachable_sqlite_ledger_does_not_fail_wiring() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let mut config = sample_config();
        config.ledger.backend = LedgerBackend::Sqlite;
        config.ledger.sqlite_path = blocker.join("ledger.db");

        // The store error must surface from run(), where it is reported
        let monitor = RiskMonitor::from_config(&config).unwrap();
        assert_eq!(monitor.ledger.store_name(), "sqlite");
        assert_eq!(monitor.notifier.name(), "line");
    }
}

// Risk Monitor - daily composite market-risk score
// Fetches macro + market indicators, scores them, records one ledger row per day
// and pushes a summary notification.

pub mod clock;
pub mod config;
pub mod ledger;
pub mod monitor;
pub mod notify;
pub mod providers;
pub mod risk_engine;
pub mod snapshot;

pub use config::Config;
pub use ledger::{DailyLedger, LedgerRecord, RecordOutcome};
pub use monitor::{RiskMonitor, RunError, RunOutcome};
pub use risk_engine::{RiskLevel, RiskScoringEngine, ScoringResult};
pub use snapshot::IndicatorSnapshot;

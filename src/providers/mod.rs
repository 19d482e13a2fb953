//! Upstream data providers
//!
//! Two seams: a macro series source returning the latest value of a series,
//! and a market source returning a date-indexed price table for a set of
//! symbols. Both are plain I/O wrappers; all derivation happens in
//! [`indicators`].

pub mod fred;
pub mod indicators;
pub mod yahoo;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

pub use fred::FredClient;
pub use indicators::MarketIndicators;
pub use yahoo::YahooChartClient;

/// Daily closes keyed by date, then symbol
pub type PriceTable = BTreeMap<NaiveDate, BTreeMap<String, f64>>;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{series} unavailable: {reason}")]
    DataUnavailable { series: String, reason: String },

    #[error("insufficient history: need {needed} complete sessions, have {available}")]
    InsufficientHistory { needed: usize, available: usize },
}

impl ProviderError {
    pub fn unavailable(series: &str, reason: impl ToString) -> Self {
        ProviderError::DataUnavailable {
            series: series.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Source of macroeconomic series
#[async_trait]
pub trait MacroDataProvider: Send + Sync {
    /// Most recent observed value of a series
    async fn fetch_latest(&self, series_id: &str) -> Result<f64, ProviderError>;
}

/// Source of daily market closes
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Closes for every symbol over roughly the last `window_days` calendar days
    async fn fetch_series(
        &self,
        symbols: &[String],
        window_days: u32,
    ) -> Result<PriceTable, ProviderError>;
}

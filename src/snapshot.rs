//! 📸 Indicator snapshot
//!
//! One complete set of inputs for a single evaluation. Macro readings carry
//! their own fetch outcome so the neutral-default substitution is explicit
//! per series instead of a blanket fallback.

use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::providers::indicators::MarketIndicators;
use crate::providers::ProviderError;

/// Value substituted for a macro series that could not be fetched
pub const NEUTRAL_MACRO_DEFAULT: f64 = 0.0;

/// Whether a macro value came from the provider or the neutral default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingSource {
    Observed,
    Defaulted,
}

/// Outcome of fetching one macro series
#[derive(Debug, Clone, PartialEq)]
pub struct MacroReading {
    pub series_id: String,
    pub value: f64,
    pub source: ReadingSource,
}

impl MacroReading {
    /// Fold a provider result into a reading, substituting the neutral default on failure
    pub fn from_fetch(series_id: &str, fetched: Result<f64, ProviderError>) -> Self {
        match fetched {
            Ok(value) => Self {
                series_id: series_id.to_string(),
                value,
                source: ReadingSource::Observed,
            },
            Err(e) => {
                warn!(
                    "⚠️  {} unavailable ({}), using neutral default {}",
                    series_id, e, NEUTRAL_MACRO_DEFAULT
                );
                Self {
                    series_id: series_id.to_string(),
                    value: NEUTRAL_MACRO_DEFAULT,
                    source: ReadingSource::Defaulted,
                }
            }
        }
    }

    pub fn is_defaulted(&self) -> bool {
        self.source == ReadingSource::Defaulted
    }
}

/// Complete input to the scoring engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    /// 10y-3m treasury spread (negative = inverted)
    pub yield_spread: f64,
    /// Signed stress index, 0 = neutral
    pub financial_conditions_index: f64,
    /// High-yield / investment-grade price ratio
    pub credit_ratio_current: f64,
    /// 60-sample trailing mean of the credit ratio
    pub credit_ratio_ma60: f64,
    pub vix: f64,
    pub equity_close: f64,
    /// 200-sample trailing mean of the benchmark close
    pub equity_ma200: f64,
    /// Date the market data reflects
    pub observation_date: NaiveDate,
}

impl IndicatorSnapshot {
    /// Merge macro readings and derived market indicators
    pub fn assemble(
        yield_spread: &MacroReading,
        financial_conditions: &MacroReading,
        market: &MarketIndicators,
    ) -> Self {
        Self {
            yield_spread: yield_spread.value,
            financial_conditions_index: financial_conditions.value,
            credit_ratio_current: market.credit_ratio_current,
            credit_ratio_ma60: market.credit_ratio_ma60,
            vix: market.vix,
            equity_close: market.equity_close,
            equity_ma200: market.equity_ma200,
            observation_date: market.observation_date,
        }
    }

    /// Key/value JSON stored in the ledger's RawSnapshot column
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

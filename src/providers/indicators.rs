//! Market indicator derivation
//!
//! Reduces a price table to the handful of numbers the engine needs. Only
//! sessions with a usable close for every symbol take part, so the trailing
//! means and the ratio series always line up on the same dates.

use chrono::NaiveDate;
use log::debug;

use super::{PriceTable, ProviderError};

/// Samples in the long-term equity trend
pub const EQUITY_TREND_SAMPLES: usize = 200;

/// Samples in the credit-ratio trailing mean
pub const CREDIT_TREND_SAMPLES: usize = 60;

/// Symbol roles within a price table
#[derive(Debug, Clone)]
pub struct SymbolRoles<'a> {
    pub equity: &'a str,
    pub volatility: &'a str,
    pub high_yield: &'a str,
    pub investment_grade: &'a str,
}

/// Derived market inputs for one snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct MarketIndicators {
    pub observation_date: NaiveDate,
    pub equity_close: f64,
    pub equity_ma200: f64,
    pub vix: f64,
    pub credit_ratio_current: f64,
    pub credit_ratio_ma60: f64,
}

struct Session {
    date: NaiveDate,
    equity: f64,
    volatility: f64,
    credit_ratio: f64,
}

impl MarketIndicators {
    pub fn from_table(table: &PriceTable, roles: &SymbolRoles<'_>) -> Result<Self, ProviderError> {
        let sessions: Vec<Session> = table
            .iter()
            .filter_map(|(date, closes)| {
                let equity = usable(closes.get(roles.equity))?;
                let volatility = usable(closes.get(roles.volatility))?;
                let high_yield = usable(closes.get(roles.high_yield))?;
                let investment_grade = usable(closes.get(roles.investment_grade))?;
                if investment_grade <= 0.0 {
                    return None;
                }
                Some(Session {
                    date: *date,
                    equity,
                    volatility,
                    credit_ratio: high_yield / investment_grade,
                })
            })
            .collect();

        let needed = EQUITY_TREND_SAMPLES.max(CREDIT_TREND_SAMPLES);
        if sessions.len() < needed {
            return Err(ProviderError::InsufficientHistory {
                needed,
                available: sessions.len(),
            });
        }

        debug!(
            "📈 {} complete sessions ({} dates in table)",
            sessions.len(),
            table.len()
        );

        let equity: Vec<f64> = sessions.iter().map(|s| s.equity).collect();
        let ratios: Vec<f64> = sessions.iter().map(|s| s.credit_ratio).collect();
        let latest = &sessions[sessions.len() - 1];

        Ok(Self {
            observation_date: latest.date,
            equity_close: latest.equity,
            equity_ma200: trailing_mean(&equity, EQUITY_TREND_SAMPLES).unwrap_or(latest.equity),
            vix: latest.volatility,
            credit_ratio_current: latest.credit_ratio,
            credit_ratio_ma60: trailing_mean(&ratios, CREDIT_TREND_SAMPLES)
                .unwrap_or(latest.credit_ratio),
        })
    }
}

fn usable(close: Option<&f64>) -> Option<f64> {
    close.copied().filter(|v| v.is_finite())
}

/// Mean of the last `window` values, `None` when fewer are available
///
/// Sums deviations from the first sample of the window with Neumaier
/// compensation, so a constant series yields exactly that constant and the
/// strict `current < mean` comparisons downstream stay false on flat data.
pub fn trailing_mean(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    let tail = &values[values.len() - window..];
    let base = tail[0];

    let mut sum = 0.0_f64;
    let mut compensation = 0.0_f64;
    for value in tail {
        let deviation = value - base;
        let total = sum + deviation;
        if sum.abs() >= deviation.abs() {
            compensation += (sum - total) + deviation;
        } else {
            compensation += (deviation - total) + sum;
        }
        sum = total;
    }

    Some(base + (sum + compensation) / window as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const ROLES: SymbolRoles<'static> = SymbolRoles {
        equity: "SPY",
        volatility: "^VIX",
        high_yield: "HYG",
        investment_grade: "IEF",
    };

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
    }

    /// Sessions where SPY climbs by 1 per day from 100 and HYG/IEF is constant
    fn table(sessions: usize) -> PriceTable {
        (0..sessions)
            .map(|i| {
                let closes: BTreeMap<String, f64> = [
                    ("SPY".to_string(), 100.0 + i as f64),
                    ("^VIX".to_string(), 18.0),
                    ("HYG".to_string(), 80.0),
                    ("IEF".to_string(), 100.0),
                ]
                .into_iter()
                .collect();
                (start() + chrono::Duration::days(i as i64), closes)
            })
            .collect()
    }

    #[test]
    fn test_trailing_mean() {
        assert_eq!(trailing_mean(&[1.0, 2.0, 3.0, 4.0], 2), Some(3.5));
        assert_eq!(trailing_mean(&[1.0, 2.0, 3.0], 3), Some(2.0));
        assert_eq!(trailing_mean(&[1.0, 2.0], 3), None);
        assert_eq!(trailing_mean(&[1.0], 0), None);
    }

    #[test]
    fn test_trailing_mean_of_constant_series_is_exact() {
        let ratio = 78.0 / 95.0;
        let ma60 = trailing_mean(&vec![ratio; 60], 60).unwrap();
        assert_eq!(ma60, ratio);
        assert!(!(ratio < ma60));

        let close = 450.0;
        assert_eq!(trailing_mean(&vec![close; 200], 200), Some(close));
    }

    #[test]
    fn test_flat_credit_ratio_is_not_weakening() {
        let mut prices = table(200);
        for closes in prices.values_mut() {
            closes.insert("HYG".to_string(), 78.0);
            closes.insert("IEF".to_string(), 95.0);
        }

        let indicators = MarketIndicators::from_table(&prices, &ROLES).unwrap();
        assert_eq!(indicators.credit_ratio_current, indicators.credit_ratio_ma60);
        assert!(!(indicators.credit_ratio_current < indicators.credit_ratio_ma60));
    }

    #[test]
    fn test_derives_latest_session_and_means() {
        let indicators = MarketIndicators::from_table(&table(250), &ROLES).unwrap();

        assert_eq!(indicators.observation_date, start() + chrono::Duration::days(249));
        assert_eq!(indicators.equity_close, 349.0);
        // mean of 150..=349
        assert!((indicators.equity_ma200 - 249.5).abs() < 1e-9);
        assert_eq!(indicators.vix, 18.0);
        assert!((indicators.credit_ratio_current - 0.8).abs() < 1e-12);
        assert!((indicators.credit_ratio_ma60 - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_insufficient_history() {
        let err = MarketIndicators::from_table(&table(199), &ROLES).unwrap_err();
        match err {
            ProviderError::InsufficientHistory { needed, available } => {
                assert_eq!(needed, 200);
                assert_eq!(available, 199);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_incomplete_sessions_are_skipped() {
        let mut prices = table(201);
        let last = start() + chrono::Duration::days(200);
        // Latest date is missing the volatility close
        prices.get_mut(&last).unwrap().remove("^VIX");

        let indicators = MarketIndicators::from_table(&prices, &ROLES).unwrap();
        assert_eq!(indicators.observation_date, start() + chrono::Duration::days(199));
        assert_eq!(indicators.equity_close, 299.0);
    }

    #[test]
    fn test_non_finite_and_zero_denominator_are_skipped() {
        let mut prices = table(202);
        let d1 = start() + chrono::Duration::days(201);
        let d0 = start() + chrono::Duration::days(200);
        prices.get_mut(&d1).unwrap().insert("SPY".to_string(), f64::NAN);
        prices.get_mut(&d0).unwrap().insert("IEF".to_string(), 0.0);

        let indicators = MarketIndicators::from_table(&prices, &ROLES).unwrap();
        assert_eq!(indicators.observation_date, start() + chrono::Duration::days(199));
    }

    #[test]
    fn test_weakening_credit_ratio() {
        let mut prices = table(200);
        let last = start() + chrono::Duration::days(199);
        prices.get_mut(&last).unwrap().insert("HYG".to_string(), 70.0);

        let indicators = MarketIndicators::from_table(&prices, &ROLES).unwrap();
        assert!((indicators.credit_ratio_current - 0.7).abs() < 1e-12);
        assert!(indicators.credit_ratio_current < indicators.credit_ratio_ma60);
    }
}

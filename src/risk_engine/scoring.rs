//! 📊 Composite Risk Scoring
//!
//! Five fixed rules, evaluated in order, each adding points to the score:
//! 1. Yield-curve inversion (+3)
//! 2. Financial stress (+2 tight / +1 mild)
//! 3. Credit trend (+2)
//! 4. Volatility (+2 extreme / +1 elevated)
//! 5. Trend-following (+1)
//!
//! The total maps onto four user-facing severity tiers. Rule order is part of
//! the output: reasons are listed in evaluation order.

use std::fmt;

use log::debug;

use crate::snapshot::IndicatorSnapshot;

const INVERSION_POINTS: u32 = 3;

const TIGHT_CONDITIONS_THRESHOLD: f64 = 0.5;
const TIGHT_CONDITIONS_POINTS: u32 = 2;
const MILD_TIGHTENING_POINTS: u32 = 1;

const CREDIT_WEAKENING_POINTS: u32 = 2;

const EXTREME_FEAR_VIX: f64 = 30.0;
const EXTREME_FEAR_POINTS: u32 = 2;
const ELEVATED_HEDGING_VIX: f64 = 20.0;
const ELEVATED_HEDGING_POINTS: u32 = 1;

const BELOW_TREND_POINTS: u32 = 1;

/// How serious a single triggered rule is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn glyph(&self) -> &'static str {
        match self {
            Severity::Warning => "🟡",
            Severity::Critical => "🔴",
        }
    }
}

/// A triggered rule
#[derive(Debug, Clone, PartialEq)]
pub struct Reason {
    pub severity: Severity,
    pub label: &'static str,
    /// Quoted indicator value, for rules that show one
    pub detail: Option<String>,
}

impl Reason {
    fn new(severity: Severity, label: &'static str) -> Self {
        Self {
            severity,
            label,
            detail: None,
        }
    }

    fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.severity.glyph(), self.label)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

/// Ordinal severity tier derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Calm = 0,
    Elevated = 1,
    High = 2,
    Severe = 3,
}

impl RiskLevel {
    /// Step function: 0 → 0, 1..=2 → 1, 3..=4 → 2, 5+ → 3
    pub fn from_score(score: u32) -> Self {
        match score {
            0 => RiskLevel::Calm,
            1..=2 => RiskLevel::Elevated,
            3..=4 => RiskLevel::High,
            _ => RiskLevel::Severe,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            RiskLevel::Calm => "🟢",
            RiskLevel::Elevated => "🟡",
            RiskLevel::High => "🟠",
            RiskLevel::Severe => "🔴",
        }
    }
}

/// Score, tier and triggered reasons for one snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringResult {
    pub score: u32,
    pub level: RiskLevel,
    pub reasons: Vec<Reason>,
}

impl ScoringResult {
    /// Reasons joined for the ledger's Reasons column
    pub fn joined_reasons(&self) -> String {
        self.reasons
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Pure, deterministic rule evaluator
#[derive(Debug, Default, Clone, Copy)]
pub struct RiskScoringEngine;

impl RiskScoringEngine {
    pub fn new() -> Self {
        Self
    }

    /// Score a complete snapshot
    ///
    /// Plain comparisons only, so any finite input (negative, zero, extreme)
    /// produces a result.
    pub fn evaluate(&self, snapshot: &IndicatorSnapshot) -> ScoringResult {
        let mut score = 0;
        let mut reasons = Vec::new();

        // 1. Yield curve
        if snapshot.yield_spread < 0.0 {
            score += INVERSION_POINTS;
            reasons.push(
                Reason::new(Severity::Critical, "yield curve inverted")
                    .with_detail(format!("{:.2}", snapshot.yield_spread)),
            );
        }

        // 2. Financial stress
        if snapshot.financial_conditions_index > TIGHT_CONDITIONS_THRESHOLD {
            score += TIGHT_CONDITIONS_POINTS;
            reasons.push(
                Reason::new(Severity::Critical, "tight financial conditions")
                    .with_detail(format!("NFCI {:.2}", snapshot.financial_conditions_index)),
            );
        } else if snapshot.financial_conditions_index > 0.0 {
            score += MILD_TIGHTENING_POINTS;
            reasons.push(Reason::new(Severity::Warning, "mild tightening"));
        }

        // 3. Credit trend
        if snapshot.credit_ratio_current < snapshot.credit_ratio_ma60 {
            score += CREDIT_WEAKENING_POINTS;
            reasons.push(Reason::new(Severity::Warning, "credit spread weakening"));
        }

        // 4. Volatility
        if snapshot.vix > EXTREME_FEAR_VIX {
            score += EXTREME_FEAR_POINTS;
            reasons.push(
                Reason::new(Severity::Critical, "extreme fear")
                    .with_detail(format!("VIX {:.1}", snapshot.vix)),
            );
        } else if snapshot.vix > ELEVATED_HEDGING_VIX {
            score += ELEVATED_HEDGING_POINTS;
            reasons.push(Reason::new(Severity::Warning, "elevated hedging demand"));
        }

        // 5. Trend
        if snapshot.equity_close < snapshot.equity_ma200 {
            score += BELOW_TREND_POINTS;
            reasons.push(Reason::new(Severity::Critical, "benchmark below long-term trend"));
        }

        let level = RiskLevel::from_score(score);
        debug!(
            "📊 Risk score={} level={} reasons={}",
            score,
            level.as_u8(),
            reasons.len()
        );

        ScoringResult {
            score,
            level,
            reasons,
        }
    }
}

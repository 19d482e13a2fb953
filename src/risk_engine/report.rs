//! 📝 Daily report formatting
//!
//! Pure text rendering of a scoring result, plus the rule deciding whether a
//! ledger outcome produces a notification at all.

use chrono::NaiveDate;

use super::scoring::{RiskLevel, ScoringResult};
use crate::ledger::RecordOutcome;

const REPORT_TITLE: &str = "【Market Risk Daily】";
const SEPARATOR: &str = "----------------";
const STABLE_MESSAGE: &str = "Market foundation stable";
const ADVISORY: &str = "⚠️ Review portfolio exposure";

/// Only a newly recorded day is announced
pub fn should_notify(outcome: RecordOutcome) -> bool {
    outcome == RecordOutcome::Recorded
}

/// Render the daily summary pushed to the notification channel
pub fn format_daily_report(execution_date: NaiveDate, result: &ScoringResult) -> String {
    let mut msg = format!("{}\n{}\n", REPORT_TITLE, execution_date.format("%Y-%m-%d"));
    msg += &format!(
        "Risk level: {} Lv.{} (score: {})\n",
        result.level.glyph(),
        result.level.as_u8(),
        result.score
    );
    msg += SEPARATOR;
    msg += "\n";

    if result.reasons.is_empty() {
        msg += STABLE_MESSAGE;
    } else {
        let lines: Vec<String> = result.reasons.iter().map(|r| r.to_string()).collect();
        msg += &lines.join("\n");
    }

    if result.level >= RiskLevel::High {
        msg += "\n\n";
        msg += ADVISORY;
    }

    msg
}

/// Render a fatal run error for best-effort delivery
pub fn format_failure(error: &dyn std::fmt::Display) -> String {
    format!("System execution error: {}", error)
}

//! Execution-date source
//!
//! The ledger is keyed by the process-local calendar date, computed at a fixed
//! UTC offset so a run scheduled late in the US session lands on the same
//! day as the operator's wall clock.

use chrono::{FixedOffset, NaiveDate, Utc};

/// Supplies the execution date for a run
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock shifted to a fixed UTC offset
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// Returns `None` when the offset is outside ±24h
    pub fn with_utc_offset_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours * 3600).map(|offset| Self { offset })
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}

/// Pinned date, used for tests and replays
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(FixedClock(date).today(), date);
    }

    #[test]
    fn test_offset_bounds() {
        assert!(SystemClock::with_utc_offset_hours(8).is_some());
        assert!(SystemClock::with_utc_offset_hours(-5).is_some());
        assert!(SystemClock::with_utc_offset_hours(30).is_none());
    }

    #[test]
    fn test_system_clock_within_a_day_of_utc() {
        let clock = SystemClock::with_utc_offset_hours(14).unwrap();
        let utc_today = Utc::now().date_naive();
        let diff = (clock.today() - utc_today).num_days();
        assert!((0..=1).contains(&diff));
    }
}

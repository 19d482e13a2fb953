pub mod scoring;
pub mod report;

// Re-export main types for convenience
pub use scoring::{Reason, RiskLevel, RiskScoringEngine, ScoringResult, Severity};
pub use report::{format_daily_report, format_failure, should_notify};

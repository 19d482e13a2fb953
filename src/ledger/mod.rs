//! 📒 Daily ledger
//!
//! Append-only record store keyed by execution date, with an idempotency gate:
//! a date that is already the latest row is never written again, so a retried
//! trigger cannot duplicate history or notify twice.
//!
//! The check reads only the last row. Rows are written chronologically by a
//! single scheduled run per day; concurrent writers racing on the same date
//! are not guarded against.

pub mod csv_store;
pub mod memory_store;
pub mod sheets_store;
pub mod sqlite_store;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::info;
use thiserror::Error;

use crate::risk_engine::ScoringResult;
use crate::snapshot::IndicatorSnapshot;

pub use csv_store::CsvLedgerStore;
pub use memory_store::MemoryLedgerStore;
pub use sheets_store::SheetsLedgerStore;
pub use sqlite_store::SqliteLedgerStore;

/// Column order of every persisted row
pub const LEDGER_HEADER: [&str; 6] = [
    "ExecutionDate",
    "ObservationDate",
    "Level",
    "Score",
    "Reasons",
    "RawSnapshot",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger store unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("malformed ledger row: {0}")]
    MalformedRecord(String),

    #[error("failed to encode snapshot: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl LedgerError {
    pub fn unavailable(reason: impl ToString) -> Self {
        LedgerError::PersistenceUnavailable(reason.to_string())
    }
}

/// Result of an idempotent append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    AlreadyRecorded,
}

/// Row-oriented persistence backend
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Latest row (header included), `None` when the store is empty
    async fn read_last_row(&self) -> Result<Option<Vec<String>>, LedgerError>;

    /// Append one row at the end
    async fn append_row(&self, fields: &[String]) -> Result<(), LedgerError>;
}

/// One persisted day
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRecord {
    /// Process-local run date (the idempotency key)
    pub execution_date: NaiveDate,
    pub observation_date: NaiveDate,
    pub level: u8,
    pub score: u32,
    pub reasons: String,
    pub raw_snapshot: String,
}

impl LedgerRecord {
    pub fn new(
        execution_date: NaiveDate,
        snapshot: &IndicatorSnapshot,
        result: &ScoringResult,
    ) -> Result<Self, LedgerError> {
        Ok(Self {
            execution_date,
            observation_date: snapshot.observation_date,
            level: result.level.as_u8(),
            score: result.score,
            reasons: result.joined_reasons(),
            raw_snapshot: snapshot.to_json()?,
        })
    }

    pub fn to_row(&self) -> Vec<String> {
        vec![
            date_key(self.execution_date),
            date_key(self.observation_date),
            self.level.to_string(),
            self.score.to_string(),
            self.reasons.clone(),
            self.raw_snapshot.clone(),
        ]
    }

    pub fn from_row(row: &[String]) -> Result<Self, LedgerError> {
        if row.len() < LEDGER_HEADER.len() {
            return Err(LedgerError::MalformedRecord(format!(
                "expected {} columns, found {}",
                LEDGER_HEADER.len(),
                row.len()
            )));
        }
        let date = |s: &str| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map_err(|e| LedgerError::MalformedRecord(format!("date '{}': {}", s, e)))
        };
        Ok(Self {
            execution_date: date(&row[0])?,
            observation_date: date(&row[1])?,
            level: row[2]
                .parse()
                .map_err(|_| LedgerError::MalformedRecord(format!("level '{}'", row[2])))?,
            score: row[3]
                .parse()
                .map_err(|_| LedgerError::MalformedRecord(format!("score '{}'", row[3])))?,
            reasons: row[4].clone(),
            raw_snapshot: row[5].clone(),
        })
    }
}

/// Date string used as the idempotency key
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn is_header(row: &[String]) -> bool {
    row.first().map(String::as_str) == Some(LEDGER_HEADER[0])
}

/// Idempotency gate in front of a store
pub struct DailyLedger {
    store: Box<dyn LedgerStore>,
}

impl DailyLedger {
    pub fn new(store: Box<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Append `record` unless its execution date is already the latest row
    pub async fn try_record(&self, record: &LedgerRecord) -> Result<RecordOutcome, LedgerError> {
        let key = date_key(record.execution_date);

        let last = self.store.read_last_row().await?;
        match &last {
            Some(row) if row.first() == Some(&key) => {
                info!("⏭️  {} already recorded in {} ledger, skipping", key, self.store.name());
                return Ok(RecordOutcome::AlreadyRecorded);
            }
            None => {
                let header: Vec<String> = LEDGER_HEADER.iter().map(|h| h.to_string()).collect();
                self.store.append_row(&header).await?;
                info!("📝 Created {} ledger header", self.store.name());
            }
            Some(_) => {}
        }

        self.store.append_row(&record.to_row()).await?;
        info!(
            "📝 Recorded {} (level {}, score {}) in {} ledger",
            key,
            record.level,
            record.score,
            self.store.name()
        );
        Ok(RecordOutcome::Recorded)
    }

    /// Latest data row, parsed; `None` when the ledger holds no days yet
    pub async fn last_record(&self) -> Result<Option<LedgerRecord>, LedgerError> {
        match self.store.read_last_row().await? {
            Some(row) if !is_header(&row) => LedgerRecord::from_row(&row).map(Some),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk_engine::RiskScoringEngine;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn record(execution: NaiveDate) -> LedgerRecord {
        let snapshot = IndicatorSnapshot {
            yield_spread: -0.1,
            financial_conditions_index: 0.2,
            credit_ratio_current: 0.75,
            credit_ratio_ma60: 0.8,
            vix: 25.0,
            equity_close: 400.0,
            equity_ma200: 420.0,
            observation_date: day(3),
        };
        let result = RiskScoringEngine::new().evaluate(&snapshot);
        LedgerRecord::new(execution, &snapshot, &result).unwrap()
    }

    /// Store whose backend is gone
    struct UnreachableStore;

    #[async_trait]
    impl LedgerStore for UnreachableStore {
        fn name(&self) -> &str {
            "unreachable"
        }

        async fn read_last_row(&self) -> Result<Option<Vec<String>>, LedgerError> {
            Err(LedgerError::unavailable("connection refused"))
        }

        async fn append_row(&self, _fields: &[String]) -> Result<(), LedgerError> {
            Err(LedgerError::unavailable("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_second_record_same_day_is_skipped() {
        let store = MemoryLedgerStore::new();
        let ledger = DailyLedger::new(Box::new(store.clone()));

        assert_eq!(ledger.try_record(&record(day(6))).await.unwrap(), RecordOutcome::Recorded);
        assert_eq!(
            ledger.try_record(&record(day(6))).await.unwrap(),
            RecordOutcome::AlreadyRecorded
        );

        let rows = store.rows();
        assert_eq!(rows.len(), 2); // header + one day
        assert_eq!(rows[0], LEDGER_HEADER.map(String::from).to_vec());
        assert_eq!(rows.iter().filter(|r| r[0] == "2024-05-06").count(), 1);
    }

    #[tokio::test]
    async fn test_next_day_appends_without_second_header() {
        let store = MemoryLedgerStore::new();
        let ledger = DailyLedger::new(Box::new(store.clone()));

        ledger.try_record(&record(day(6))).await.unwrap();
        assert_eq!(ledger.try_record(&record(day(7))).await.unwrap(), RecordOutcome::Recorded);

        let rows = store.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0], "2024-05-06");
        assert_eq!(rows[2][0], "2024-05-07");
    }

    #[tokio::test]
    async fn test_header_only_store_records_without_new_header() {
        let store = MemoryLedgerStore::new();
        let header: Vec<String> = LEDGER_HEADER.iter().map(|h| h.to_string()).collect();
        store.append_row(&header).await.unwrap();

        let ledger = DailyLedger::new(Box::new(store.clone()));
        assert!(ledger.last_record().await.unwrap().is_none());
        assert_eq!(ledger.try_record(&record(day(6))).await.unwrap(), RecordOutcome::Recorded);
        assert_eq!(store.rows().len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_store() {
        let ledger = DailyLedger::new(Box::new(UnreachableStore));
        let err = ledger.try_record(&record(day(6))).await.unwrap_err();
        assert!(matches!(err, LedgerError::PersistenceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_last_record_round_trip() {
        let ledger = DailyLedger::new(Box::new(MemoryLedgerStore::new()));
        assert!(ledger.last_record().await.unwrap().is_none());

        let original = record(day(6));
        ledger.try_record(&original).await.unwrap();
        assert_eq!(ledger.last_record().await.unwrap(), Some(original));
    }

    #[test]
    fn test_row_layout() {
        let row = record(day(6)).to_row();
        assert_eq!(row.len(), LEDGER_HEADER.len());
        assert_eq!(row[0], "2024-05-06");
        assert_eq!(row[1], "2024-05-03");
        assert_eq!(row[2], "3");
        assert_eq!(row[3], "8");
        assert!(row[4].starts_with("🔴yield curve inverted (-0.10), 🟡mild tightening"));
        assert!(row[5].contains("\"vix\":25.0"));
    }

    #[test]
    fn test_from_row_rejects_garbage() {
        let short = vec!["2024-05-06".to_string()];
        assert!(matches!(
            LedgerRecord::from_row(&short),
            Err(LedgerError::MalformedRecord(_))
        ));

        let mut bad_date = record(day(6)).to_row();
        bad_date[0] = "06/05/2024".to_string();
        assert!(LedgerRecord::from_row(&bad_date).is_err());
    }
}

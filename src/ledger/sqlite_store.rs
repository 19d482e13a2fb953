//! SQLite-backed ledger
//!
//! Rows are stored positionally in `ledger_rows`; insertion order (the
//! autoincrement id) is the ledger order.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use log::info;
use rusqlite::{params, Connection, OptionalExtension};

use super::{LedgerError, LedgerStore, LEDGER_HEADER};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS ledger_rows (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    c0 TEXT NOT NULL,
    c1 TEXT NOT NULL,
    c2 TEXT NOT NULL,
    c3 TEXT NOT NULL,
    c4 TEXT NOT NULL,
    c5 TEXT NOT NULL
)";

pub struct SqliteLedgerStore {
    /// `None` for a private in-memory database
    path: Option<PathBuf>,
    /// Opened on first use, so an unreachable file fails the run, not the wiring
    conn: Mutex<Option<Connection>>,
}

impl SqliteLedgerStore {
    /// Ledger backed by the database file at `path` (created on first use)
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            conn: Mutex::new(None),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            conn: Mutex::new(None),
        }
    }

    fn connect(&self) -> Result<Connection, LedgerError> {
        let conn = match &self.path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        LedgerError::unavailable(format!("failed to create {:?}: {}", parent, e))
                    })?;
                }
                let conn = Connection::open(path).map_err(|e| {
                    LedgerError::unavailable(format!("failed to open {:?}: {}", path, e))
                })?;
                info!("✅ SQLite ledger: {}", path.display());
                conn
            }
            None => Connection::open_in_memory().map_err(LedgerError::unavailable)?,
        };
        conn.execute(SCHEMA, []).map_err(LedgerError::unavailable)?;
        Ok(conn)
    }

    /// Run `op` against the connection, opening it first if needed
    fn with_connection<T>(
        &self,
        op: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, LedgerError> {
        let mut slot = self
            .conn
            .lock()
            .map_err(|_| LedgerError::unavailable("sqlite connection lock poisoned"))?;

        let conn = match slot.take() {
            Some(conn) => conn,
            None => self.connect()?,
        };
        let result = op(&conn);
        *slot = Some(conn);

        result.map_err(LedgerError::unavailable)
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn read_last_row(&self) -> Result<Option<Vec<String>>, LedgerError> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT c0, c1, c2, c3, c4, c5 FROM ledger_rows ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    (0..LEDGER_HEADER.len())
                        .map(|i| row.get::<_, String>(i))
                        .collect::<rusqlite::Result<Vec<String>>>()
                },
            )
            .optional()
        })
    }

    async fn append_row(&self, fields: &[String]) -> Result<(), LedgerError> {
        if fields.len() != LEDGER_HEADER.len() {
            return Err(LedgerError::MalformedRecord(format!(
                "expected {} columns, got {}",
                LEDGER_HEADER.len(),
                fields.len()
            )));
        }

        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO ledger_rows (c0, c1, c2, c3, c4, c5) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![fields[0], fields[1], fields[2], fields[3], fields[4], fields[5]],
            )
        })?;

        Ok(())
    }
}

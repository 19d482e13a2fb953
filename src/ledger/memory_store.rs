//! Process-local ledger, for dry runs and tests. Clones share the same rows.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{LedgerError, LedgerStore};

#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    rows: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every row written so far, including after a writer panicked
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn read_last_row(&self) -> Result<Option<Vec<String>>, LedgerError> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| LedgerError::unavailable("memory ledger lock poisoned"))?;
        Ok(rows.last().cloned())
    }

    async fn append_row(&self, fields: &[String]) -> Result<(), LedgerError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| LedgerError::unavailable("memory ledger lock poisoned"))?;
        rows.push(fields.to_vec());
        Ok(())
    }
}

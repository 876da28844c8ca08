//! Session item storage - byte-level API for conversation item persistence.
//!
//! Each session is one row holding its whole item array, so every mutation
//! (append, pop, replace) commits in a single write transaction.

use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

const SESSION_ITEMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("session_items");

/// Low-level session item storage with byte-level API
#[derive(Debug, Clone)]
pub struct SessionItemStorage {
    db: Arc<Database>,
}

impl SessionItemStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(SESSION_ITEMS_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Store raw session data, replacing any previous value
    pub fn put_raw(&self, session_id: &str, data: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSION_ITEMS_TABLE)?;
            table.insert(session_id, data)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get raw session data by ID
    pub fn get_raw(&self, session_id: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSION_ITEMS_TABLE)?;

        if let Some(data) = table.get(session_id)? {
            Ok(Some(data.value().to_vec()))
        } else {
            Ok(None)
        }
    }

    /// Read-modify-write inside one write transaction.
    ///
    /// `update` receives the current bytes (if any) and returns the bytes to
    /// store plus a value handed back to the caller. Nothing is committed if
    /// it fails.
    pub fn update_raw<R, F>(&self, session_id: &str, update: F) -> Result<R>
    where
        F: FnOnce(Option<&[u8]>) -> Result<(Vec<u8>, R)>,
    {
        let write_txn = self.db.begin_write()?;
        let result = {
            let mut table = write_txn.open_table(SESSION_ITEMS_TABLE)?;
            let current = table.get(session_id)?.map(|data| data.value().to_vec());
            let (next, result) = update(current.as_deref())?;
            table.insert(session_id, next.as_slice())?;
            result
        };
        write_txn.commit()?;
        Ok(result)
    }

    /// List all session IDs
    pub fn list_sessions(&self) -> Result<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSION_ITEMS_TABLE)?;

        let mut sessions = Vec::new();
        for item in table.iter()? {
            let (key, _) = item?;
            sessions.push(key.value().to_string());
        }

        Ok(sessions)
    }

    /// Delete session by ID
    pub fn delete(&self, session_id: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(SESSION_ITEMS_TABLE)?;
            table.remove(session_id)?.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }
}

//! ctxmem Storage - Durable session stores on redb.
//!
//! # Tables
//!
//! - `session_items` - One JSON record per session: items plus `updated_at`

pub mod session_items;
pub mod session_store;

use anyhow::Result;
use redb::Database;
use std::sync::Arc;

pub use session_items::SessionItemStorage;
pub use session_store::{RedbSessionStore, SessionRecord};

/// Opens the database file and hands out per-session stores.
pub struct SessionDatabase {
    pub sessions: SessionItemStorage,
}

impl SessionDatabase {
    /// Create or open the database at the given path.
    pub fn open(path: &str) -> Result<Self> {
        let db = Arc::new(Database::create(path)?);
        let sessions = SessionItemStorage::new(db)?;
        tracing::info!(path, "Session database opened");
        Ok(Self { sessions })
    }

    /// Store bound to one session id.
    pub fn session(&self, session_id: impl Into<String>) -> RedbSessionStore {
        RedbSessionStore::new(session_id, self.sessions.clone())
    }

    pub fn list_sessions(&self) -> Result<Vec<String>> {
        self.sessions.list_sessions()
    }
}

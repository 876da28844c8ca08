//! redb-backed [`SessionStore`].
//!
//! A session is persisted as one JSON record in the `session_items` table.
//! Appends, pops and replacements are single write transactions, so readers
//! never see a half-applied rewrite.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ctxmem_traits::{ConversationItem, MemoryError, Result, SessionStore};
use serde::{Deserialize, Serialize};

use crate::session_items::SessionItemStorage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub items: Vec<ConversationItem>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    fn new(items: Vec<ConversationItem>) -> Self {
        Self {
            items,
            updated_at: Utc::now(),
        }
    }

    fn decode(bytes: Option<&[u8]>) -> anyhow::Result<Self> {
        match bytes {
            Some(bytes) => {
                serde_json::from_slice(bytes).context("Failed to decode session record")
            }
            None => Ok(Self::new(Vec::new())),
        }
    }

    fn encode(&self) -> anyhow::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

fn store_error(err: anyhow::Error) -> MemoryError {
    MemoryError::Store(format!("{err:#}"))
}

#[derive(Debug, Clone)]
pub struct RedbSessionStore {
    session_id: String,
    storage: SessionItemStorage,
}

impl RedbSessionStore {
    pub fn new(session_id: impl Into<String>, storage: SessionItemStorage) -> Self {
        Self {
            session_id: session_id.into(),
            storage,
        }
    }

    /// Last time this session was written, if it exists.
    pub fn updated_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.load()?.map(|record| record.updated_at))
    }

    fn load(&self) -> Result<Option<SessionRecord>> {
        let raw = self.storage.get_raw(&self.session_id).map_err(store_error)?;
        raw.map(|bytes| SessionRecord::decode(Some(&bytes)).map_err(store_error))
            .transpose()
    }

    fn update<R>(&self, f: impl FnOnce(&mut Vec<ConversationItem>) -> R) -> Result<R> {
        self.storage
            .update_raw(&self.session_id, |current| {
                let mut record = SessionRecord::decode(current)?;
                let result = f(&mut record.items);
                record.updated_at = Utc::now();
                Ok((record.encode()?, result))
            })
            .map_err(store_error)
    }
}

#[async_trait]
impl SessionStore for RedbSessionStore {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn get_items(&self, limit: Option<usize>) -> Result<Vec<ConversationItem>> {
        let mut items = self.load()?.map(|record| record.items).unwrap_or_default();
        if let Some(limit) = limit {
            let start = items.len().saturating_sub(limit);
            items.drain(..start);
        }
        Ok(items)
    }

    async fn add_items(&self, items: Vec<ConversationItem>) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        self.update(|stored| stored.extend(items))
    }

    async fn pop_item(&self) -> Result<Option<ConversationItem>> {
        if self.load()?.is_none() {
            return Ok(None);
        }
        self.update(|stored| stored.pop())
    }

    async fn clear_session(&self) -> Result<()> {
        self.storage
            .delete(&self.session_id)
            .map(|_| ())
            .map_err(store_error)
    }

    async fn replace_items(&self, items: Vec<ConversationItem>) -> Result<()> {
        let bytes = SessionRecord::new(items).encode().map_err(store_error)?;
        self.storage
            .put_raw(&self.session_id, &bytes)
            .map_err(store_error)?;
        tracing::debug!(session_id = %self.session_id, "Session items replaced");
        Ok(())
    }
}

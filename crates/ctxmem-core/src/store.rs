//! In-memory session store.

use async_trait::async_trait;
use ctxmem_traits::{ConversationItem, Result, SessionStore};
use tokio::sync::RwLock;

/// Process-local store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    session_id: String,
    items: RwLock<Vec<ConversationItem>>,
}

impl InMemorySessionStore {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            items: RwLock::new(Vec::new()),
        }
    }

    pub fn with_items(session_id: impl Into<String>, items: Vec<ConversationItem>) -> Self {
        Self {
            session_id: session_id.into(),
            items: RwLock::new(items),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn get_items(&self, limit: Option<usize>) -> Result<Vec<ConversationItem>> {
        let items = self.items.read().await;
        let start = limit.map_or(0, |limit| items.len().saturating_sub(limit));
        Ok(items[start..].to_vec())
    }

    async fn add_items(&self, items: Vec<ConversationItem>) -> Result<()> {
        self.items.write().await.extend(items);
        Ok(())
    }

    async fn pop_item(&self) -> Result<Option<ConversationItem>> {
        Ok(self.items.write().await.pop())
    }

    async fn clear_session(&self) -> Result<()> {
        self.items.write().await.clear();
        Ok(())
    }

    async fn replace_items(&self, items: Vec<ConversationItem>) -> Result<()> {
        *self.items.write().await = items;
        Ok(())
    }
}

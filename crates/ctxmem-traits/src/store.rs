//! Session item store contract.
//!
//! The store is the durable side of a conversation. Implementations are
//! provided by downstream crates (`ctxmem-core` in memory, `ctxmem-storage`
//! on redb).

use async_trait::async_trait;

use crate::error::Result;
use crate::item::ConversationItem;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Identifier of the conversation this store holds.
    fn session_id(&self) -> &str;

    /// Items in chronological order. With a limit, only the most recent
    /// `limit` items are returned (still oldest first).
    async fn get_items(&self, limit: Option<usize>) -> Result<Vec<ConversationItem>>;

    /// Append items to the end of the history.
    async fn add_items(&self, items: Vec<ConversationItem>) -> Result<()>;

    /// Remove and return the most recent item.
    async fn pop_item(&self) -> Result<Option<ConversationItem>>;

    /// Remove every item of the session.
    async fn clear_session(&self) -> Result<()>;

    /// Replace the whole history with `items`.
    ///
    /// The default clears and then appends, which other callers can observe
    /// half-done. Stores that can swap in one step should override it.
    async fn replace_items(&self, items: Vec<ConversationItem>) -> Result<()> {
        self.clear_session().await?;
        self.add_items(items).await
    }
}

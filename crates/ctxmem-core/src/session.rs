//! Session adapter: applies the memory strategy on every append.
//!
//! Reads and removals pass straight through to the wrapped store. Appends
//! read the full history, run the strategy over history + new items, and
//! swap the result in with a single `replace_items` call. The strategy
//! (summarizer included) finishes before the store is touched, so a cancelled
//! append leaves the previous history in place.

use std::sync::Arc;

use async_trait::async_trait;
use ctxmem_traits::{ConversationItem, Result, SessionStore};
use tokio::sync::Mutex;

use crate::memory::{MemoryStrategy, StrategyOutcome};

pub struct MemorySession {
    store: Arc<dyn SessionStore>,
    strategy: MemoryStrategy,
    /// Serializes read-transform-write cycles on this session.
    write_lock: Mutex<()>,
}

impl MemorySession {
    pub fn new(store: Arc<dyn SessionStore>, strategy: MemoryStrategy) -> Self {
        Self {
            store,
            strategy,
            write_lock: Mutex::new(()),
        }
    }

    pub fn strategy(&self) -> &MemoryStrategy {
        &self.strategy
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Append items and rewrite the store with the strategy's output.
    pub async fn append(&self, items: Vec<ConversationItem>) -> Result<StrategyOutcome> {
        let _guard = self.write_lock.lock().await;
        let mut history = self.store.get_items(None).await?;
        history.extend(items);

        let outcome = self.strategy.apply(history).await?;
        self.store.replace_items(outcome.items.clone()).await?;

        if outcome.changed {
            tracing::debug!(
                session_id = self.store.session_id(),
                items = outcome.items.len(),
                "Session history rewritten"
            );
        }
        Ok(outcome)
    }

    /// Run the strategy over the stored history regardless of thresholds.
    /// The store is only written when the history actually changes.
    pub async fn compact_now(&self) -> Result<StrategyOutcome> {
        let _guard = self.write_lock.lock().await;
        let history = self.store.get_items(None).await?;
        let outcome = self.strategy.force_apply(history).await?;
        if outcome.changed {
            self.store.replace_items(outcome.items.clone()).await?;
        }
        Ok(outcome)
    }
}

#[async_trait]
impl SessionStore for MemorySession {
    fn session_id(&self) -> &str {
        self.store.session_id()
    }

    async fn get_items(&self, limit: Option<usize>) -> Result<Vec<ConversationItem>> {
        self.store.get_items(limit).await
    }

    async fn add_items(&self, items: Vec<ConversationItem>) -> Result<()> {
        self.append(items).await.map(|_| ())
    }

    async fn pop_item(&self) -> Result<Option<ConversationItem>> {
        let _guard = self.write_lock.lock().await;
        self.store.pop_item().await
    }

    async fn clear_session(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.clear_session().await
    }

    async fn replace_items(&self, items: Vec<ConversationItem>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.replace_items(items).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStrategyConfig;
    use crate::mock_summarizer::{MockSummarizer, MockSummaryStep};
    use crate::store::InMemorySessionStore;
    use ctxmem_traits::MemoryError;

    fn turn(i: usize) -> Vec<ConversationItem> {
        vec![
            ConversationItem::user(format!("question {i}")),
            ConversationItem::assistant(format!("answer {i}")),
        ]
    }

    fn trim_session(max_turns: usize) -> (Arc<InMemorySessionStore>, MemorySession) {
        let store = Arc::new(InMemorySessionStore::new("session-1"));
        let session = MemorySession::new(
            store.clone(),
            MemoryStrategy::new(MemoryStrategyConfig::trim(max_turns, 0)),
        );
        (store, session)
    }

    #[tokio::test]
    async fn every_append_rewrites_to_strategy_output() {
        let (store, session) = trim_session(2);
        for i in 0..5 {
            session.add_items(turn(i)).await.unwrap();
        }
        let items = store.get_items(None).await.unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].text(), "question 3");
    }

    #[tokio::test]
    async fn reads_pass_through() {
        let (_store, session) = trim_session(10);
        session.add_items(turn(0)).await.unwrap();
        assert_eq!(session.get_items(Some(1)).await.unwrap()[0].text(), "answer 0");
        assert_eq!(session.pop_item().await.unwrap().unwrap().text(), "answer 0");
        session.clear_session().await.unwrap();
        assert!(session.get_items(None).await.unwrap().is_empty());
        assert_eq!(session.session_id(), "session-1");
    }

    #[tokio::test]
    async fn store_content_is_independent_of_prior_physical_contents() {
        let (store, session) = trim_session(2);
        store
            .add_items((0..6).flat_map(turn).collect())
            .await
            .unwrap();
        let outcome = session.append(turn(6)).await.unwrap();
        assert!(outcome.changed);
        let items = store.get_items(None).await.unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].text(), "question 5");
    }

    #[tokio::test]
    async fn summarizer_failure_leaves_store_untouched() {
        let store = Arc::new(InMemorySessionStore::with_items(
            "s",
            (0..3).flat_map(turn).collect(),
        ));
        let summarizer = Arc::new(MockSummarizer::from_steps(vec![MockSummaryStep::error(
            "rate limited",
        )]));
        let session = MemorySession::new(
            store.clone(),
            MemoryStrategy::new(MemoryStrategyConfig::summarize(2, 1)).with_summarizer(summarizer),
        );

        let err = session.append(turn(3)).await.unwrap_err();
        assert!(matches!(err, MemoryError::Summarizer(_)));
        assert_eq!(store.get_items(None).await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn cancelled_append_leaves_history_in_place() {
        let history: Vec<ConversationItem> = (0..3).flat_map(turn).collect();
        let store = Arc::new(InMemorySessionStore::with_items("s", history.clone()));
        let summarizer = Arc::new(MockSummarizer::new());
        summarizer
            .push_step(MockSummaryStep::text("too late").with_delay(5_000))
            .await;
        let session = MemorySession::new(
            store.clone(),
            MemoryStrategy::new(MemoryStrategyConfig::summarize(2, 1))
                .with_summarizer(summarizer.clone()),
        );

        let append = session.append(turn(3));
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(50), append).await;
        assert!(timed_out.is_err());
        assert_eq!(summarizer.call_count().await, 1);
        assert_eq!(store.get_items(None).await.unwrap(), history);

        // The write lock was released with the dropped future.
        session.append(turn(3)).await.unwrap();
        let items = store.get_items(None).await.unwrap();
        assert!(items[1].text().starts_with("summary of "));
    }

    #[tokio::test]
    async fn compact_now_forces_the_strategy() {
        let store = Arc::new(InMemorySessionStore::with_items(
            "s",
            (0..3).flat_map(turn).collect(),
        ));
        let session = MemorySession::new(
            store.clone(),
            MemoryStrategy::new(MemoryStrategyConfig::trim(10, 1)),
        );
        let outcome = session.compact_now().await.unwrap();
        assert!(outcome.changed);
        assert_eq!(store.get_items(None).await.unwrap().len(), 2);
    }
}

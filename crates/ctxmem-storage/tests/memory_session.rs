//! The session adapter running over the redb store.

use std::sync::Arc;

use ctxmem_core::memory::Turns;
use ctxmem_core::{
    ConversationItem, MemorySession, MemoryStrategy, MemoryStrategyConfig, SessionStore,
};
use ctxmem_storage::SessionDatabase;
use serde_json::json;
use tempfile::tempdir;

fn tool_turn(i: usize) -> Vec<ConversationItem> {
    vec![
        ConversationItem::user(format!("question {i}")),
        ConversationItem::tool_call(format!("call_{i}"), "search", json!({"q": i})),
        ConversationItem::tool_result(format!("call_{i}"), format!("result {i}")),
        ConversationItem::assistant(format!("answer {i}")),
    ]
}

#[tokio::test]
async fn compacted_history_survives_reopen() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("memory.db");
    let path = db_path.to_str().unwrap();

    {
        let db = SessionDatabase::open(path).unwrap();
        let session = MemorySession::new(
            Arc::new(db.session("chat")),
            MemoryStrategy::new(MemoryStrategyConfig::compact(3, 1)),
        );
        for i in 0..5 {
            session.add_items(tool_turn(i)).await.unwrap();
        }
    }

    let db = SessionDatabase::open(path).unwrap();
    let items = db.session("chat").get_items(None).await.unwrap();
    assert_eq!(items.len(), 20);
    assert_eq!(Turns::group(&items).user_turn_count(), 5);
    assert!(items[2].compacted);
    assert!(items[2].text().starts_with("⟦removed: tool output for search"));
    assert!(!items[18].compacted);
}

#[tokio::test]
async fn trimmed_history_replaces_stored_items() {
    let temp_dir = tempdir().unwrap();
    let db = SessionDatabase::open(temp_dir.path().join("trim.db").to_str().unwrap()).unwrap();
    let store = Arc::new(db.session("chat"));
    let session = MemorySession::new(
        store.clone(),
        MemoryStrategy::new(MemoryStrategyConfig::trim(2, 0)),
    );

    for i in 0..4 {
        session.add_items(tool_turn(i)).await.unwrap();
    }

    let items = store.get_items(None).await.unwrap();
    assert_eq!(items.len(), 8);
    assert_eq!(items[0].text(), "question 2");
}

//! ctxmem Core - Conversation memory engine for LLM agents
//!
//! This crate provides:
//! - Token estimation and user-turn grouping over conversation items
//! - Trim, summarize and compact strategies plus the dispatcher that picks one
//! - A session adapter that rewrites the store on every append
//! - An in-memory session store and a resilient summarizer wrapper

pub mod memory;
pub mod mock_summarizer;
pub mod session;
pub mod store;
pub mod summarizer;

// Re-export commonly used types
pub use ctxmem_traits::{
    ConversationItem, ItemBody, ItemKind, MemoryError, Result, Role, SessionStore, Summarizer,
    TelemetrySink,
};
pub use memory::{
    CompactionTelemetry, MemoryMetrics, MemoryMode, MemoryStrategy, MemoryStrategyConfig,
    StrategyOutcome, SummaryCallback, TriggerReason,
};
pub use mock_summarizer::{MockSummarizer, MockSummaryStep};
pub use session::MemorySession;
pub use store::InMemorySessionStore;
pub use summarizer::{ResilientSummarizer, SummarizerRetryConfig};

//! Memory strategies for agent conversations
//!
//! Decides, on every append, whether the stored history should shrink and
//! how:
//!
//! - **Trim**: drop whole old turns (zero LLM cost)
//! - **Summarize**: fold old turns into a two-item summary (LLM cost)
//! - **Compact**: replace old tool payloads with placeholders in place
//! - **None**: keep everything
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 full history + new items                     │
//! │                          │                                   │
//! │          estimate_tokens │ Turns::group                      │
//! │                          ▼                                   │
//! │                 MemoryStrategy (dispatcher)                  │
//! │        token_budget > token_soft_budget > turn threshold     │
//! │              │            │              │                   │
//! │            trim       summarize       compact                │
//! │              └────────────┴──────────────┘                   │
//! │                          ▼                                   │
//! │                   StrategyOutcome                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod compact;
pub mod config;
pub mod strategy;
pub mod summarize;
pub mod telemetry;
pub mod tokens;
pub mod trim;
pub mod turns;

use ctxmem_traits::ConversationItem;

pub use compact::{PayloadKind, UNKNOWN_TOOL, placeholder};
pub use config::{DEFAULT_SUMMARY_PREFIX, MemoryMode, MemoryStrategyConfig};
pub use strategy::{MemoryStrategy, StrategyOutcome};
pub use summarize::{SummaryCallback, format_transcript};
pub use telemetry::{
    CompactParameters, CompactionTelemetry, MemoryMetrics, MemoryMetricsSnapshot, TriggerReason,
};
pub use tokens::{estimate_item_tokens, estimate_tokens};
pub use turns::{Turn, Turns};

/// Output of an engine that decided to act.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    pub items: Vec<ConversationItem>,
    pub telemetry: CompactionTelemetry,
}

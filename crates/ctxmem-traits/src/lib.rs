//! ctxmem Traits - Shared data model and collaborator contracts.
//!
//! This crate provides the pieces every ctxmem crate agrees on:
//! - ConversationItem, the closed item model parsed from provider JSON
//! - MemoryError and the crate-wide Result alias
//! - SessionStore, Summarizer and TelemetrySink collaborator traits

pub mod error;
pub mod item;
pub mod store;
pub mod summarizer;
pub mod telemetry;

pub use error::{MemoryError, Result};
pub use item::{Content, ContentBlock, ConversationItem, ItemBody, ItemKind, Role};
pub use store::SessionStore;
pub use summarizer::Summarizer;
pub use telemetry::{TelemetryError, TelemetrySink};

//! Summarizer contract used by the summarize strategy.

use async_trait::async_trait;

use crate::error::Result;

/// Turns a conversation transcript into a short summary.
///
/// Implementations own their input-length cap and retry policy. They should
/// never return an empty string for non-empty input.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String>;
}

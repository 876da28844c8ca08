//! Resilient summarizer wrapper.
//!
//! Wraps any [`Summarizer`] with an input cap, retries with exponential
//! backoff, and a last-resort fallback so the summarize strategy never
//! receives an empty summary for a non-empty transcript.

use std::time::Duration;

use async_trait::async_trait;
use ctxmem_traits::{Result, Summarizer};

pub const DEFAULT_MAX_INPUT_CHARS: usize = 24_000;

#[derive(Debug, Clone)]
pub struct SummarizerRetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for SummarizerRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl SummarizerRetryConfig {
    /// No retries at all.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = self
            .backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32);
        let delay = (self.initial_delay_ms as f64 * multiplier) as u64;
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

/// Cap `text` at `max_chars` characters, keeping its head and tail around a
/// marker that names how many characters were left out. Non-empty input
/// always keeps at least one character.
pub fn truncate_middle(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }

    let budget = max_chars.max(1);
    // Sized with `total` so the real marker is never longer.
    let widest_marker = omitted_marker(total).chars().count();
    if budget <= widest_marker {
        return text.chars().take(budget).collect();
    }

    let keep = budget - widest_marker;
    let head = keep.div_ceil(2);
    let tail = keep - head;

    let mut out: String = text.chars().take(head).collect();
    out.push_str(&omitted_marker(total - keep));
    out.extend(text.chars().skip(total - tail));
    out
}

fn omitted_marker(omitted: usize) -> String {
    format!("\n[... {omitted} chars omitted ...]\n")
}

pub struct ResilientSummarizer<S> {
    inner: S,
    max_input_chars: usize,
    retry: SummarizerRetryConfig,
}

impl<S: Summarizer> ResilientSummarizer<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            retry: SummarizerRetryConfig::default(),
        }
    }

    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    pub fn with_retry(mut self, retry: SummarizerRetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Summarizer> Summarizer for ResilientSummarizer<S> {
    async fn summarize(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let input = truncate_middle(text, self.max_input_chars);
        let mut attempt: u32 = 0;
        loop {
            match self.inner.summarize(&input).await {
                Ok(summary) if !summary.trim().is_empty() => return Ok(summary),
                Ok(_) => tracing::warn!(attempt, "Summarizer returned empty summary"),
                Err(err) => tracing::warn!(attempt, error = %err, "Summarizer call failed"),
            }

            attempt += 1;
            if attempt > self.retry.max_retries {
                break;
            }
            tokio::time::sleep(self.retry.delay_for(attempt)).await;
        }

        tracing::warn!(
            chars = input.chars().count(),
            "Summarizer exhausted retries, falling back to truncated transcript"
        );
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_summarizer::{MockSummarizer, MockSummaryStep};

    fn no_delay(max_retries: u32) -> SummarizerRetryConfig {
        SummarizerRetryConfig {
            max_retries,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 2.0,
        }
    }

    #[test]
    fn delay_progression() {
        let config = SummarizerRetryConfig::default();
        assert_eq!(config.delay_for(1), Duration::from_millis(200));
        assert_eq!(config.delay_for(2), Duration::from_millis(400));
        assert_eq!(config.delay_for(3), Duration::from_millis(800));
        assert_eq!(config.delay_for(6), Duration::from_millis(5000));
    }

    #[test]
    fn input_within_cap_is_returned_as_is() {
        assert_eq!(truncate_middle("short transcript", 16), "short transcript");
        assert_eq!(truncate_middle("", 0), "");
    }

    #[test]
    fn truncation_keeps_both_ends() {
        let s = format!("{}{}", "H".repeat(500), "T".repeat(500));
        let result = truncate_middle(&s, 200);
        assert_eq!(result.chars().count(), 199);
        assert!(result.starts_with('H'));
        assert!(result.ends_with('T'));
        assert!(result.contains("[... 830 chars omitted ...]"));
    }

    #[test]
    fn cap_counts_chars_not_bytes() {
        let s = "你好世界".repeat(100);
        let result = truncate_middle(&s, 50);
        assert!(result.chars().count() <= 50);
        assert!(result.starts_with('你'));
        assert!(result.ends_with('界'));
    }

    #[test]
    fn tiny_cap_still_keeps_a_char() {
        assert_eq!(truncate_middle("你好世界", 2), "你好");
        assert_eq!(truncate_middle("你好世界", 0), "你");
    }

    #[tokio::test]
    async fn retries_until_success() {
        let inner = MockSummarizer::from_steps(vec![
            MockSummaryStep::error("503"),
            MockSummaryStep::text(""),
            MockSummaryStep::text("finally"),
        ]);
        let summarizer = ResilientSummarizer::new(inner).with_retry(no_delay(3));
        assert_eq!(summarizer.summarize("transcript").await.unwrap(), "finally");
        assert_eq!(summarizer.inner().call_count().await, 3);
    }

    #[tokio::test]
    async fn falls_back_to_truncated_input() {
        let inner = MockSummarizer::from_steps(vec![
            MockSummaryStep::error("down"),
            MockSummaryStep::error("down"),
        ]);
        let summarizer = ResilientSummarizer::new(inner)
            .with_retry(no_delay(1))
            .with_max_input_chars(100);
        let text = "x".repeat(1_000);
        let summary = summarizer.summarize(&text).await.unwrap();
        assert!(!summary.is_empty());
        assert!(summary.len() <= 100);
        assert_eq!(summarizer.inner().call_count().await, 2);
    }

    #[tokio::test]
    async fn fallback_is_never_empty_for_multibyte_input() {
        let inner = MockSummarizer::from_steps(vec![MockSummaryStep::error("down")]);
        let summarizer = ResilientSummarizer::new(inner)
            .with_retry(SummarizerRetryConfig::disabled())
            .with_max_input_chars(2);
        assert_eq!(summarizer.summarize("你好世界").await.unwrap(), "你好");
    }

    #[tokio::test]
    async fn caps_input_before_calling_inner() {
        let inner = MockSummarizer::from_steps(vec![MockSummaryStep::text("ok")]);
        let summarizer = ResilientSummarizer::new(inner).with_max_input_chars(120);
        summarizer.summarize(&"y".repeat(5_000)).await.unwrap();
        let prompts = summarizer.inner().prompts().await;
        assert!(prompts[0].len() <= 120);
    }

    #[tokio::test]
    async fn empty_input_short_circuits() {
        let summarizer = ResilientSummarizer::new(MockSummarizer::new());
        assert_eq!(summarizer.summarize("  ").await.unwrap(), "");
        assert_eq!(summarizer.inner().call_count().await, 0);
    }
}

//! Deterministic mock summarizer for tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use ctxmem_traits::{MemoryError, Result, Summarizer};
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};

#[derive(Debug, Clone)]
pub enum MockSummaryKind {
    Text(String),
    Error(String),
}

/// Scripted summarize step with optional delay.
#[derive(Debug, Clone)]
pub struct MockSummaryStep {
    pub delay_ms: u64,
    pub kind: MockSummaryKind,
}

impl MockSummaryStep {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockSummaryKind::Text(content.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockSummaryKind::Error(message.into()),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// Summarizer driven by scripted steps. Once the script runs out it answers
/// with a fixed description of the input length.
#[derive(Debug, Clone, Default)]
pub struct MockSummarizer {
    script: Arc<Mutex<VecDeque<MockSummaryStep>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<MockSummaryStep>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::from(steps))),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn push_step(&self, step: MockSummaryStep) {
        self.script.lock().await.push_back(step);
    }

    /// Every transcript received so far.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.prompts.lock().await.len()
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        self.prompts.lock().await.push(text.to_string());
        let step = self.script.lock().await.pop_front();
        let Some(step) = step else {
            return Ok(format!("summary of {} chars", text.chars().count()));
        };

        if step.delay_ms > 0 {
            sleep(Duration::from_millis(step.delay_ms)).await;
        }

        match step.kind {
            MockSummaryKind::Text(content) => Ok(content),
            MockSummaryKind::Error(message) => Err(MemoryError::Summarizer(message)),
        }
    }
}

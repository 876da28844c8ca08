//! Strategy dispatcher.
//!
//! Every call starts from the full history: tokens and turns are recomputed
//! from scratch so nothing drifts between calls. Exactly one engine runs.

use std::sync::Arc;

use ctxmem_traits::{ConversationItem, MemoryError, Result, Summarizer, TelemetrySink};

use super::Rewrite;
use super::compact::compact;
use super::config::{MemoryMode, MemoryStrategyConfig};
use super::summarize::{SummaryCallback, summarize};
use super::telemetry::{CompactionTelemetry, TriggerReason};
use super::tokens::estimate_tokens;
use super::trim::trim;

/// Result of one dispatcher call.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub items: Vec<ConversationItem>,
    /// True when the engine produced a sequence different from its input.
    pub changed: bool,
    pub trigger_reason: TriggerReason,
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub telemetry: Option<CompactionTelemetry>,
}

/// Configured memory strategy plus its injected collaborators.
#[derive(Clone)]
pub struct MemoryStrategy {
    config: MemoryStrategyConfig,
    summarizer: Option<Arc<dyn Summarizer>>,
    on_summary: Option<SummaryCallback>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
}

impl std::fmt::Debug for MemoryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStrategy")
            .field("config", &self.config)
            .field("has_summarizer", &self.summarizer.is_some())
            .field("has_on_summary", &self.on_summary.is_some())
            .field("has_telemetry", &self.telemetry.is_some())
            .finish()
    }
}

impl MemoryStrategy {
    pub fn new(config: MemoryStrategyConfig) -> Self {
        Self {
            config,
            summarizer: None,
            on_summary: None,
            telemetry: None,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_summary_callback(mut self, callback: SummaryCallback) -> Self {
        self.on_summary = Some(callback);
        self
    }

    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    pub fn config(&self) -> &MemoryStrategyConfig {
        &self.config
    }

    /// Token trigger for a given estimate. The hard budget wins when both fire.
    pub fn token_trigger(&self, estimated_tokens: usize) -> TriggerReason {
        if self
            .config
            .token_budget()
            .is_some_and(|budget| estimated_tokens > budget)
        {
            TriggerReason::TokenBudget
        } else if self
            .config
            .token_soft_budget()
            .is_some_and(|budget| estimated_tokens > budget)
        {
            TriggerReason::TokenSoftBudget
        } else {
            TriggerReason::None
        }
    }

    /// Run the configured strategy over the full history.
    pub async fn apply(&self, items: Vec<ConversationItem>) -> Result<StrategyOutcome> {
        self.run(items, false).await
    }

    /// Run the configured strategy as if a trigger fired.
    pub async fn force_apply(&self, items: Vec<ConversationItem>) -> Result<StrategyOutcome> {
        self.run(items, true).await
    }

    /// Synchronous variant for trim, compact and none. Summarize needs the
    /// async summarizer and is rejected.
    pub fn apply_sync(&self, items: Vec<ConversationItem>) -> Result<StrategyOutcome> {
        let tokens_before = estimate_tokens(&items);
        let trigger = self.token_trigger(tokens_before);
        let rewrite = match self.config.mode {
            MemoryMode::Summarize => {
                return Err(MemoryError::Config(
                    "summarize mode cannot run synchronously".to_string(),
                ));
            }
            _ => self.rewrite_sync(&items, trigger),
        };
        Ok(self.finish(items, tokens_before, trigger, rewrite))
    }

    async fn run(&self, items: Vec<ConversationItem>, manual: bool) -> Result<StrategyOutcome> {
        let tokens_before = estimate_tokens(&items);
        let trigger = if manual {
            TriggerReason::Manual
        } else {
            self.token_trigger(tokens_before)
        };

        let rewrite = match self.config.mode {
            MemoryMode::Summarize => {
                let summarizer = self.summarizer.as_deref().ok_or_else(|| {
                    MemoryError::Config("summarize mode requires a summarizer".to_string())
                })?;
                summarize(
                    &items,
                    &self.config,
                    trigger,
                    summarizer,
                    self.on_summary.as_ref(),
                )
                .await?
            }
            _ => self.rewrite_sync(&items, trigger),
        };

        Ok(self.finish(items, tokens_before, trigger, rewrite))
    }

    fn rewrite_sync(&self, items: &[ConversationItem], trigger: TriggerReason) -> Option<Rewrite> {
        match self.config.mode {
            MemoryMode::None | MemoryMode::Summarize => None,
            MemoryMode::Trim => trim(items, &self.config, trigger),
            MemoryMode::Compact => compact(items, &self.config, trigger),
        }
    }

    fn finish(
        &self,
        items: Vec<ConversationItem>,
        tokens_before: usize,
        trigger: TriggerReason,
        rewrite: Option<Rewrite>,
    ) -> StrategyOutcome {
        if trigger != TriggerReason::None {
            tracing::debug!(
                strategy = %self.config.mode,
                trigger = trigger.as_str(),
                tokens = tokens_before,
                "Memory strategy triggered"
            );
        }

        let Some(rewrite) = rewrite else {
            return StrategyOutcome {
                items,
                changed: false,
                trigger_reason: trigger,
                tokens_before,
                tokens_after: tokens_before,
                telemetry: None,
            };
        };

        let reason = rewrite.telemetry.trigger_reason;
        if rewrite.items == items {
            // Re-compacting already compacted items lands here.
            return StrategyOutcome {
                items,
                changed: false,
                trigger_reason: reason,
                tokens_before,
                tokens_after: tokens_before,
                telemetry: Some(rewrite.telemetry),
            };
        }

        let tokens_after = estimate_tokens(&rewrite.items);
        tracing::info!(
            strategy = %self.config.mode,
            trigger = reason.as_str(),
            items_before = rewrite.telemetry.items_before,
            items_after = rewrite.telemetry.items_after,
            tokens_before,
            tokens_after,
            "Memory strategy rewrote history"
        );
        self.emit_metrics(reason, tokens_before, tokens_after);

        StrategyOutcome {
            items: rewrite.items,
            changed: true,
            trigger_reason: reason,
            tokens_before,
            tokens_after,
            telemetry: Some(rewrite.telemetry),
        }
    }

    fn emit_metrics(&self, reason: TriggerReason, tokens_before: usize, tokens_after: usize) {
        let Some(sink) = &self.telemetry else {
            return;
        };
        let strategy = self.config.mode.as_str();
        if let Err(err) = sink.record_trigger(strategy, reason.as_str()) {
            tracing::warn!(error = %err, "Failed to record memory trigger metric");
        }
        if let Err(err) = sink.record_tokens(strategy, reason.as_str(), tokens_before, tokens_after)
        {
            tracing::warn!(error = %err, "Failed to record memory token metric");
        }
    }
}

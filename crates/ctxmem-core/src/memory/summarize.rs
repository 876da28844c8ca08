//! Summarize: fold old turns into a two-item synthetic summary.
//!
//! The prefix is lost after this runs. Only the summary text survives, so a
//! failing summarizer aborts the whole rewrite instead of dropping history.

use std::sync::Arc;

use ctxmem_traits::{ConversationItem, ItemBody, Result, Role, Summarizer};

use super::Rewrite;
use super::config::{MemoryMode, MemoryStrategyConfig};
use super::telemetry::{CompactionTelemetry, TriggerReason};
use super::turns::Turns;

/// Best-effort hook invoked with every generated summary.
pub type SummaryCallback = Arc<dyn Fn(&str) -> anyhow::Result<()> + Send + Sync>;

/// Render items as one labelled line each for the summarizer.
pub fn format_transcript(items: &[ConversationItem]) -> String {
    let mut out = String::new();
    for item in items {
        let label = match &item.body {
            ItemBody::Message { role, .. } => match role {
                Role::User => "User".to_string(),
                Role::Assistant => "Assistant".to_string(),
                Role::System => "System".to_string(),
                Role::Developer => "Developer".to_string(),
            },
            ItemBody::Reasoning { .. } => "Reasoning".to_string(),
            ItemBody::ToolCall { name, .. } => format!("Tool call {name}"),
            ItemBody::ToolResult { call_id, .. } => format!("Tool result ({call_id})"),
            ItemBody::Other { item_type } => item_type.clone(),
        };
        out.push_str(&label);
        out.push_str(": ");
        out.push_str(&item.text());
        out.push('\n');
    }
    out
}

pub async fn summarize(
    items: &[ConversationItem],
    config: &MemoryStrategyConfig,
    trigger: TriggerReason,
    summarizer: &dyn Summarizer,
    on_summary: Option<&SummaryCallback>,
) -> Result<Option<Rewrite>> {
    let turns = Turns::group(items);
    let user_turns = turns.user_turn_count();

    if !trigger.forces() {
        let Some(max_turns) = config.max_turns() else {
            return Ok(None);
        };
        if user_turns <= max_turns {
            return Ok(None);
        }
    }

    // The most recent turn is never summarized away.
    let split = turns.window_start(config.keep_last_turns.max(1));
    if split == 0 {
        return Ok(None);
    }

    let transcript = format_transcript(&items[..split]);
    let summary = summarizer.summarize(&transcript).await?;
    if summary.trim().is_empty() {
        tracing::warn!("Summarizer returned empty summary, skipping summarize");
        return Ok(None);
    }

    if let Some(callback) = on_summary
        && let Err(err) = callback(&summary)
    {
        tracing::warn!(error = %err, "on_summary callback failed");
    }

    let tail = &items[split..];
    let mut output = Vec::with_capacity(2 + tail.len());
    output.push(ConversationItem::user(config.summary_prefix.clone()));
    output.push(ConversationItem::assistant(summary));
    output.extend_from_slice(tail);

    let telemetry = CompactionTelemetry {
        strategy: MemoryMode::Summarize,
        trigger_reason: trigger.effective(),
        items_before: items.len(),
        items_after: output.len(),
        turns_before: user_turns,
        turns_after: Turns::group(&output).user_turn_count(),
        items_dropped: split,
        ..Default::default()
    };

    Ok(Some(Rewrite {
        items: output,
        telemetry,
    }))
}

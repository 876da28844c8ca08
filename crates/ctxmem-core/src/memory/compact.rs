//! Compact: replace old tool payloads with fixed placeholders, in place.
//!
//! Unlike trim and summarize, compaction keeps every item and every turn. Only
//! tool call arguments and tool outputs outside the protected window change.

use std::collections::HashMap;
use std::fmt;

use ctxmem_traits::{ConversationItem, ItemBody};
use serde_json::Value;

use super::Rewrite;
use super::config::{MemoryMode, MemoryStrategyConfig};
use super::telemetry::{CompactParameters, CompactionTelemetry, TriggerReason};
use super::turns::Turns;

pub const UNKNOWN_TOOL: &str = "unknown";
const COMPACTION_REASON: &str = "context_compaction";

/// Which side of a tool exchange a placeholder replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Input,
    Output,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadKind::Input => f.write_str("input"),
            PayloadKind::Output => f.write_str("output"),
        }
    }
}

/// The placeholder text. Prompts scan for this exact shape, glyphs included.
pub fn placeholder(kind: PayloadKind, tool_name: &str, call_id: &str) -> String {
    format!(
        "⟦removed: tool {kind} for {tool_name} (call_id={call_id}); reason={COMPACTION_REASON}⟧"
    )
}

/// call_id -> tool name, built from calls and from results that name themselves.
fn tool_name_index(items: &[ConversationItem]) -> HashMap<&str, &str> {
    let mut index = HashMap::new();
    for item in items {
        match &item.body {
            ItemBody::ToolCall { call_id, name, .. } => {
                index.insert(call_id.as_str(), name.as_str());
            }
            ItemBody::ToolResult {
                call_id,
                name: Some(name),
                ..
            } => {
                index.entry(call_id.as_str()).or_insert(name.as_str());
            }
            _ => {}
        }
    }
    index
}

fn compacted_item(item: &ConversationItem, kind: PayloadKind, tool_name: &str) -> ConversationItem {
    let mut item = item.clone();
    match &mut item.body {
        ItemBody::ToolCall {
            call_id, arguments, ..
        } => *arguments = Value::String(placeholder(kind, tool_name, call_id)),
        ItemBody::ToolResult {
            call_id, output, ..
        } => *output = Value::String(placeholder(kind, tool_name, call_id)),
        ItemBody::Message { .. } | ItemBody::Reasoning { .. } | ItemBody::Other { .. } => {}
    }
    item.compacted = true;
    item
}

pub fn compact(
    items: &[ConversationItem],
    config: &MemoryStrategyConfig,
    trigger: TriggerReason,
) -> Option<Rewrite> {
    let turns = Turns::group(items);
    let user_turns = turns.user_turn_count();

    if !trigger.forces() {
        let trigger_turns = config.trigger_turns()?;
        if user_turns <= trigger_turns {
            return None;
        }
    }

    let protected_from = if config.keep > 0 {
        turns.window_start(config.keep)
    } else {
        items.len()
    };

    let index = tool_name_index(items);
    let mut marked: Vec<(usize, PayloadKind, &str)> = Vec::new();
    for (position, item) in items[..protected_from].iter().enumerate() {
        let kind = match &item.body {
            ItemBody::ToolResult { .. } => PayloadKind::Output,
            ItemBody::ToolCall { .. } if config.clear_tool_inputs => PayloadKind::Input,
            _ => continue,
        };
        let call_id = item.call_id().unwrap_or_default();
        let tool_name = item
            .tool_name()
            .or_else(|| index.get(call_id).copied())
            .unwrap_or(UNKNOWN_TOOL);
        if !config.tool_selected(tool_name) {
            continue;
        }
        marked.push((position, kind, tool_name));
    }

    if marked.is_empty() {
        return None;
    }

    let mut output = items.to_vec();
    let mut telemetry = CompactionTelemetry {
        strategy: MemoryMode::Compact,
        trigger_reason: trigger.effective(),
        items_before: items.len(),
        items_after: items.len(),
        turns_before: user_turns,
        turns_after: user_turns,
        compacted_count: marked.len(),
        compact_parameters: Some(CompactParameters {
            trigger_turns: config.trigger_turns(),
            keep: config.keep,
            clear_tool_inputs: config.clear_tool_inputs,
            exclude_tools: config.exclude_tools.clone(),
            include_tools: config.include_tools.clone(),
        }),
        ..Default::default()
    };

    for (position, kind, tool_name) in marked {
        match kind {
            PayloadKind::Input => telemetry.compacted_inputs += 1,
            PayloadKind::Output => telemetry.compacted_outputs += 1,
        }
        let original = &items[position];
        telemetry
            .call_ids
            .push(original.call_id().unwrap_or_default().to_string());
        telemetry.tool_names.push(tool_name.to_string());
        output[position] = compacted_item(original, kind, tool_name);
    }

    Some(Rewrite {
        items: output,
        telemetry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// One turn: user, tool call, tool result, assistant.
    fn tool_turn(i: usize, tool: &str) -> Vec<ConversationItem> {
        vec![
            ConversationItem::user(format!("question {i}")),
            ConversationItem::tool_call(format!("call_{i}"), tool, json!({"q": i})),
            ConversationItem::tool_result(format!("call_{i}"), format!("result {i}")),
            ConversationItem::assistant(format!("answer {i}")),
        ]
    }

    fn conversation(turns: usize, tool: &str) -> Vec<ConversationItem> {
        (1..=turns).flat_map(|i| tool_turn(i, tool)).collect()
    }

    #[test]
    fn placeholder_format_is_exact() {
        assert_eq!(
            placeholder(PayloadKind::Output, "search", "call_5"),
            "⟦removed: tool output for search (call_id=call_5); reason=context_compaction⟧"
        );
        assert_eq!(
            placeholder(PayloadKind::Input, "unknown", "c"),
            "⟦removed: tool input for unknown (call_id=c); reason=context_compaction⟧"
        );
    }

    #[test]
    fn no_op_without_trigger_turns() {
        let config = MemoryStrategyConfig::compact(0, 2);
        assert!(compact(&conversation(20, "search"), &config, TriggerReason::None).is_none());
    }

    #[test]
    fn no_op_at_trigger_turns() {
        let config = MemoryStrategyConfig::compact(4, 1);
        assert!(compact(&conversation(4, "search"), &config, TriggerReason::None).is_none());
    }

    #[test]
    fn compacts_results_outside_protected_turns() {
        let config = MemoryStrategyConfig::compact(3, 2);
        let items = conversation(4, "search");
        let rewrite = compact(&items, &config, TriggerReason::None).unwrap();

        assert_eq!(rewrite.items.len(), items.len());
        assert!(rewrite.items[2].compacted);
        assert_eq!(
            rewrite.items[2].text(),
            placeholder(PayloadKind::Output, "search", "call_1")
        );
        assert_eq!(rewrite.items[2].call_id(), Some("call_1"));
        assert!(rewrite.items[6].compacted);
        // Calls untouched without clear_tool_inputs.
        assert_eq!(rewrite.items[1], items[1]);
        // Last two turns protected.
        assert_eq!(&rewrite.items[8..], &items[8..]);

        let telemetry = &rewrite.telemetry;
        assert_eq!(telemetry.compacted_count, 2);
        assert_eq!(telemetry.compacted_outputs, 2);
        assert_eq!(telemetry.compacted_inputs, 0);
        assert_eq!(telemetry.call_ids, vec!["call_1", "call_2"]);
        assert_eq!(telemetry.tool_names, vec!["search", "search"]);
        assert_eq!(telemetry.turns_before, telemetry.turns_after);
    }

    #[test]
    fn clear_tool_inputs_compacts_calls_too() {
        let config = MemoryStrategyConfig::compact(1, 1).with_clear_tool_inputs(true);
        let rewrite = compact(&conversation(2, "fetch"), &config, TriggerReason::None).unwrap();
        let call = &rewrite.items[1];
        assert!(call.compacted);
        assert_eq!(call.tool_name(), Some("fetch"));
        assert_eq!(call.text(), placeholder(PayloadKind::Input, "fetch", "call_1"));
        assert_eq!(rewrite.telemetry.compacted_inputs, 1);
        assert_eq!(rewrite.telemetry.compacted_outputs, 1);
    }

    #[test]
    fn recompacting_is_stable() {
        let config = MemoryStrategyConfig::compact(2, 1).with_clear_tool_inputs(true);
        let first = compact(&conversation(3, "search"), &config, TriggerReason::None).unwrap();
        let second = compact(&first.items, &config, TriggerReason::None).unwrap();
        assert_eq!(first.items, second.items);
        assert_eq!(second.telemetry.compacted_count, first.telemetry.compacted_count);
    }

    #[test]
    fn include_and_exclude_filter_by_resolved_name() {
        let mut items = conversation(1, "get_order");
        items.extend(tool_turn(2, "search"));
        items.extend(tool_turn(3, "lookup"));

        let config = MemoryStrategyConfig::compact(1, 1).with_exclude_tools(["get_order"]);
        let rewrite = compact(&items, &config, TriggerReason::None).unwrap();
        assert!(!rewrite.items[2].compacted);
        assert!(rewrite.items[6].compacted);

        let config = MemoryStrategyConfig::compact(1, 1).with_include_tools(["get_order"]);
        let rewrite = compact(&items, &config, TriggerReason::None).unwrap();
        assert!(rewrite.items[2].compacted);
        assert!(!rewrite.items[6].compacted);
    }

    #[test]
    fn orphan_results_resolve_to_unknown() {
        let items = vec![
            ConversationItem::user("q1"),
            ConversationItem::tool_result("lost", "payload"),
            ConversationItem::user("q2"),
        ];
        let config = MemoryStrategyConfig::compact(1, 1);
        let rewrite = compact(&items, &config, TriggerReason::None).unwrap();
        assert_eq!(
            rewrite.items[1].text(),
            placeholder(PayloadKind::Output, UNKNOWN_TOOL, "lost")
        );
        assert_eq!(rewrite.telemetry.tool_names, vec![UNKNOWN_TOOL]);
    }

    #[test]
    fn keep_zero_protects_nothing_when_forced() {
        let config = MemoryStrategyConfig::compact(0, 0);
        let rewrite = compact(&conversation(1, "search"), &config, TriggerReason::Manual).unwrap();
        assert!(rewrite.items[2].compacted);
        assert_eq!(rewrite.telemetry.trigger_reason, TriggerReason::Manual);
    }

    #[test]
    fn nothing_to_mark_is_a_no_op() {
        let items: Vec<ConversationItem> = (0..5)
            .map(|i| ConversationItem::user(format!("q{i}")))
            .collect();
        let config = MemoryStrategyConfig::compact(1, 1);
        assert!(compact(&items, &config, TriggerReason::None).is_none());
    }

    #[test]
    fn provider_payload_is_preserved() {
        let mut items = conversation(2, "search");
        items[2]
            .provider_data
            .insert("status".to_string(), json!("completed"));
        let config = MemoryStrategyConfig::compact(1, 1);
        let rewrite = compact(&items, &config, TriggerReason::None).unwrap();
        assert_eq!(
            rewrite.items[2].provider_data.get("status"),
            Some(&json!("completed"))
        );
    }
}

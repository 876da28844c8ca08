//! Trim: drop whole turns from the front of the history.

use ctxmem_traits::ConversationItem;

use super::Rewrite;
use super::config::{MemoryMode, MemoryStrategyConfig};
use super::telemetry::{CompactionTelemetry, TriggerReason};
use super::turns::Turns;

/// Keep only the most recent turns once the history grows past `max_turns`.
///
/// Returns `None` when nothing would be dropped.
pub fn trim(
    items: &[ConversationItem],
    config: &MemoryStrategyConfig,
    trigger: TriggerReason,
) -> Option<Rewrite> {
    let turns = Turns::group(items);
    let user_turns = turns.user_turn_count();

    if !trigger.forces() {
        let max_turns = config.max_turns()?;
        if user_turns <= max_turns {
            return None;
        }
    }

    // An explicit keep window wins over max_turns once triggered.
    let keep_turns = if config.keep_last_turns > 0 {
        Some(config.keep_last_turns.max(1))
    } else {
        config.max_turns()
    };
    let start = match keep_turns {
        Some(n) => turns.window_start(n),
        None => 0,
    };
    if start == 0 {
        return None;
    }

    let kept = items[start..].to_vec();
    let turns_after = Turns::group(&kept).user_turn_count();
    let telemetry = CompactionTelemetry {
        strategy: MemoryMode::Trim,
        trigger_reason: trigger.effective(),
        items_before: items.len(),
        items_after: kept.len(),
        turns_before: user_turns,
        turns_after,
        items_dropped: start,
        ..Default::default()
    };

    Some(Rewrite {
        items: kept,
        telemetry,
    })
}

//! Approximate token estimation.
//!
//! Only used to compare against budgets. Counts are never exact and should
//! not be shown to users as such.

use ctxmem_traits::ConversationItem;

const CHARS_PER_TOKEN: usize = 4;

/// Estimate tokens for a single item: `ceil(chars / 4)`, and never 0.
pub fn estimate_item_tokens(item: &ConversationItem) -> usize {
    let chars: usize = item
        .text_fragments()
        .iter()
        .map(|fragment| fragment.chars().count())
        .sum();
    if chars == 0 {
        1
    } else {
        chars.div_ceil(CHARS_PER_TOKEN)
    }
}

/// Estimate total tokens for an item list.
pub fn estimate_tokens(items: &[ConversationItem]) -> usize {
    items.iter().map(estimate_item_tokens).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_text_costs_one_token() {
        assert_eq!(estimate_item_tokens(&ConversationItem::user("")), 1);
        assert_eq!(
            estimate_item_tokens(&ConversationItem::tool_result("c1", json!(null))),
            1
        );
    }

    #[test]
    fn rounds_up_to_whole_tokens() {
        assert_eq!(estimate_item_tokens(&ConversationItem::user("abcd")), 1);
        assert_eq!(estimate_item_tokens(&ConversationItem::user("abcde")), 2);
        assert_eq!(estimate_item_tokens(&ConversationItem::user("x".repeat(40_000))), 10_000);
    }

    #[test]
    fn counts_chars_not_bytes() {
        // 8 chars, 24 bytes
        let item = ConversationItem::user("你好世界你好世界");
        assert_eq!(estimate_item_tokens(&item), 2);
    }

    #[test]
    fn monotonic_in_length() {
        let mut previous = 0;
        for len in 0..64 {
            let tokens = estimate_item_tokens(&ConversationItem::assistant("y".repeat(len)));
            assert!(tokens >= previous, "len={len}");
            previous = tokens;
        }
    }

    #[test]
    fn tool_arguments_and_outputs_are_counted() {
        let call = ConversationItem::tool_call("c1", "search", json!({"q": "abcdefgh"}));
        assert_eq!(estimate_item_tokens(&call), 2);
        let result = ConversationItem::tool_result("c1", "z".repeat(9));
        assert_eq!(estimate_item_tokens(&result), 3);
    }

    #[test]
    fn reasoning_trace_is_counted() {
        let item: ConversationItem = serde_json::from_value(json!({
            "type": "reasoning",
            "summary": [],
            "content": [{"type": "reasoning_text", "text": "x".repeat(400)}]
        }))
        .unwrap();
        assert_eq!(estimate_item_tokens(&item), 100);
    }

    #[test]
    fn pass_through_items_count_their_payload() {
        let item: ConversationItem = serde_json::from_value(json!({
            "type": "web_search_call",
            "id": "ws_0123456789",
            "status": "completed",
            "action": {"query": "q".repeat(40)}
        }))
        .unwrap();
        assert_eq!(estimate_item_tokens(&item), 10);
    }

    #[test]
    fn sequence_total_is_sum_of_items() {
        let items = vec![
            ConversationItem::user("abcd"),
            ConversationItem::assistant(""),
            ConversationItem::assistant("abcdefgh"),
        ];
        assert_eq!(estimate_tokens(&items), 1 + 1 + 2);
        assert_eq!(estimate_tokens(&[]), 0);
    }
}

//! Turn grouping.
//!
//! A turn starts at each user message and runs up to the next one. Items
//! before the first user message form an unanchored prelude turn, which is
//! subject to trim and compact but never counted against turn thresholds.

use std::ops::Range;

use ctxmem_traits::ConversationItem;

/// A contiguous span of item positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Turn {
    pub start: usize,
    pub end: usize,
    /// False only for the prelude turn.
    pub anchored: bool,
}

impl Turn {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Exact partition of an item sequence into turns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Turns {
    turns: Vec<Turn>,
    item_count: usize,
}

impl Turns {
    pub fn group(items: &[ConversationItem]) -> Self {
        let mut turns: Vec<Turn> = Vec::new();
        for (i, item) in items.iter().enumerate() {
            if item.is_user_anchored() || turns.is_empty() {
                if let Some(last) = turns.last_mut() {
                    last.end = i;
                }
                turns.push(Turn {
                    start: i,
                    end: i + 1,
                    anchored: item.is_user_anchored(),
                });
            }
        }
        if let Some(last) = turns.last_mut() {
            last.end = items.len();
        }
        Self {
            turns,
            item_count: items.len(),
        }
    }

    pub fn as_slice(&self) -> &[Turn] {
        &self.turns
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Number of user-anchored turns. The prelude does not count.
    pub fn user_turn_count(&self) -> usize {
        self.turns.iter().filter(|turn| turn.anchored).count()
    }

    /// First item position of the last `n` user turns.
    ///
    /// `n == 0` yields the sequence length (empty window). When fewer than `n`
    /// user turns exist the window covers everything, prelude included.
    pub fn window_start(&self, n: usize) -> usize {
        if n == 0 {
            return self.item_count;
        }
        self.turns
            .iter()
            .rev()
            .filter(|turn| turn.anchored)
            .nth(n - 1)
            .map(|turn| turn.start)
            .unwrap_or(0)
    }
}

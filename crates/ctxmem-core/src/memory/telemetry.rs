//! Per-call telemetry and a counter-based metrics sink.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use ctxmem_traits::{TelemetryError, TelemetrySink};
use parking_lot::Mutex;
use serde::Serialize;

use super::config::MemoryMode;

/// Why a strategy ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    #[default]
    None,
    /// The turn-count threshold of the mode was exceeded.
    Turns,
    TokenSoftBudget,
    TokenBudget,
    /// Operator-requested run.
    Manual,
}

impl TriggerReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerReason::None => "none",
            TriggerReason::Turns => "turns",
            TriggerReason::TokenSoftBudget => "token_soft_budget",
            TriggerReason::TokenBudget => "token_budget",
            TriggerReason::Manual => "manual",
        }
    }

    /// Forced runs skip the turn-count preconditions of every engine.
    pub fn forces(&self) -> bool {
        matches!(
            self,
            TriggerReason::TokenSoftBudget | TriggerReason::TokenBudget | TriggerReason::Manual
        )
    }

    /// Reason reported once an engine decided to act.
    pub(crate) fn effective(self) -> Self {
        if self.forces() { self } else { TriggerReason::Turns }
    }
}

/// Compact parameters in effect for one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompactParameters {
    pub trigger_turns: Option<usize>,
    pub keep: usize,
    pub clear_tool_inputs: bool,
    pub exclude_tools: BTreeSet<String>,
    pub include_tools: BTreeSet<String>,
}

/// What one strategy run did. Derived fresh on every call and never fed back
/// into the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompactionTelemetry {
    pub strategy: MemoryMode,
    pub trigger_reason: TriggerReason,
    pub items_before: usize,
    pub items_after: usize,
    pub turns_before: usize,
    pub turns_after: usize,
    pub items_dropped: usize,
    pub compacted_count: usize,
    pub compacted_inputs: usize,
    pub compacted_outputs: usize,
    pub call_ids: Vec<String>,
    pub tool_names: Vec<String>,
    pub compact_parameters: Option<CompactParameters>,
}

// ---------------------------------------------------------------------------
// Metrics sink
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TriggerCounters {
    pub triggers: u64,
    pub tokens_before: u64,
    pub tokens_after: u64,
}

/// In-process metrics collector keyed by (strategy, trigger reason).
#[derive(Debug, Default)]
pub struct MemoryMetrics {
    counters: Mutex<HashMap<(String, String), TriggerCounters>>,
}

impl MemoryMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> MemoryMetricsSnapshot {
        let counters = self.counters.lock();
        let mut entries: Vec<MetricsEntry> = counters
            .iter()
            .map(|((strategy, reason), counters)| MetricsEntry {
                strategy: strategy.clone(),
                trigger_reason: reason.clone(),
                counters: *counters,
            })
            .collect();
        entries.sort_by(|a, b| {
            (a.strategy.as_str(), a.trigger_reason.as_str())
                .cmp(&(b.strategy.as_str(), b.trigger_reason.as_str()))
        });
        MemoryMetricsSnapshot { entries }
    }

    pub fn get(&self, strategy: &str, reason: &str) -> TriggerCounters {
        self.counters
            .lock()
            .get(&(strategy.to_string(), reason.to_string()))
            .copied()
            .unwrap_or_default()
    }
}

impl TelemetrySink for MemoryMetrics {
    fn record_trigger(&self, strategy: &str, reason: &str) -> Result<(), TelemetryError> {
        let mut counters = self.counters.lock();
        counters
            .entry((strategy.to_string(), reason.to_string()))
            .or_default()
            .triggers += 1;
        Ok(())
    }

    fn record_tokens(
        &self,
        strategy: &str,
        reason: &str,
        before: usize,
        after: usize,
    ) -> Result<(), TelemetryError> {
        let mut counters = self.counters.lock();
        let entry = counters
            .entry((strategy.to_string(), reason.to_string()))
            .or_default();
        entry.tokens_before += before as u64;
        entry.tokens_after += after as u64;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsEntry {
    pub strategy: String,
    pub trigger_reason: String,
    pub counters: TriggerCounters,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryMetricsSnapshot {
    pub entries: Vec<MetricsEntry>,
}

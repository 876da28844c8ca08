//! Strategy configuration.
//!
//! One [`MemoryStrategyConfig`] is fixed per conversation. Thresholds left at
//! their defaults (`None` / `0`) disable the behaviour they control, which is
//! how a mode is switched off without being an error.

use std::collections::BTreeSet;

use ctxmem_traits::{MemoryError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SUMMARY_PREFIX: &str = "Summarize the conversation we had so far.";

/// Which strategy runs on every append.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryMode {
    #[default]
    None,
    Trim,
    Summarize,
    Compact,
}

impl MemoryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryMode::None => "none",
            MemoryMode::Trim => "trim",
            MemoryMode::Summarize => "summarize",
            MemoryMode::Compact => "compact",
        }
    }
}

impl std::fmt::Display for MemoryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStrategyConfig {
    pub mode: MemoryMode,

    // Trim / Summarize
    pub max_turns: Option<usize>,
    pub keep_last_turns: usize,

    // Compact
    pub trigger_turns: Option<usize>,
    pub keep: usize,
    pub clear_tool_inputs: bool,
    pub exclude_tools: BTreeSet<String>,
    /// When non-empty, only these tools are compacted.
    pub include_tools: BTreeSet<String>,

    // All modes
    pub token_budget: Option<usize>,
    pub token_soft_budget: Option<usize>,

    // Summarize
    pub summary_prefix: String,
}

impl Default for MemoryStrategyConfig {
    fn default() -> Self {
        Self {
            mode: MemoryMode::None,
            max_turns: None,
            keep_last_turns: 0,
            trigger_turns: None,
            keep: 0,
            clear_tool_inputs: false,
            exclude_tools: BTreeSet::new(),
            include_tools: BTreeSet::new(),
            token_budget: None,
            token_soft_budget: None,
            summary_prefix: DEFAULT_SUMMARY_PREFIX.to_string(),
        }
    }
}

fn positive(value: Option<usize>) -> Option<usize> {
    value.filter(|v| *v > 0)
}

impl MemoryStrategyConfig {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn trim(max_turns: usize, keep_last_turns: usize) -> Self {
        Self {
            mode: MemoryMode::Trim,
            max_turns: Some(max_turns),
            keep_last_turns,
            ..Self::default()
        }
    }

    pub fn summarize(max_turns: usize, keep_last_turns: usize) -> Self {
        Self {
            mode: MemoryMode::Summarize,
            max_turns: Some(max_turns),
            keep_last_turns,
            ..Self::default()
        }
    }

    pub fn compact(trigger_turns: usize, keep: usize) -> Self {
        Self {
            mode: MemoryMode::Compact,
            trigger_turns: Some(trigger_turns),
            keep,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: MemoryMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_token_budget(mut self, tokens: usize) -> Self {
        self.token_budget = Some(tokens);
        self
    }

    pub fn with_token_soft_budget(mut self, tokens: usize) -> Self {
        self.token_soft_budget = Some(tokens);
        self
    }

    pub fn with_clear_tool_inputs(mut self, clear: bool) -> Self {
        self.clear_tool_inputs = clear;
        self
    }

    pub fn with_exclude_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_include_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_summary_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.summary_prefix = prefix.into();
        self
    }

    /// Effective `max_turns`; zero counts as unset.
    pub fn max_turns(&self) -> Option<usize> {
        positive(self.max_turns)
    }

    /// Effective `trigger_turns`; zero counts as unset.
    pub fn trigger_turns(&self) -> Option<usize> {
        positive(self.trigger_turns)
    }

    pub fn token_budget(&self) -> Option<usize> {
        positive(self.token_budget)
    }

    pub fn token_soft_budget(&self) -> Option<usize> {
        positive(self.token_soft_budget)
    }

    /// Whether compaction may touch items of this tool.
    pub fn tool_selected(&self, name: &str) -> bool {
        if self.exclude_tools.contains(name) {
            return false;
        }
        self.include_tools.is_empty() || self.include_tools.contains(name)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if let (Some(hard), Some(soft)) = (self.token_budget(), self.token_soft_budget())
            && soft > hard
        {
            return Err(MemoryError::Config(format!(
                "token_soft_budget ({soft}) must not exceed token_budget ({hard})"
            )));
        }

        if let Some(tool) = self.include_tools.intersection(&self.exclude_tools).next() {
            return Err(MemoryError::Config(format!(
                "tool `{tool}` is both included and excluded"
            )));
        }

        Ok(())
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|err| MemoryError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }
}

//! Telemetry sink contract.
//!
//! Sinks are fire-and-forget: the engine ignores every error they return.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("telemetry sink unavailable: {0}")]
    Unavailable(String),
}

pub trait TelemetrySink: Send + Sync {
    /// Count one strategy activation, keyed by (strategy, trigger reason).
    fn record_trigger(&self, strategy: &str, reason: &str) -> Result<(), TelemetryError>;

    /// Record estimated token totals around one activation.
    fn record_tokens(
        &self,
        strategy: &str,
        reason: &str,
        before: usize,
        after: usize,
    ) -> Result<(), TelemetryError>;
}

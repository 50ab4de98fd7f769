use async_trait::async_trait;
use quotron_types::{HealthStatus, MarketIndex, Quote};
use std::time::Duration;

use crate::error::QuotronError;

/// Outcome of a [`Provider::health_check`] call.
#[derive(Debug, Clone)]
pub struct HealthOutcome {
    /// Resulting status.
    pub status: HealthStatus,
    /// Round-trip latency of the probe.
    pub latency_ms: u64,
    /// Error message, if the probe did not succeed.
    pub error: Option<String>,
}

/// The closed capability set every upstream data source implements
/// (spec.md §4.1 and §9 — "a closed capability set ... tagged variants of
/// an abstract `Provider`").
///
/// Selection among providers is data-driven through the failover chain in
/// `quotron-providers::router`, not through inheritance or dynamic
/// capability discovery — every `Provider` implements all four methods,
/// returning [`QuotronError::Unsupported`] for the ones it genuinely cannot
/// serve (e.g. a crypto-only sidecar asked for an index).
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable provider tag, e.g. `"alpha_vantage"`.
    fn name(&self) -> &'static str;

    /// Fetch a single equity quote. `symbol` is already normalized.
    async fn get_stock_quote(&self, symbol: &str) -> Result<Quote, QuotronError>;

    /// Fetch a single market index. `name` is already normalized.
    async fn get_market_index(&self, name: &str) -> Result<MarketIndex, QuotronError>;

    /// Fetch a single cryptocurrency quote. `symbol` is already normalized.
    async fn get_crypto_quote(&self, symbol: &str) -> Result<Quote, QuotronError>;

    /// Perform a minimal representative health probe and report the result.
    async fn health_check(&self) -> HealthOutcome;

    /// Per-call timeout this provider honors (spec.md §4.1, default 30s).
    fn timeout(&self) -> Duration {
        Duration::from_secs(30)
    }
}

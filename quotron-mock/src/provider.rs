//! Deterministic mock provider with per-symbol overrides, grounded on the
//! teacher's `MockConnector` fixture pattern.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use quotron_core::{HealthOutcome, Provider, QuotronError};
use quotron_types::{HealthStatus, MarketIndex, Quote, Source, Venue};
use rust_decimal::Decimal;

/// What a [`MockProvider`] does for a given symbol.
#[derive(Debug, Clone)]
pub enum Canned {
    /// Return a quote with this price (change/change_percent default to zero).
    Price(Decimal),
    /// Fail every call with this error.
    Fail(MockError),
}

/// A cloneable stand-in for [`QuotronError`] (which is itself `Clone`, but
/// spelling it out here keeps fixture tables readable at call sites).
pub type MockError = QuotronError;

/// Mock [`Provider`] returning canned per-symbol responses, a single default
/// behavior for symbols without an override, and a call counter useful for
/// asserting retry/failover behavior in tests.
pub struct MockProvider {
    name: &'static str,
    default: Canned,
    overrides: HashMap<String, Canned>,
    calls: Mutex<u64>,
}

impl MockProvider {
    /// A provider that succeeds with price 100.00 for every symbol.
    #[must_use]
    pub fn always_ok(name: &'static str) -> Self {
        Self {
            name,
            default: Canned::Price(Decimal::new(10000, 2)),
            overrides: HashMap::new(),
            calls: Mutex::new(0),
        }
    }

    /// A provider that fails every call with `error`.
    #[must_use]
    pub fn always_failing(name: &'static str, error: QuotronError) -> Self {
        Self {
            name,
            default: Canned::Fail(error),
            overrides: HashMap::new(),
            calls: Mutex::new(0),
        }
    }

    /// Override the behavior for one symbol.
    #[must_use]
    pub fn with_override(mut self, symbol: impl Into<String>, behavior: Canned) -> Self {
        self.overrides.insert(symbol.into(), behavior);
        self
    }

    /// Number of fetch calls made so far (stock + index + crypto combined).
    #[must_use]
    pub fn call_count(&self) -> u64 {
        *self.calls.lock().expect("mutex poisoned")
    }

    fn resolve(&self, symbol: &str) -> Canned {
        *self.calls.lock().expect("mutex poisoned") += 1;
        self.overrides
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn get_stock_quote(&self, symbol: &str) -> Result<Quote, QuotronError> {
        match self.resolve(symbol) {
            Canned::Price(price) => Ok(Quote {
                symbol: symbol.to_string(),
                price,
                change: Decimal::ZERO,
                change_percent: Decimal::ZERO,
                volume: 0,
                timestamp: Utc::now(),
                exchange: Venue::Other,
                source: Source::Manual,
                batch_id: None,
            }),
            Canned::Fail(err) => Err(err),
        }
    }

    async fn get_market_index(&self, name: &str) -> Result<MarketIndex, QuotronError> {
        match self.resolve(name) {
            Canned::Price(value) => Ok(MarketIndex {
                name: name.to_string(),
                symbol: name.to_string(),
                value,
                change: Decimal::ZERO,
                change_percent: Decimal::ZERO,
                timestamp: Utc::now(),
                source: Source::Manual,
                batch_id: None,
            }),
            Canned::Fail(err) => Err(err),
        }
    }

    async fn get_crypto_quote(&self, symbol: &str) -> Result<Quote, QuotronError> {
        match self.resolve(symbol) {
            Canned::Price(price) => Ok(Quote {
                symbol: symbol.to_string(),
                price,
                change: Decimal::ZERO,
                change_percent: Decimal::ZERO,
                volume: 0,
                timestamp: Utc::now(),
                exchange: Venue::Crypto,
                source: Source::Manual,
                batch_id: None,
            }),
            Canned::Fail(err) => Err(err),
        }
    }

    async fn health_check(&self) -> HealthOutcome {
        match &self.default {
            Canned::Price(_) => HealthOutcome {
                status: HealthStatus::Healthy,
                latency_ms: 1,
                error: None,
            },
            Canned::Fail(err) => HealthOutcome {
                status: HealthStatus::Failed,
                latency_ms: 1,
                error: Some(err.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn per_symbol_override_wins_over_default() {
        let provider = MockProvider::always_ok("mock")
            .with_override("FAIL", Canned::Fail(QuotronError::NotFound("FAIL".to_string())));
        provider.get_stock_quote("AAPL").await.unwrap();
        let err = provider.get_stock_quote("FAIL").await.unwrap_err();
        assert!(matches!(err, QuotronError::NotFound(_)));
        assert_eq!(provider.call_count(), 2);
    }
}

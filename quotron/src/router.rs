//! Failover chains for equity/index and crypto lookups (spec.md §4.1).
//!
//! `alpha_vantage -> yahoo_sidecar -> yahoo_rest` for equities and indices;
//! `yahoo_sidecar -> yahoo_rest` for crypto. Retry/advance decisions are
//! made here; health-based skipping is handled by whichever middleware
//! layer wraps each provider (typically [`quotron_middleware::HealthGatedProvider`]).

use std::sync::Arc;
use std::time::Duration;

use quotron_core::{HealthOutcome, Provider, QuotronError};
use quotron_types::{MarketIndex, Quote};
use tracing::{debug, warn};

/// Retries for a `transient` error against the same provider before advancing.
const TRANSIENT_RETRY_ATTEMPTS: u32 = 3;
/// Base backoff, multiplied by attempt number (spec.md §4.1).
const TRANSIENT_RETRY_BASE: Duration = Duration::from_millis(500);

/// An ordered chain of providers tried in sequence for one capability.
pub struct FailoverChain {
    providers: Vec<Arc<dyn Provider>>,
}

impl FailoverChain {
    /// Build a chain from an ordered provider list; index 0 is tried first.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self { providers }
    }

    async fn dispatch<T, F>(&self, mut call: F) -> Result<T, QuotronError>
    where
        F: FnMut(Arc<dyn Provider>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<T, QuotronError>> + Send>>,
    {
        let mut all_errors = Vec::new();

        for provider in &self.providers {
            let mut attempt = 0;
            loop {
                attempt += 1;
                match call(Arc::clone(provider)).await {
                    Ok(value) => return Ok(value),
                    Err(err) if err.advances_failover_immediately() => {
                        debug!(provider = provider.name(), error = %err, "advancing to next provider");
                        all_errors.push(err);
                        break;
                    }
                    Err(err) if err.is_transient() && attempt < TRANSIENT_RETRY_ATTEMPTS => {
                        warn!(provider = provider.name(), attempt, error = %err, "retrying after transient error");
                        tokio::time::sleep(TRANSIENT_RETRY_BASE * attempt).await;
                    }
                    Err(err) if err.is_not_found() => {
                        return Err(err);
                    }
                    Err(err) => {
                        all_errors.push(err);
                        break;
                    }
                }
            }
        }

        Err(QuotronError::AllProvidersFailed(all_errors))
    }

    /// Fetch a stock quote, trying each provider in order.
    pub async fn get_stock_quote(&self, symbol: &str) -> Result<Quote, QuotronError> {
        let symbol = symbol.to_string();
        self.dispatch(move |provider| {
            let symbol = symbol.clone();
            Box::pin(async move { provider.get_stock_quote(&symbol).await })
        })
        .await
    }

    /// Fetch a market index, trying each provider in order.
    pub async fn get_market_index(&self, name: &str) -> Result<MarketIndex, QuotronError> {
        let name = name.to_string();
        self.dispatch(move |provider| {
            let name = name.clone();
            Box::pin(async move { provider.get_market_index(&name).await })
        })
        .await
    }

    /// Fetch a crypto quote, trying each provider in order.
    pub async fn get_crypto_quote(&self, symbol: &str) -> Result<Quote, QuotronError> {
        let symbol = symbol.to_string();
        self.dispatch(move |provider| {
            let symbol = symbol.clone();
            Box::pin(async move { provider.get_crypto_quote(&symbol).await })
        })
        .await
    }

    /// Health of every provider in the chain, in chain order.
    pub async fn health_check_all(&self) -> Vec<(&'static str, HealthOutcome)> {
        let mut out = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            out.push((provider.name(), provider.health_check().await));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotron_mock::MockProvider;

    #[tokio::test]
    async fn rate_limited_advances_to_next_provider() {
        let primary = MockProvider::always_failing(
            "primary",
            QuotronError::RateLimited("budget exhausted".to_string()),
        );
        let secondary = MockProvider::always_ok("secondary");
        let chain = FailoverChain::new(vec![Arc::new(primary), Arc::new(secondary)]);
        let quote = chain.get_stock_quote("AAPL").await.unwrap();
        assert_eq!(quote.symbol, "AAPL");
    }

    #[tokio::test]
    async fn not_found_abandons_without_trying_next_provider() {
        let primary = MockProvider::always_failing("primary", QuotronError::NotFound("AAPL".to_string()));
        let secondary = MockProvider::always_ok("secondary");
        let chain = FailoverChain::new(vec![Arc::new(primary), Arc::new(secondary)]);
        let err = chain.get_stock_quote("AAPL").await.unwrap_err();
        assert!(matches!(err, QuotronError::NotFound(_)));
    }

    #[tokio::test]
    async fn all_providers_failing_is_reported() {
        let a = MockProvider::always_failing("a", QuotronError::Unavailable("down".to_string()));
        let b = MockProvider::always_failing("b", QuotronError::Unavailable("down".to_string()));
        let chain = FailoverChain::new(vec![Arc::new(a), Arc::new(b)]);
        let err = chain.get_stock_quote("AAPL").await.unwrap_err();
        assert!(matches!(err, QuotronError::AllProvidersFailed(_)));
    }
}

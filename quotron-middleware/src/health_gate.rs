//! Skips a provider whose last reported health was `failed` or `limited`
//! within the current minute (spec.md §4.1's failover-chain skip rule).

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use quotron_core::{HealthOutcome, Middleware, Provider, QuotronError};
use quotron_types::{HealthStatus, MarketIndex, Quote};

const SKIP_WINDOW: Duration = Duration::from_secs(60);

/// Wraps a [`Provider`], remembering its last [`HealthOutcome`] and
/// short-circuiting calls with [`QuotronError::Unavailable`] while that
/// outcome is still within the skip window.
pub struct HealthGatedProvider {
    inner: Arc<dyn Provider>,
    last_bad: Mutex<Option<(HealthStatus, Instant)>>,
}

/// Middleware layer constructing a [`HealthGatedProvider`] for [`apply_stack`](quotron_core::apply_stack).
pub struct HealthGateMiddleware;

impl HealthGateMiddleware {
    /// Build the health-gating middleware layer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for HealthGateMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for HealthGateMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn Provider>) -> Arc<dyn Provider> {
        Arc::new(HealthGatedProvider::new(inner))
    }

    fn name(&self) -> &'static str {
        "health_gate"
    }
}

impl HealthGatedProvider {
    /// Wrap `inner`, initially ungated.
    #[must_use]
    pub fn new(inner: Arc<dyn Provider>) -> Self {
        Self {
            inner,
            last_bad: Mutex::new(None),
        }
    }

    fn record(&self, status: HealthStatus) {
        let mut guard = self.last_bad.lock().expect("mutex poisoned");
        if status.skip_in_failover() {
            *guard = Some((status, Instant::now()));
        } else {
            *guard = None;
        }
    }

    fn currently_skipped(&self) -> Option<HealthStatus> {
        let mut guard = self.last_bad.lock().expect("mutex poisoned");
        match *guard {
            Some((status, at)) if at.elapsed() < SKIP_WINDOW => Some(status),
            Some(_) => {
                *guard = None;
                None
            }
            None => None,
        }
    }

    fn status_of(err: &QuotronError) -> Option<HealthStatus> {
        match err {
            QuotronError::RateLimited(_) => Some(HealthStatus::Limited),
            QuotronError::AuthDenied(_) | QuotronError::Unavailable(_) => {
                Some(HealthStatus::Failed)
            }
            _ => None,
        }
    }
}

#[async_trait]
impl Provider for HealthGatedProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn get_stock_quote(&self, symbol: &str) -> Result<Quote, QuotronError> {
        if let Some(status) = self.currently_skipped() {
            return Err(skip_error(self.inner.name(), status));
        }
        let result = self.inner.get_stock_quote(symbol).await;
        if let Err(err) = &result {
            if let Some(status) = Self::status_of(err) {
                self.record(status);
            }
        }
        result
    }

    async fn get_market_index(&self, name: &str) -> Result<MarketIndex, QuotronError> {
        if let Some(status) = self.currently_skipped() {
            return Err(skip_error(self.inner.name(), status));
        }
        let result = self.inner.get_market_index(name).await;
        if let Err(err) = &result {
            if let Some(status) = Self::status_of(err) {
                self.record(status);
            }
        }
        result
    }

    async fn get_crypto_quote(&self, symbol: &str) -> Result<Quote, QuotronError> {
        if let Some(status) = self.currently_skipped() {
            return Err(skip_error(self.inner.name(), status));
        }
        let result = self.inner.get_crypto_quote(symbol).await;
        if let Err(err) = &result {
            if let Some(status) = Self::status_of(err) {
                self.record(status);
            }
        }
        result
    }

    async fn health_check(&self) -> HealthOutcome {
        let outcome = self.inner.health_check().await;
        self.record(outcome.status);
        outcome
    }
}

fn skip_error(provider: &str, status: HealthStatus) -> QuotronError {
    QuotronError::Unavailable(format!("{provider} skipped, last status {status:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotron_mock::MockProvider;

    #[tokio::test]
    async fn failed_provider_is_skipped_within_window() {
        let inner: Arc<dyn Provider> = Arc::new(MockProvider::always_failing(
            "mock",
            QuotronError::Unavailable("down".to_string()),
        ));
        let gated = HealthGatedProvider::new(inner);
        let _ = gated.get_stock_quote("AAPL").await;
        let err = gated.get_stock_quote("AAPL").await.unwrap_err();
        assert!(matches!(err, QuotronError::Unavailable(_)));
    }

    #[tokio::test]
    async fn healthy_provider_is_not_gated() {
        let inner: Arc<dyn Provider> = Arc::new(MockProvider::always_ok("mock"));
        let gated = HealthGatedProvider::new(inner);
        gated.get_stock_quote("AAPL").await.unwrap();
        gated.get_stock_quote("AAPL").await.unwrap();
    }
}

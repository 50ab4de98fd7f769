//! Quota-aware provider wrapper enforcing the primary provider's rate
//! discipline (spec.md §4.2: 5 requests/minute, 25/day).

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use quotron_core::{HealthOutcome, Middleware, Provider, QuotronError};
use quotron_types::{MarketIndex, Quote};

/// Per-minute and per-day call budget for a wrapped provider.
#[derive(Debug, Clone, Copy)]
pub struct QuotaConfig {
    /// Maximum calls allowed within a rolling 1-minute window.
    pub per_minute: u64,
    /// Maximum calls allowed within a rolling 24-hour window.
    pub per_day: u64,
}

impl QuotaConfig {
    /// The primary provider's documented budget (spec.md §4.2).
    #[must_use]
    pub const fn primary_provider() -> Self {
        Self {
            per_minute: 5,
            per_day: 25,
        }
    }
}

struct QuotaRuntime {
    minute_count: u64,
    minute_start: Instant,
    day_count: u64,
    day_start: Instant,
}

/// Wraps a [`Provider`] and rejects calls once the configured minute or
/// day budget is exhausted, rather than forwarding to the inner provider
/// and burning its real quota.
pub struct QuotaAwareProvider {
    inner: Arc<dyn Provider>,
    config: QuotaConfig,
    runtime: Mutex<QuotaRuntime>,
}

/// Middleware layer constructing a [`QuotaAwareProvider`] for [`apply_stack`](quotron_core::apply_stack).
pub struct QuotaMiddleware {
    config: QuotaConfig,
}

impl QuotaMiddleware {
    /// Build a quota-enforcing middleware layer.
    #[must_use]
    pub const fn new(config: QuotaConfig) -> Self {
        Self { config }
    }
}

impl Middleware for QuotaMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn Provider>) -> Arc<dyn Provider> {
        Arc::new(QuotaAwareProvider::new(inner, self.config))
    }

    fn name(&self) -> &'static str {
        "quota"
    }
}

impl QuotaAwareProvider {
    /// Wrap `inner` with the given quota.
    #[must_use]
    pub fn new(inner: Arc<dyn Provider>, config: QuotaConfig) -> Self {
        let now = Instant::now();
        Self {
            inner,
            config,
            runtime: Mutex::new(QuotaRuntime {
                minute_count: 0,
                minute_start: now,
                day_count: 0,
                day_start: now,
            }),
        }
    }

    fn check_and_record(&self) -> Result<(), QuotronError> {
        let mut rt = self.runtime.lock().expect("mutex poisoned");
        let now = Instant::now();

        if now.duration_since(rt.minute_start) >= Duration::from_secs(60) {
            rt.minute_count = 0;
            rt.minute_start = now;
        }
        if now.duration_since(rt.day_start) >= Duration::from_secs(24 * 3600) {
            rt.day_count = 0;
            rt.day_start = now;
        }

        if rt.minute_count >= self.config.per_minute || rt.day_count >= self.config.per_day {
            return Err(QuotronError::RateLimited(format!(
                "{} quota exhausted ({}/{} this minute, {}/{} today)",
                self.inner.name(),
                rt.minute_count,
                self.config.per_minute,
                rt.day_count,
                self.config.per_day
            )));
        }

        rt.minute_count += 1;
        rt.day_count += 1;
        Ok(())
    }
}

#[async_trait]
impl Provider for QuotaAwareProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn get_stock_quote(&self, symbol: &str) -> Result<Quote, QuotronError> {
        self.check_and_record()?;
        self.inner.get_stock_quote(symbol).await
    }

    async fn get_market_index(&self, name: &str) -> Result<MarketIndex, QuotronError> {
        self.check_and_record()?;
        self.inner.get_market_index(name).await
    }

    async fn get_crypto_quote(&self, symbol: &str) -> Result<Quote, QuotronError> {
        self.check_and_record()?;
        self.inner.get_crypto_quote(symbol).await
    }

    async fn health_check(&self) -> HealthOutcome {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotron_mock::MockProvider;

    #[tokio::test]
    async fn exhausts_minute_budget() {
        let inner: Arc<dyn Provider> = Arc::new(MockProvider::always_ok("mock"));
        let wrapped = QuotaAwareProvider::new(
            inner,
            QuotaConfig {
                per_minute: 2,
                per_day: 100,
            },
        );
        wrapped.get_stock_quote("AAPL").await.unwrap();
        wrapped.get_stock_quote("AAPL").await.unwrap();
        let err = wrapped.get_stock_quote("AAPL").await.unwrap_err();
        assert!(matches!(err, QuotronError::RateLimited(_)));
    }

    #[tokio::test]
    async fn exhausts_day_budget_before_minute() {
        let inner: Arc<dyn Provider> = Arc::new(MockProvider::always_ok("mock"));
        let wrapped = QuotaAwareProvider::new(
            inner,
            QuotaConfig {
                per_minute: 100,
                per_day: 1,
            },
        );
        wrapped.get_stock_quote("AAPL").await.unwrap();
        let err = wrapped.get_stock_quote("AAPL").await.unwrap_err();
        assert!(matches!(err, QuotronError::RateLimited(_)));
    }
}

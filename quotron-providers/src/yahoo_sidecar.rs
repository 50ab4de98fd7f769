//! Client for the local Python sidecar that wraps a third provider's
//! library (spec.md §1, §4.2). The sidecar is treated as an opaque HTTP
//! service exposing a documented quote endpoint and `/health` — no business
//! logic for the wrapped library lives in this core.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use quotron_core::{HealthOutcome, Provider, QuotronError};
use quotron_types::{HealthStatus, MarketIndex, Quote, Source, Venue};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SidecarQuoteBody {
    symbol: String,
    price: Decimal,
    #[serde(default)]
    change: Decimal,
    #[serde(default, rename = "changePercent")]
    change_percent: Decimal,
    #[serde(default)]
    volume: u64,
    #[serde(default)]
    exchange: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SidecarHealthBody {
    status: String,
}

fn venue_from_tag(tag: Option<&str>) -> Venue {
    match tag.unwrap_or_default().to_uppercase().as_str() {
        "NASDAQ" => Venue::Nasdaq,
        "NYSE" => Venue::Nyse,
        "AMEX" => Venue::Amex,
        "OTC" => Venue::Otc,
        "CRYPTO" => Venue::Crypto,
        _ => Venue::Other,
    }
}

/// Client for the Yahoo-wrapping Python sidecar's HTTP API.
pub struct YahooSidecarProvider {
    http: reqwest::Client,
    /// Base URL the supervisor assigned this sidecar, e.g. `http://127.0.0.1:5001`.
    base_url: String,
}

impl YahooSidecarProvider {
    /// Build a client pointed at the sidecar's base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builds"),
            base_url: base_url.into(),
        }
    }

    async fn fetch(&self, path: &str, symbol: &str) -> Result<SidecarQuoteBody, QuotronError> {
        let url = format!("{}/{path}/{symbol}", self.base_url.trim_end_matches('/'));
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(crate::alpha_vantage::classify_reqwest_error)?;

        let status = resp.status();
        if status.as_u16() == 404 {
            return Err(QuotronError::NotFound(symbol.to_string()));
        }
        if status.as_u16() == 429 {
            return Err(QuotronError::RateLimited("sidecar reported 429".to_string()));
        }
        if status.is_server_error() {
            return Err(QuotronError::Transient(format!("sidecar HTTP {status}")));
        }
        if !status.is_success() {
            return Err(QuotronError::Parse(format!("sidecar HTTP {status}")));
        }

        resp.json()
            .await
            .map_err(crate::alpha_vantage::classify_reqwest_error)
    }
}

#[async_trait]
impl Provider for YahooSidecarProvider {
    fn name(&self) -> &'static str {
        "yahoo_sidecar"
    }

    async fn get_stock_quote(&self, symbol: &str) -> Result<Quote, QuotronError> {
        let body = self.fetch("quote", symbol).await?;
        Ok(Quote {
            symbol: body.symbol,
            price: body.price,
            change: body.change,
            change_percent: body.change_percent,
            volume: body.volume,
            timestamp: Utc::now(),
            exchange: venue_from_tag(body.exchange.as_deref()),
            source: Source::YahooSidecar,
            batch_id: None,
        })
    }

    async fn get_market_index(&self, name: &str) -> Result<MarketIndex, QuotronError> {
        let body = self.fetch("index", name).await?;
        Ok(MarketIndex {
            name: name.to_string(),
            symbol: body.symbol,
            value: body.price,
            change: body.change,
            change_percent: body.change_percent,
            timestamp: Utc::now(),
            source: Source::YahooSidecar,
            batch_id: None,
        })
    }

    async fn get_crypto_quote(&self, symbol: &str) -> Result<Quote, QuotronError> {
        let body = self.fetch("crypto", symbol).await?;
        Ok(Quote {
            symbol: body.symbol,
            price: body.price,
            change: body.change,
            change_percent: body.change_percent,
            volume: body.volume,
            timestamp: Utc::now(),
            exchange: Venue::Crypto,
            source: Source::YahooSidecar,
            batch_id: None,
        })
    }

    async fn health_check(&self) -> HealthOutcome {
        let started = Instant::now();
        let url = format!("{}/health", self.base_url.trim_end_matches('/'));
        let latency_ms = || started.elapsed().as_millis().try_into().unwrap_or(u64::MAX);

        match self.http.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                match resp.json::<SidecarHealthBody>().await {
                    Ok(body) if body.status == "ok" => HealthOutcome {
                        status: HealthStatus::Healthy,
                        latency_ms: latency_ms(),
                        error: None,
                    },
                    Ok(body) => HealthOutcome {
                        status: HealthStatus::Degraded,
                        latency_ms: latency_ms(),
                        error: Some(format!("sidecar reported status {}", body.status)),
                    },
                    Err(e) => HealthOutcome {
                        status: HealthStatus::Failed,
                        latency_ms: latency_ms(),
                        error: Some(e.to_string()),
                    },
                }
            }
            Ok(resp) => HealthOutcome {
                status: HealthStatus::Failed,
                latency_ms: latency_ms(),
                error: Some(format!("sidecar HTTP {}", resp.status())),
            },
            Err(e) => HealthOutcome {
                status: HealthStatus::Failed,
                latency_ms: latency_ms(),
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;

    #[tokio::test]
    async fn quote_endpoint_parses() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/quote/AAPL");
            then.status(200).json_body(serde_json::json!({
                "symbol": "AAPL", "price": "190.00", "change": "1.5",
                "changePercent": "0.79", "volume": 1000, "exchange": "NASDAQ"
            }));
        });
        let provider = YahooSidecarProvider::new(server.base_url());
        let q = provider.get_stock_quote("AAPL").await.unwrap();
        assert_eq!(q.source, Source::YahooSidecar);
        assert_eq!(q.exchange, Venue::Nasdaq);
    }

    #[tokio::test]
    async fn health_ok_maps_to_healthy() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/health");
            then.status(200).json_body(serde_json::json!({"status": "ok"}));
        });
        let provider = YahooSidecarProvider::new(server.base_url());
        let outcome = provider.health_check().await;
        assert_eq!(outcome.status, HealthStatus::Healthy);
    }
}

//! Primary, rate-limited, keyed REST provider (spec.md §1, §4.1).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use quotron_core::{HealthOutcome, Provider, QuotronError};
use quotron_types::{HealthStatus, MarketIndex, Quote, Source, Venue};
use rust_decimal::Decimal;
use serde_json::Value;

const BASE_URL: &str = "https://www.alphavantage.co/query";
/// A liquid symbol used for the representative health probe (spec.md §4.3).
const HEALTH_PROBE_SYMBOL: &str = "IBM";

/// Client for the Alpha Vantage REST API.
pub struct AlphaVantageProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageProvider {
    /// Build a client. `api_key` may be empty, in which case every call
    /// fails with [`QuotronError::AuthDenied`] before any request is sent.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, BASE_URL.to_string())
    }

    /// Build a client against a non-default base URL, for tests.
    #[must_use]
    pub fn with_base_url(api_key: impl Into<String>, base_url: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builds"),
            api_key: api_key.into(),
            base_url,
        }
    }

    fn require_key(&self) -> Result<&str, QuotronError> {
        if self.api_key.is_empty() {
            Err(QuotronError::AuthDenied(
                "ALPHA_VANTAGE_API_KEY is not configured".to_string(),
            ))
        } else {
            Ok(&self.api_key)
        }
    }

    async fn get(&self, params: &[(&str, &str)]) -> Result<Value, QuotronError> {
        let key = self.require_key()?;
        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("apikey", key));

        let resp = self
            .http
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(QuotronError::RateLimited("HTTP 429".to_string()));
        }
        if status.is_server_error() {
            return Err(QuotronError::Transient(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(QuotronError::Parse(format!("HTTP {status}")));
        }

        let body: Value = resp.json().await.map_err(classify_reqwest_error)?;

        if let Some(note) = body.get("Note").and_then(Value::as_str) {
            return Err(QuotronError::RateLimited(note.to_string()));
        }
        if let Some(info) = body.get("Information").and_then(Value::as_str) {
            if info.to_lowercase().contains("rate limit") {
                return Err(QuotronError::RateLimited(info.to_string()));
            }
            return Err(QuotronError::Parse(info.to_string()));
        }
        if let Some(err) = body.get("Error Message").and_then(Value::as_str) {
            return Err(QuotronError::NotFound(err.to_string()));
        }
        Ok(body)
    }

    fn parse_decimal(obj: &Value, key: &str) -> Result<Decimal, QuotronError> {
        obj.get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| QuotronError::Parse(format!("missing field {key}")))?
            .trim_end_matches('%')
            .parse::<Decimal>()
            .map_err(|e| QuotronError::Parse(format!("field {key}: {e}")))
    }
}

#[async_trait]
impl Provider for AlphaVantageProvider {
    fn name(&self) -> &'static str {
        "alpha_vantage"
    }

    async fn get_stock_quote(&self, symbol: &str) -> Result<Quote, QuotronError> {
        let body = self
            .get(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol)])
            .await?;
        let obj = body
            .get("Global Quote")
            .filter(|v| v.is_object() && v.as_object().is_some_and(|o| !o.is_empty()))
            .ok_or_else(|| QuotronError::NotFound(format!("no quote for {symbol}")))?;

        Ok(Quote {
            symbol: symbol.to_string(),
            price: Self::parse_decimal(obj, "05. price")?,
            change: Self::parse_decimal(obj, "09. change")?,
            change_percent: Self::parse_decimal(obj, "10. change percent")?,
            volume: obj
                .get("06. volume")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            timestamp: Utc::now(),
            exchange: Venue::Other,
            source: Source::AlphaVantage,
            batch_id: None,
        })
    }

    async fn get_market_index(&self, name: &str) -> Result<MarketIndex, QuotronError> {
        let body = self
            .get(&[("function", "GLOBAL_QUOTE"), ("symbol", name)])
            .await?;
        let obj = body
            .get("Global Quote")
            .filter(|v| v.is_object() && v.as_object().is_some_and(|o| !o.is_empty()))
            .ok_or_else(|| QuotronError::NotFound(format!("no index data for {name}")))?;

        Ok(MarketIndex {
            name: name.to_string(),
            symbol: name.to_string(),
            value: Self::parse_decimal(obj, "05. price")?,
            change: Self::parse_decimal(obj, "09. change")?,
            change_percent: Self::parse_decimal(obj, "10. change percent")?,
            timestamp: Utc::now(),
            source: Source::AlphaVantage,
            batch_id: None,
        })
    }

    async fn get_crypto_quote(&self, symbol: &str) -> Result<Quote, QuotronError> {
        let (base, quote) = symbol
            .split_once('-')
            .ok_or_else(|| QuotronError::NormalizationFailed(symbol.to_string()))?;
        let body = self
            .get(&[
                ("function", "CURRENCY_EXCHANGE_RATE"),
                ("from_currency", base),
                ("to_currency", quote),
            ])
            .await?;
        let obj = body
            .get("Realtime Currency Exchange Rate")
            .ok_or_else(|| QuotronError::NotFound(format!("no crypto rate for {symbol}")))?;
        let price = obj
            .get("5. Exchange Rate")
            .and_then(Value::as_str)
            .ok_or_else(|| QuotronError::Parse("missing exchange rate".to_string()))?
            .parse::<Decimal>()
            .map_err(|e| QuotronError::Parse(e.to_string()))?;

        Ok(Quote {
            symbol: symbol.to_string(),
            price,
            change: Decimal::ZERO,
            change_percent: Decimal::ZERO,
            volume: 0,
            timestamp: Utc::now(),
            exchange: Venue::Crypto,
            source: Source::AlphaVantage,
            batch_id: None,
        })
    }

    async fn health_check(&self) -> HealthOutcome {
        let started = Instant::now();
        match self.get_stock_quote(HEALTH_PROBE_SYMBOL).await {
            Ok(_) => HealthOutcome {
                status: HealthStatus::Healthy,
                latency_ms: elapsed_ms(started),
                error: None,
            },
            Err(QuotronError::RateLimited(msg)) => HealthOutcome {
                status: HealthStatus::Limited,
                latency_ms: elapsed_ms(started),
                error: Some(msg),
            },
            Err(e) => HealthOutcome {
                status: HealthStatus::Failed,
                latency_ms: elapsed_ms(started),
                error: Some(e.to_string()),
            },
        }
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}

pub(crate) fn classify_reqwest_error(err: reqwest::Error) -> QuotronError {
    if err.is_timeout() {
        QuotronError::Timeout
    } else if err.is_decode() {
        QuotronError::Parse(err.to_string())
    } else {
        QuotronError::Transient(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;

    #[tokio::test]
    async fn missing_api_key_is_auth_denied() {
        let provider = AlphaVantageProvider::new("");
        let err = provider.get_stock_quote("AAPL").await.unwrap_err();
        assert!(matches!(err, QuotronError::AuthDenied(_)));
    }

    #[tokio::test]
    async fn rate_limit_note_is_classified() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(httpmock::Method::GET);
            then.status(200)
                .json_body(serde_json::json!({"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute"}));
        });
        let provider = AlphaVantageProvider::with_base_url("key", server.url("/query"));
        let err = provider.get_stock_quote("AAPL").await.unwrap_err();
        mock.assert();
        assert!(matches!(err, QuotronError::RateLimited(_)));
    }

    #[tokio::test]
    async fn parses_a_valid_global_quote() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::GET);
            then.status(200).json_body(serde_json::json!({
                "Global Quote": {
                    "01. symbol": "AAPL",
                    "05. price": "190.00",
                    "06. volume": "1000",
                    "09. change": "1.50",
                    "10. change percent": "0.79%"
                }
            }));
        });
        let provider = AlphaVantageProvider::with_base_url("key", server.url("/query"));
        let q = provider.get_stock_quote("AAPL").await.unwrap();
        assert_eq!(q.price, Decimal::new(19000, 2));
        assert_eq!(q.source, Source::AlphaVantage);
    }
}

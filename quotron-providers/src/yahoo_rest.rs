//! Secondary, free, keyless Yahoo Finance provider reached over HTTP
//! directly (spec.md §1 — "a secondary free provider with no key").

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use quotron_core::{HealthOutcome, Provider, QuotronError};
use quotron_types::{HealthStatus, MarketIndex, Quote, Source, Venue};
use rust_decimal::Decimal;
use serde::Deserialize;

const BASE_URL: &str = "https://query1.finance.yahoo.com/v7/finance/quote";
const HEALTH_PROBE_SYMBOL: &str = "AAPL";

/// Client for Yahoo Finance's unauthenticated quote endpoint.
pub struct YahooRestProvider {
    http: reqwest::Client,
    base_url: String,
    source: Source,
}

#[derive(Debug, Deserialize)]
struct QuoteResponseEnvelope {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteResponseBody,
}

#[derive(Debug, Deserialize)]
struct QuoteResponseBody {
    result: Vec<YahooQuoteResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteResult {
    symbol: String,
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: f64,
    #[serde(rename = "regularMarketChange", default)]
    regular_market_change: f64,
    #[serde(rename = "regularMarketChangePercent", default)]
    regular_market_change_percent: f64,
    #[serde(rename = "regularMarketVolume", default)]
    regular_market_volume: Option<u64>,
    #[serde(rename = "regularMarketTime", default)]
    regular_market_time: Option<i64>,
    #[serde(rename = "fullExchangeName", default)]
    full_exchange_name: Option<String>,
    #[serde(rename = "longName", default)]
    long_name: Option<String>,
}

fn venue_from_exchange(exchange: Option<&str>) -> Venue {
    match exchange.unwrap_or_default().to_uppercase() {
        e if e.contains("NASDAQ") => Venue::Nasdaq,
        e if e.contains("NYSE") => Venue::Nyse,
        e if e.contains("AMEX") => Venue::Amex,
        e if e.contains("OTC") => Venue::Otc,
        e if e.contains("CCC") || e.contains("CRYPTO") => Venue::Crypto,
        _ => Venue::Other,
    }
}

impl YahooRestProvider {
    /// Build a direct client. `source` distinguishes whether this instance
    /// is acting as the in-process direct client (`yahoo_direct`) or as the
    /// client the gateway uses on the ETL's behalf (`yahoo_rest`).
    #[must_use]
    pub fn new(source: Source) -> Self {
        Self::with_base_url(source, BASE_URL.to_string())
    }

    /// Build a client against a non-default base URL, for tests.
    #[must_use]
    pub fn with_base_url(source: Source, base_url: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builds"),
            base_url,
            source,
        }
    }

    async fn fetch_one(&self, symbol: &str) -> Result<YahooQuoteResult, QuotronError> {
        let resp = self
            .http
            .get(&self.base_url)
            .query(&[("symbols", symbol)])
            .send()
            .await
            .map_err(crate::alpha_vantage::classify_reqwest_error)?;

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

        let envelope: QuoteResponseEnvelope = resp
            .json()
            .await
            .map_err(crate::alpha_vantage::classify_reqwest_error)?;

        if let Some(err) = envelope.quote_response.error {
            return Err(QuotronError::Parse(err));
        }
        envelope
            .quote_response
            .result
            .into_iter()
            .next()
            .ok_or_else(|| QuotronError::NotFound(format!("no quote for {symbol}")))
    }

    fn timestamp_of(result: &YahooQuoteResult) -> chrono::DateTime<Utc> {
        result
            .regular_market_time
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(Utc::now)
    }

    fn decimal_of(value: f64) -> Decimal {
        Decimal::try_from(value).unwrap_or_default()
    }
}

#[async_trait]
impl Provider for YahooRestProvider {
    fn name(&self) -> &'static str {
        match self.source {
            Source::YahooDirect => "yahoo_direct",
            _ => "yahoo_rest",
        }
    }

    async fn get_stock_quote(&self, symbol: &str) -> Result<Quote, QuotronError> {
        let result = self.fetch_one(symbol).await?;
        Ok(Quote {
            symbol: result.symbol.clone(),
            price: Self::decimal_of(result.regular_market_price),
            change: Self::decimal_of(result.regular_market_change),
            change_percent: Self::decimal_of(result.regular_market_change_percent),
            volume: result.regular_market_volume.unwrap_or(0),
            timestamp: Self::timestamp_of(&result),
            exchange: venue_from_exchange(result.full_exchange_name.as_deref()),
            source: self.source,
            batch_id: None,
        })
    }

    async fn get_market_index(&self, name: &str) -> Result<MarketIndex, QuotronError> {
        let result = self.fetch_one(name).await?;
        Ok(MarketIndex {
            name: result.long_name.clone().unwrap_or_else(|| name.to_string()),
            symbol: result.symbol.clone(),
            value: Self::decimal_of(result.regular_market_price),
            change: Self::decimal_of(result.regular_market_change),
            change_percent: Self::decimal_of(result.regular_market_change_percent),
            timestamp: Self::timestamp_of(&result),
            source: self.source,
            batch_id: None,
        })
    }

    async fn get_crypto_quote(&self, symbol: &str) -> Result<Quote, QuotronError> {
        let result = self.fetch_one(symbol).await?;
        Ok(Quote {
            symbol: result.symbol.clone(),
            price: Self::decimal_of(result.regular_market_price),
            change: Self::decimal_of(result.regular_market_change),
            change_percent: Self::decimal_of(result.regular_market_change_percent),
            volume: result.regular_market_volume.unwrap_or(0),
            timestamp: Self::timestamp_of(&result),
            exchange: Venue::Crypto,
            source: self.source,
            batch_id: None,
        })
    }

    async fn health_check(&self) -> HealthOutcome {
        let started = Instant::now();
        match self.fetch_one(HEALTH_PROBE_SYMBOL).await {
            Ok(_) => HealthOutcome {
                status: HealthStatus::Healthy,
                latency_ms: started.elapsed().as_millis().try_into().unwrap_or(u64::MAX),
                error: None,
            },
            Err(e) => HealthOutcome {
                status: HealthStatus::Failed,
                latency_ms: started.elapsed().as_millis().try_into().unwrap_or(u64::MAX),
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
    async fn parses_a_quote_result() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::GET);
            then.status(200).json_body(serde_json::json!({
                "quoteResponse": {
                    "result": [{
                        "symbol": "AAPL",
                        "regularMarketPrice": 190.0,
                        "regularMarketChange": 1.5,
                        "regularMarketChangePercent": 0.79,
                        "regularMarketVolume": 1000,
                        "regularMarketTime": 1_700_000_000,
                        "fullExchangeName": "NasdaqGS"
                    }],
                    "error": null
                }
            }));
        });
        let provider = YahooRestProvider::with_base_url(Source::YahooRest, server.url("/v7/finance/quote"));
        let q = provider.get_stock_quote("AAPL").await.unwrap();
        assert_eq!(q.exchange, Venue::Nasdaq);
        assert_eq!(q.source, Source::YahooRest);
    }

    #[tokio::test]
    async fn empty_result_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::GET);
            then.status(200).json_body(serde_json::json!({
                "quoteResponse": {"result": [], "error": null}
            }));
        });
        let provider = YahooRestProvider::with_base_url(Source::YahooRest, server.url("/v7/finance/quote"));
        let err = provider.get_stock_quote("NOPE").await.unwrap_err();
        assert!(matches!(err, QuotronError::NotFound(_)));
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exchange/venue tag for a [`Quote`]. Closed set per the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Venue {
    /// New York Stock Exchange.
    Nyse,
    /// Nasdaq.
    Nasdaq,
    /// NYSE American.
    Amex,
    /// Over-the-counter.
    Otc,
    /// Cryptocurrency venue (no single physical exchange).
    Crypto,
    /// Anything not covered above.
    Other,
}

impl Venue {
    /// Canonical uppercase tag, as persisted.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nyse => "NYSE",
            Self::Nasdaq => "NASDAQ",
            Self::Amex => "AMEX",
            Self::Otc => "OTC",
            Self::Crypto => "CRYPTO",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream provider tag recorded on every persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Alpha Vantage REST API (primary, rate-limited, keyed).
    AlphaVantage,
    /// Direct Yahoo Finance HTTP client (in-process, no key).
    YahooDirect,
    /// Yahoo Finance reached through the gateway's central client.
    YahooRest,
    /// Local Python sidecar wrapping a third provider's library.
    YahooSidecar,
    /// Operator-entered or test-injected data.
    Manual,
}

impl Source {
    /// Canonical lowercase tag, as persisted and published.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlphaVantage => "alpha_vantage",
            Self::YahooDirect => "yahoo_direct",
            Self::YahooRest => "yahoo_rest",
            Self::YahooSidecar => "yahoo_sidecar",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation of a tradable instrument's price at an instant.
///
/// See `spec.md` §3 for the invariants this type must satisfy; validation of
/// those invariants lives in `quotron-etl`, not here — this is a plain
/// carrier of already-fetched or already-validated data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Canonical ticker, e.g. `AAPL`, `BTC-USD`, `^GSPC`.
    pub symbol: String,
    /// Current price. Expected > 0.
    pub price: Decimal,
    /// Absolute change since previous close.
    pub change: Decimal,
    /// Percent change since previous close.
    #[serde(rename = "changePercent")]
    pub change_percent: Decimal,
    /// Non-negative traded volume.
    pub volume: u64,
    /// Observation instant, UTC.
    pub timestamp: DateTime<Utc>,
    /// Exchange/venue tag.
    pub exchange: Venue,
    /// Upstream provider tag.
    pub source: Source,
    /// Batch this record was ingested under, once persisted.
    pub batch_id: Option<Uuid>,
}

/// A composite market value tracked by symbol (e.g. `^GSPC`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketIndex {
    /// Human-readable name, e.g. "S&P 500".
    pub name: String,
    /// Canonical symbol, always `^`-prefixed after normalization.
    pub symbol: String,
    /// Current index value.
    pub value: Decimal,
    /// Absolute change since previous close.
    pub change: Decimal,
    /// Percent change since previous close.
    #[serde(rename = "changePercent")]
    pub change_percent: Decimal,
    /// Observation instant, UTC.
    pub timestamp: DateTime<Utc>,
    /// Upstream provider tag.
    pub source: Source,
    /// Batch this record was ingested under, once persisted.
    pub batch_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_round_trips_through_json() {
        let s = Source::YahooSidecar;
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "\"yahoo_sidecar\"");
        let back: Source = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_str(), s.as_str());
    }

    #[test]
    fn quote_field_naming_is_stable() {
        let q = Quote {
            symbol: "AAPL".into(),
            price: Decimal::new(19000, 2),
            change: Decimal::new(150, 2),
            change_percent: Decimal::new(79, 2),
            volume: 1_000,
            timestamp: Utc::now(),
            exchange: Venue::Nasdaq,
            source: Source::YahooSidecar,
            batch_id: None,
        };
        let v = serde_json::to_value(&q).unwrap();
        assert!(v.get("changePercent").is_some());
        assert!(v.get("change_percent").is_none());
    }
}

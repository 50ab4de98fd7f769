use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a price movement that crossed the alert threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertDirection {
    /// Price rose since the baseline.
    Increased,
    /// Price fell since the baseline.
    Decreased,
}

/// A derived price-movement event, emitted by the alert producer (C8).
///
/// `previous_price` is carried separately from any provider-reported
/// `change` field — the alert path's baseline comparison is independent of
/// the previous-close-based `change` on [`crate::Quote`] (see spec.md §9,
/// Open Questions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Symbol the alert concerns.
    pub symbol: String,
    /// Current price that triggered the alert.
    pub price: Decimal,
    /// The baseline price this move is measured against.
    #[serde(rename = "previousPrice")]
    pub previous_price: Decimal,
    /// Percent change from `previous_price` to `price`.
    #[serde(rename = "percentChange")]
    pub percent_change: Decimal,
    /// Traded volume at the time of the alert.
    pub volume: u64,
    /// Wall-clock instant the alert was produced.
    pub timestamp: DateTime<Utc>,
    /// Direction of the move.
    pub direction: AlertDirection,
}

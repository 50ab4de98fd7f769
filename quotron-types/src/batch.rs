use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::quote::Source;

/// Lifecycle state of a [`Batch`]. Terminal states are `Completed` and `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    /// Created, no row has been written yet.
    Pending,
    /// First row write has happened; sub-batches may still be in flight.
    Processing,
    /// All sub-batches succeeded and statistics were written.
    Completed,
    /// At least one sub-batch ended with an unrecoverable error.
    Failed,
}

/// A unit of ingestion. Every persisted [`crate::Quote`]/[`crate::MarketIndex`]
/// references the batch it was written under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Opaque identifier, a UUIDv4 minted once per pipeline invocation.
    pub id: Uuid,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Upstream source tag for every row in this batch.
    pub source: Source,
    /// Current lifecycle state.
    pub state: BatchState,
    /// Count of quote rows in this batch.
    pub quote_count: i64,
    /// Count of index rows in this batch.
    pub index_count: i64,
    /// Free-form metadata (e.g. the job name that created it).
    pub metadata: Option<serde_json::Value>,
}

impl Batch {
    /// Start a new, empty, pending batch for `source`.
    #[must_use]
    pub fn new(source: Source) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            source,
            state: BatchState::Pending,
            quote_count: 0,
            index_count: 0,
            metadata: None,
        }
    }
}

/// Aggregate statistics over one [`Batch`], computed once after all rows persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    /// The batch these statistics summarize.
    pub batch_id: Uuid,
    /// Mean price across persisted rows.
    pub mean_price: Decimal,
    /// Median price across persisted rows.
    pub median_price: Decimal,
    /// Mean percent change across persisted rows.
    pub mean_change_percent: Decimal,
    /// Count of rows with positive change.
    pub positive_count: i64,
    /// Count of rows with negative change.
    pub negative_count: i64,
    /// Count of rows with zero change.
    pub unchanged_count: i64,
    /// Sum of volume across persisted rows (quotes only; indices have no volume).
    pub total_volume: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_batch_starts_pending_and_empty() {
        let b = Batch::new(Source::AlphaVantage);
        assert_eq!(b.state, BatchState::Pending);
        assert_eq!(b.quote_count, 0);
        assert_eq!(b.index_count, 0);
    }
}

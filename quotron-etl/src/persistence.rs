//! Postgres persistence: batch lifecycle, upsert-on-natural-key rows, and
//! retried sub-batch transactions (spec.md §4.7).

use std::time::Duration;

use quotron_core::QuotronError;
use quotron_types::{Batch, BatchState, BatchStatistics, MarketIndex, Quote};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

/// Linear backoff base between sub-batch write retries.
const RETRY_BACKOFF: Duration = Duration::from_millis(250);
/// Default max retries for a transient database error within one sub-batch.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Write suppressed if it would only change a floating field by less than this.
const FLOAT_CHANGE_EPSILON: f64 = 1e-9;

fn classify_sqlx_error(err: sqlx::Error) -> QuotronError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => QuotronError::DbConflict,
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => QuotronError::DbTransient(err.to_string()),
        _ => QuotronError::DbTransient(err.to_string()),
    }
}

/// Owns the database pool and implements the ETL pipeline's persistence step.
pub struct EtlStore {
    pool: PgPool,
    max_retries: u32,
}

impl EtlStore {
    /// Wrap an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Insert the Batch row in state `pending`.
    pub async fn insert_batch(&self, batch: &Batch) -> Result<(), QuotronError> {
        sqlx::query(
            "INSERT INTO batches (id, created_at, source, state, quote_count, index_count, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(batch.id)
        .bind(batch.created_at)
        .bind(batch.source.as_str())
        .bind(serde_json::to_string(&batch.state).unwrap_or_default())
        .bind(batch.quote_count)
        .bind(batch.index_count)
        .bind(batch.metadata.clone())
        .execute(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;
        Ok(())
    }

    /// Advance the Batch to `processing` (first row write, spec.md §4.7 state machine).
    pub async fn mark_processing(&self, batch_id: Uuid) -> Result<(), QuotronError> {
        self.set_state(batch_id, BatchState::Processing).await
    }

    /// Advance the Batch to its terminal state.
    pub async fn mark_terminal(&self, batch_id: Uuid, state: BatchState) -> Result<(), QuotronError> {
        debug_assert!(matches!(state, BatchState::Completed | BatchState::Failed));
        self.set_state(batch_id, state).await
    }

    async fn set_state(&self, batch_id: Uuid, state: BatchState) -> Result<(), QuotronError> {
        sqlx::query("UPDATE batches SET state = $1 WHERE id = $2")
            .bind(serde_json::to_string(&state).unwrap_or_default())
            .bind(batch_id)
            .execute(&self.pool)
            .await
            .map_err(classify_sqlx_error)?;
        Ok(())
    }

    /// Upsert one sub-batch of quotes in a single transaction, retrying
    /// transient failures up to `max_retries` times with linear backoff.
    /// A `DbConflict` (unique-constraint race from a concurrent upsert) is
    /// treated as a no-op success.
    pub async fn upsert_quote_subbatch(&self, quotes: &[Quote]) -> Result<usize, QuotronError> {
        let mut attempt = 0;
        loop {
            match self.try_upsert_quotes(quotes).await {
                Ok(n) => return Ok(n),
                Err(QuotronError::DbConflict) => return Ok(quotes.len()),
                Err(QuotronError::DbTransient(msg)) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(attempt, error = %msg, "retrying sub-batch after transient db error");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_upsert_quotes(&self, quotes: &[Quote]) -> Result<usize, QuotronError> {
        let mut tx = self.pool.begin().await.map_err(classify_sqlx_error)?;
        for quote in quotes {
            sqlx::query(
                "INSERT INTO quotes (symbol, price, change, change_percent, volume, timestamp, exchange, source, batch_id)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 ON CONFLICT (symbol, timestamp, source) DO UPDATE SET
                   price = EXCLUDED.price,
                   change = EXCLUDED.change,
                   change_percent = EXCLUDED.change_percent,
                   volume = EXCLUDED.volume,
                   batch_id = EXCLUDED.batch_id
                 WHERE ABS(quotes.price - EXCLUDED.price) >= $10
                    OR ABS(quotes.change_percent - EXCLUDED.change_percent) >= $10",
            )
            .bind(&quote.symbol)
            .bind(quote.price)
            .bind(quote.change)
            .bind(quote.change_percent)
            .bind(i64::try_from(quote.volume).unwrap_or(i64::MAX))
            .bind(quote.timestamp)
            .bind(quote.exchange.to_string())
            .bind(quote.source.as_str())
            .bind(quote.batch_id)
            .bind(FLOAT_CHANGE_EPSILON)
            .execute(&mut *tx)
            .await
            .map_err(classify_sqlx_error)?;
        }
        tx.commit().await.map_err(classify_sqlx_error)?;
        Ok(quotes.len())
    }

    /// Owned-argument variant of [`EtlStore::upsert_quote_subbatch`], for use
    /// inside a `FuturesUnordered` where the chunk must outlive the poll loop.
    pub async fn upsert_quote_subbatch_owned(&self, quotes: Vec<Quote>) -> Result<usize, QuotronError> {
        self.upsert_quote_subbatch(&quotes).await
    }

    /// Owned-argument variant of [`EtlStore::upsert_index_subbatch`].
    pub async fn upsert_index_subbatch_owned(&self, indices: Vec<MarketIndex>) -> Result<usize, QuotronError> {
        self.upsert_index_subbatch(&indices).await
    }

    /// Upsert one sub-batch of market indices, same retry/conflict rules as quotes.
    pub async fn upsert_index_subbatch(&self, indices: &[MarketIndex]) -> Result<usize, QuotronError> {
        let mut attempt = 0;
        loop {
            match self.try_upsert_indices(indices).await {
                Ok(n) => return Ok(n),
                Err(QuotronError::DbConflict) => return Ok(indices.len()),
                Err(QuotronError::DbTransient(msg)) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(attempt, error = %msg, "retrying sub-batch after transient db error");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_upsert_indices(&self, indices: &[MarketIndex]) -> Result<usize, QuotronError> {
        let mut tx = self.pool.begin().await.map_err(classify_sqlx_error)?;
        for index in indices {
            sqlx::query(
                "INSERT INTO market_indices (symbol, name, value, change, change_percent, timestamp, source, batch_id)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT (symbol, timestamp, source) DO UPDATE SET
                   value = EXCLUDED.value,
                   change = EXCLUDED.change,
                   change_percent = EXCLUDED.change_percent,
                   batch_id = EXCLUDED.batch_id
                 WHERE ABS(market_indices.value - EXCLUDED.value) >= $9",
            )
            .bind(&index.symbol)
            .bind(&index.name)
            .bind(index.value)
            .bind(index.change)
            .bind(index.change_percent)
            .bind(index.timestamp)
            .bind(index.source.as_str())
            .bind(index.batch_id)
            .bind(FLOAT_CHANGE_EPSILON)
            .execute(&mut *tx)
            .await
            .map_err(classify_sqlx_error)?;
        }
        tx.commit().await.map_err(classify_sqlx_error)?;
        Ok(indices.len())
    }

    /// Compute and insert [`BatchStatistics`] for a completed batch's quotes
    /// and/or market indices.
    pub async fn compute_and_store_statistics(
        &self,
        batch_id: Uuid,
        quotes: &[Quote],
        indices: &[MarketIndex],
    ) -> Result<BatchStatistics, QuotronError> {
        let stats = compute_statistics(batch_id, quotes, indices);
        sqlx::query(
            "INSERT INTO batch_statistics
                (batch_id, mean_price, median_price, mean_change_percent, positive_count, negative_count, unchanged_count, total_volume)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(stats.batch_id)
        .bind(stats.mean_price)
        .bind(stats.median_price)
        .bind(stats.mean_change_percent)
        .bind(stats.positive_count)
        .bind(stats.negative_count)
        .bind(stats.unchanged_count)
        .bind(stats.total_volume)
        .execute(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;
        Ok(stats)
    }
}

/// Pure computation of [`BatchStatistics`] over a batch's quotes and market
/// indices together, split out so it is testable without a database. An
/// index-only batch (the `market_indices` job never produces quotes) still
/// yields a populated row: index `change` is bucketed into the same
/// positive/negative/unchanged counts as quotes, and its `value` stands in
/// for `price` in the mean/median. `total_volume` stays quote-only since
/// indices carry no volume.
#[must_use]
pub fn compute_statistics(batch_id: Uuid, quotes: &[Quote], indices: &[MarketIndex]) -> BatchStatistics {
    use rust_decimal::Decimal;

    if quotes.is_empty() && indices.is_empty() {
        return BatchStatistics {
            batch_id,
            mean_price: Decimal::ZERO,
            median_price: Decimal::ZERO,
            mean_change_percent: Decimal::ZERO,
            positive_count: 0,
            negative_count: 0,
            unchanged_count: 0,
            total_volume: 0,
        };
    }

    let prices: Vec<Decimal> = quotes
        .iter()
        .map(|q| q.price)
        .chain(indices.iter().map(|i| i.value))
        .collect();
    let change_percents: Vec<Decimal> = quotes
        .iter()
        .map(|q| q.change_percent)
        .chain(indices.iter().map(|i| i.change_percent))
        .collect();
    let changes: Vec<Decimal> = quotes
        .iter()
        .map(|q| q.change)
        .chain(indices.iter().map(|i| i.change))
        .collect();

    let n = Decimal::from(prices.len() as u64);
    let sum_price: Decimal = prices.iter().sum();
    let sum_change_percent: Decimal = change_percents.iter().sum();

    let mut sorted_prices = prices.clone();
    sorted_prices.sort();
    let median_price = if sorted_prices.len() % 2 == 1 {
        sorted_prices[sorted_prices.len() / 2]
    } else {
        let mid = sorted_prices.len() / 2;
        (sorted_prices[mid - 1] + sorted_prices[mid]) / Decimal::from(2)
    };

    let positive_count = changes.iter().filter(|c| **c > Decimal::ZERO).count() as i64;
    let negative_count = changes.iter().filter(|c| **c < Decimal::ZERO).count() as i64;
    let unchanged_count = changes.len() as i64 - positive_count - negative_count;
    let total_volume: i64 = quotes.iter().map(|q| i64::try_from(q.volume).unwrap_or(i64::MAX)).sum();

    BatchStatistics {
        batch_id,
        mean_price: sum_price / n,
        median_price,
        mean_change_percent: sum_change_percent / n,
        positive_count,
        negative_count,
        unchanged_count,
        total_volume,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quotron_types::{Source, Venue};
    use rust_decimal::Decimal;

    fn quote(price: i64, change: i64) -> Quote {
        Quote {
            symbol: "AAPL".to_string(),
            price: Decimal::new(price, 2),
            change: Decimal::new(change, 2),
            change_percent: Decimal::ZERO,
            volume: 100,
            timestamp: Utc::now(),
            exchange: Venue::Nasdaq,
            source: Source::AlphaVantage,
            batch_id: None,
        }
    }

    fn index(value: i64, change: i64) -> MarketIndex {
        MarketIndex {
            name: "S&P 500".to_string(),
            symbol: "SPX".to_string(),
            value: Decimal::new(value, 2),
            change: Decimal::new(change, 2),
            change_percent: Decimal::ZERO,
            timestamp: Utc::now(),
            source: Source::AlphaVantage,
            batch_id: None,
        }
    }

    #[test]
    fn statistics_over_empty_batch_are_zero() {
        let stats = compute_statistics(Uuid::new_v4(), &[], &[]);
        assert_eq!(stats.mean_price, Decimal::ZERO);
        assert_eq!(stats.total_volume, 0);
    }

    #[test]
    fn statistics_count_direction_buckets() {
        let quotes = vec![quote(10000, 100), quote(9900, -100), quote(10000, 0)];
        let stats = compute_statistics(Uuid::new_v4(), &quotes, &[]);
        assert_eq!(stats.positive_count, 1);
        assert_eq!(stats.negative_count, 1);
        assert_eq!(stats.unchanged_count, 1);
        assert_eq!(stats.total_volume, 300);
    }

    #[test]
    fn statistics_over_index_only_batch_are_populated() {
        let indices = vec![index(450000, 1000), index(3800000, -500)];
        let stats = compute_statistics(Uuid::new_v4(), &[], &indices);
        assert_eq!(stats.positive_count, 1);
        assert_eq!(stats.negative_count, 1);
        assert_eq!(stats.unchanged_count, 0);
        assert_eq!(stats.total_volume, 0);
        assert_ne!(stats.mean_price, Decimal::ZERO);
    }
}

//! Orchestrates validate → enrich → persist → statistics over one batch of
//! rows, with bounded sub-batch concurrency (spec.md §4.7).

use std::collections::HashSet;

use futures::stream::{FuturesUnordered, StreamExt};
use quotron_core::QuotronError;
use quotron_types::{Batch, BatchState, BatchStatistics, MarketIndex, Quote, Source};
use uuid::Uuid;

use crate::enrichment::enrich_quote;
use crate::persistence::EtlStore;
use crate::validation::validate_quote;

/// Default number of rows per sub-batch (spec.md §4.7).
pub const DEFAULT_SUBBATCH_SIZE: usize = 64;
/// Default number of concurrently executing sub-batches.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// One input row to the ETL pipeline is either a quote or an index; most
/// invocations carry only one kind, but a mixed batch is permitted.
pub enum RawRow {
    /// An equity/crypto quote.
    Quote(Quote),
    /// A market index observation.
    Index(MarketIndex),
}

/// Pipeline invocation parameters.
pub struct EtlInput {
    /// Rows to validate, enrich, and persist.
    pub rows: Vec<RawRow>,
    /// Source tag recorded on the batch and used for enrichment.
    pub source: Source,
    /// Whether timestamps older than 24h are accepted (spec.md §4.7).
    pub allow_historical_data: bool,
    /// Sub-batch size; defaults to [`DEFAULT_SUBBATCH_SIZE`].
    pub subbatch_size: usize,
    /// Max concurrently executing sub-batches; defaults to [`DEFAULT_CONCURRENCY`].
    pub concurrency: usize,
}

impl EtlInput {
    /// Build an input with the spec's default sub-batch size and concurrency.
    #[must_use]
    pub fn new(rows: Vec<RawRow>, source: Source, allow_historical_data: bool) -> Self {
        Self {
            rows,
            source,
            allow_historical_data,
            subbatch_size: DEFAULT_SUBBATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// One row's validation failure, keyed by its position in the original input.
#[derive(Debug, Clone)]
pub struct RowError {
    /// Index into the original `rows` vector.
    pub index: usize,
    /// Why the row was rejected.
    pub error: QuotronError,
}

/// Result of one pipeline invocation.
pub struct PipelineOutput {
    /// The Batch row, in its final state.
    pub batch: Batch,
    /// Rows rejected during validation.
    pub errors: Vec<RowError>,
    /// Statistics computed over persisted quote and/or index rows, if any were persisted.
    pub statistics: Option<BatchStatistics>,
}

/// Run the full pipeline over `input`, persisting through `store`.
pub async fn run(store: &EtlStore, input: EtlInput) -> Result<PipelineOutput, QuotronError> {
    let batch_id = Uuid::new_v4();
    let quote_count = input.rows.iter().filter(|r| matches!(r, RawRow::Quote(_))).count();
    let index_count = input.rows.len() - quote_count;

    let mut batch = Batch {
        id: batch_id,
        created_at: chrono::Utc::now(),
        source: input.source,
        state: BatchState::Pending,
        quote_count: quote_count as i64,
        index_count: index_count as i64,
        metadata: None,
    };
    store.insert_batch(&batch).await?;

    let mut errors = Vec::new();
    let mut valid_quotes = Vec::new();
    let mut valid_indices = Vec::new();
    let mut seen = HashSet::new();

    for (index, row) in input.rows.into_iter().enumerate() {
        match row {
            RawRow::Quote(quote) => {
                match validate_quote(&quote, input.allow_historical_data, &mut seen) {
                    Ok(()) => valid_quotes.push(enrich_quote(quote, batch_id)),
                    Err(error) => errors.push(RowError { index, error }),
                }
            }
            RawRow::Index(idx) => {
                // Indices reuse the quote shape conceptually but are validated
                // as a simpler record: symbol/name presence and a positive value.
                if idx.value <= rust_decimal::Decimal::ZERO {
                    errors.push(RowError {
                        index,
                        error: QuotronError::SchemaViolation("index value must be positive".to_string()),
                    });
                    continue;
                }
                valid_indices.push(crate::enrichment::enrich_index(idx, batch_id));
            }
        }
    }

    if valid_quotes.is_empty() && valid_indices.is_empty() {
        batch.state = BatchState::Failed;
        store.mark_terminal(batch_id, BatchState::Failed).await?;
        return Ok(PipelineOutput {
            batch,
            errors,
            statistics: None,
        });
    }

    store.mark_processing(batch_id).await?;
    batch.state = BatchState::Processing;

    let mut sub_batch_failed = false;

    if !valid_quotes.is_empty() {
        let mut futures = FuturesUnordered::new();
        let chunks: Vec<Vec<Quote>> = valid_quotes
            .chunks(input.subbatch_size.max(1))
            .map(<[Quote]>::to_vec)
            .collect();
        let mut iter = chunks.into_iter();

        for chunk in iter.by_ref().take(input.concurrency.max(1)) {
            futures.push(store.upsert_quote_subbatch_owned(chunk));
        }
        let mut pending = iter;
        while let Some(result) = futures.next().await {
            if result.is_err() {
                sub_batch_failed = true;
            }
            if let Some(next_chunk) = pending.next() {
                futures.push(store.upsert_quote_subbatch_owned(next_chunk));
            }
        }
    }

    if !valid_indices.is_empty() {
        let chunks: Vec<Vec<MarketIndex>> = valid_indices
            .chunks(input.subbatch_size.max(1))
            .map(<[MarketIndex]>::to_vec)
            .collect();
        let mut futures = FuturesUnordered::new();
        let mut iter = chunks.into_iter();
        for chunk in iter.by_ref().take(input.concurrency.max(1)) {
            futures.push(store.upsert_index_subbatch_owned(chunk));
        }
        let mut pending = iter;
        while let Some(result) = futures.next().await {
            if result.is_err() {
                sub_batch_failed = true;
            }
            if let Some(next_chunk) = pending.next() {
                futures.push(store.upsert_index_subbatch_owned(next_chunk));
            }
        }
    }

    let statistics = if !valid_quotes.is_empty() || !valid_indices.is_empty() {
        Some(
            store
                .compute_and_store_statistics(batch_id, &valid_quotes, &valid_indices)
                .await?,
        )
    } else {
        None
    };

    let final_state = if sub_batch_failed {
        BatchState::Failed
    } else {
        BatchState::Completed
    };
    store.mark_terminal(batch_id, final_state).await?;
    batch.state = final_state;

    Ok(PipelineOutput {
        batch,
        errors,
        statistics,
    })
}

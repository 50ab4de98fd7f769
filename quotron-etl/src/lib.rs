//! quotron-etl
//!
//! Batch validation, enrichment, concurrent persistence, and statistics
//! (spec.md §4.7, component C7).
#![warn(missing_docs)]

/// Venue/source/batch-id enrichment.
pub mod enrichment;
/// Sub-batch orchestration: validate → enrich → persist → statistics.
pub mod pipeline;
/// Postgres persistence for batches, rows, and statistics.
pub mod persistence;
/// Row validation against spec.md §3 invariants.
pub mod validation;

pub use pipeline::{run, EtlInput, PipelineOutput, RawRow, RowError, DEFAULT_CONCURRENCY, DEFAULT_SUBBATCH_SIZE};
pub use persistence::{compute_statistics, EtlStore, DEFAULT_MAX_RETRIES};
pub use validation::validate_quote;

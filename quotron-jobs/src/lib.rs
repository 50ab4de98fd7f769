//! quotron-jobs
//!
//! Concrete scheduled jobs run by `quotron-scheduler` (spec.md §4.6,
//! component C6): `stock_quotes`, `crypto_quotes`, `market_indices`, and
//! `stream_maintenance`.
#![warn(missing_docs)]

/// `market_indices` job.
pub mod market_indices;
/// Shared template for `stock_quotes` / `crypto_quotes`.
pub mod quote_job;
/// `stream_maintenance` job.
pub mod stream_maintenance;

pub use market_indices::MarketIndicesJob;
pub use quote_job::{artifact_path, QuoteJob, QuoteKind};
pub use stream_maintenance::StreamMaintenanceJob;

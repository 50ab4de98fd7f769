//! quotron-types
//!
//! Plain data structures for the Quotron ingestion core: quotes, indices,
//! batches, alerts, and health reports. No behavior lives here — just shapes
//! and the small set of closed enumerations the rest of the workspace
//! switches on.
#![warn(missing_docs)]

/// Venue, source, and quote/index record shapes.
pub mod quote;
/// Batch lifecycle and aggregate statistics.
pub mod batch;
/// Alert event shape.
pub mod alert;
/// Health report shape.
pub mod health;

pub use alert::{Alert, AlertDirection};
pub use batch::{Batch, BatchState, BatchStatistics};
pub use health::{HealthReport, HealthStatus};
pub use quote::{MarketIndex, Quote, Source, Venue};

//! quotron-middleware
//!
//! Cross-cutting provider wrappers: quota-aware rate limiting, health-based
//! gating, and the fire-and-forget health reporting client (spec.md §4.2,
//! §4.3).
#![warn(missing_docs)]

/// Skips providers whose last reported health falls in the failover chain's skip set.
pub mod health_gate;
/// Fire-and-forget health reporting client (component C3).
pub mod health_reporter;
/// Quota-aware provider wrapper (primary provider's rate discipline).
pub mod quota;

pub use health_gate::{HealthGateMiddleware, HealthGatedProvider};
pub use health_reporter::HealthReporter;
pub use quota::{QuotaAwareProvider, QuotaConfig, QuotaMiddleware};

//! quotron-alerts
//!
//! Baseline price monitor emitting movement alerts to the stream bus
//! (spec.md §4.8, component C8).
#![warn(missing_docs)]

/// The monitor loop, its command channel, and its configuration.
pub mod monitor;

pub use monitor::{Command, Monitor, MonitorConfig};

//! quotron-providers
//!
//! Concrete upstream clients — Alpha Vantage, Yahoo Finance (direct and via
//! the gateway), and the local Yahoo-wrapping Python sidecar — plus the
//! sidecar process supervisor (spec.md §4.1, §4.2).
#![warn(missing_docs)]

/// Alpha Vantage REST client, the primary rate-limited provider.
pub mod alpha_vantage;
/// Sidecar process lifecycle (adopt/spawn/health-wait/shutdown).
pub mod sidecar;
/// Yahoo Finance unauthenticated REST client.
pub mod yahoo_rest;
/// Client for the local Python sidecar wrapping Yahoo's library.
pub mod yahoo_sidecar;

pub use alpha_vantage::AlphaVantageProvider;
pub use sidecar::{SidecarSupervisor, SidecarSupervisorConfig};
pub use yahoo_rest::YahooRestProvider;
pub use yahoo_sidecar::YahooSidecarProvider;

//! Shared application state threaded through every handler.

use std::sync::Arc;

use quotron::FailoverChain;
use quotron_core::StreamBus;
use quotron_types::Alert;
use tokio::sync::broadcast;

/// Capacity of the in-process alert broadcast channel. Slow WebSocket
/// clients lag and miss old alerts rather than back-pressuring the bridge.
const ALERT_CHANNEL_CAPACITY: usize = 256;

/// Everything a gateway handler needs: the two failover chains, the stream
/// bus (for its own health and for the alert bridge), and a broadcast
/// channel fed by [`crate::alerts::bridge_alerts`].
#[derive(Clone)]
pub struct AppState {
    /// Equity/index chain (`alpha_vantage -> yahoo_sidecar -> yahoo_rest`).
    pub equity: Arc<FailoverChain>,
    /// Crypto chain (`yahoo_sidecar -> yahoo_rest`).
    pub crypto: Arc<FailoverChain>,
    /// Stream bus, used to subscribe to `quotron:alerts:stream`.
    pub stream: Arc<dyn StreamBus>,
    /// Fan-out of alerts read off the stream bus, for WebSocket clients.
    pub alerts: broadcast::Sender<Alert>,
}

impl AppState {
    /// Build state with a fresh alert broadcast channel.
    #[must_use]
    pub fn new(equity: Arc<FailoverChain>, crypto: Arc<FailoverChain>, stream: Arc<dyn StreamBus>) -> Self {
        let (alerts, _rx) = broadcast::channel(ALERT_CHANNEL_CAPACITY);
        Self {
            equity,
            crypto,
            stream,
            alerts,
        }
    }
}

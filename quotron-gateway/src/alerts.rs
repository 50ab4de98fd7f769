//! Bridges `quotron:alerts:stream` into the in-process broadcast channel
//! WebSocket clients subscribe to.

use quotron_core::{QuotronError, StreamBus, StreamName};
use quotron_types::Alert;
use tokio::sync::broadcast;
use tracing::{debug, warn};

const CONSUMER_GROUP: &str = "quotron-gateway";
const CONSUMER_NAME: &str = "gateway-bridge";
const READ_COUNT: usize = 32;
const BLOCK_MS: u64 = 2_000;

/// Run forever, reading alerts off the stream bus and forwarding them to
/// `tx`. Intended to run as a background task for the lifetime of the
/// gateway process.
pub async fn bridge_alerts(stream: &dyn StreamBus, tx: broadcast::Sender<Alert>) -> Result<(), QuotronError> {
    stream.ensure_group(StreamName::Alerts, CONSUMER_GROUP).await?;

    loop {
        let messages = stream
            .read_group(StreamName::Alerts, CONSUMER_GROUP, CONSUMER_NAME, READ_COUNT, BLOCK_MS)
            .await?;

        for message in messages {
            match serde_json::from_str::<Alert>(&message.data) {
                Ok(alert) => {
                    // No active subscribers is not an error; the alert is simply dropped.
                    let _ = tx.send(alert);
                }
                Err(e) => warn!(error = %e, "malformed alert on stream bus"),
            }

            if let Err(e) = stream.ack(StreamName::Alerts, CONSUMER_GROUP, &message.id).await {
                debug!(error = %e, "failed to ack alert message");
            }
        }
    }
}

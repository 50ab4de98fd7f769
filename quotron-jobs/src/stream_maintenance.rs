//! `stream_maintenance` job (spec.md §4.6): trims every stream to its cap
//! and logs the before/after length.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use quotron_core::{QuotronError, StreamBus, StreamName};
use quotron_scheduler::Job;
use tracing::info;

const STREAMS: [StreamName; 4] = [
    StreamName::Stocks,
    StreamName::Crypto,
    StreamName::Indices,
    StreamName::Alerts,
];

/// Trims every named stream, logging the before/after length of each.
pub struct StreamMaintenanceJob {
    stream: Arc<dyn StreamBus>,
}

impl StreamMaintenanceJob {
    /// Build the job over `stream`.
    #[must_use]
    pub fn new(stream: Arc<dyn StreamBus>) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl Job for StreamMaintenanceJob {
    fn name(&self) -> &'static str {
        "stream_maintenance"
    }

    fn description(&self) -> &'static str {
        "Trims every stream to its retention cap and logs the before/after length."
    }

    async fn execute(&self, _params: HashMap<String, String>) -> Result<(), QuotronError> {
        for stream in STREAMS {
            let report = self.stream.trim(stream).await?;
            info!(
                job = "stream_maintenance",
                stream = stream.key(),
                before = report.before,
                after = report.after,
                "trimmed"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotron_mock::FakeStreamBus;

    #[tokio::test]
    async fn trims_every_named_stream() {
        let bus: Arc<dyn StreamBus> = Arc::new(FakeStreamBus::default());
        for _ in 0..1500 {
            bus.publish(StreamName::Stocks, "{}".to_string()).await.unwrap();
        }
        let job = StreamMaintenanceJob::new(Arc::clone(&bus));
        job.execute(HashMap::new()).await.unwrap();
        assert_eq!(bus.len(StreamName::Stocks).await.unwrap(), 1000);
    }
}

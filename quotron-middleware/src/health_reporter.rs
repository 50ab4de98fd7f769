//! Fire-and-forget health reporting client (spec.md §4.3, component C3).
//!
//! Every provider's health check outcome is forwarded to an external
//! aggregator. Delivery failure never surfaces to the data path — at most
//! it is logged.

use std::time::Duration;

use quotron_core::HealthOutcome;
use quotron_types::HealthReport;
use tracing::debug;

const REPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts [`HealthReport`]s to `HEALTH_SERVICE_URL`, swallowing any failure.
pub struct HealthReporter {
    http: reqwest::Client,
    endpoint: Option<String>,
}

impl HealthReporter {
    /// Build a reporter. `endpoint` is typically read from `HEALTH_SERVICE_URL`;
    /// when `None`, [`HealthReporter::report`] is a no-op.
    #[must_use]
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REPORT_TIMEOUT)
                .build()
                .expect("reqwest client builds"),
            endpoint,
        }
    }

    /// Send one health report. Never returns an error: failures are logged
    /// at debug level and otherwise ignored, per spec.md §4.3.
    pub async fn report(&self, source_type: &str, source_name: &str, outcome: &HealthOutcome) {
        let Some(endpoint) = &self.endpoint else {
            return;
        };

        let body = HealthReport {
            source_type: source_type.to_string(),
            source_name: source_name.to_string(),
            status: outcome.status,
            last_check: chrono::Utc::now(),
            response_time_ms: outcome.latency_ms,
            error: outcome.error.clone(),
            up_since: None,
            consecutive_errors: 0,
            consecutive_successes: 0,
            metadata: std::collections::HashMap::new(),
        };

        if let Err(e) = self.http.post(endpoint).json(&body).send().await {
            debug!(error = %e, source_name, "health report delivery failed, ignoring");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;
    use quotron_types::HealthStatus;

    #[tokio::test]
    async fn posts_report_when_endpoint_configured() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(httpmock::Method::POST).path("/health-reports");
            then.status(200);
        });
        let reporter = HealthReporter::new(Some(server.url("/health-reports")));
        let outcome = HealthOutcome {
            status: HealthStatus::Healthy,
            latency_ms: 12,
            error: None,
        };
        reporter.report("provider", "alpha_vantage", &outcome).await;
        mock.assert();
    }

    #[tokio::test]
    async fn no_endpoint_is_a_silent_no_op() {
        let reporter = HealthReporter::new(None);
        let outcome = HealthOutcome {
            status: HealthStatus::Healthy,
            latency_ms: 1,
            error: None,
        };
        reporter.report("provider", "alpha_vantage", &outcome).await;
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Status values a [`HealthReport`] may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Last check succeeded within expected latency.
    Healthy,
    /// Last check succeeded but showed elevated latency or a soft warning.
    Degraded,
    /// Last check failed outright.
    Failed,
    /// The provider reported (or implied) exhausted rate-limit budget.
    Limited,
    /// No check has completed yet.
    Unknown,
}

impl HealthStatus {
    /// Whether a provider in this status should be skipped by the failover
    /// chain for the current minute (spec.md §4.1).
    #[must_use]
    pub const fn skip_in_failover(self) -> bool {
        matches!(self, Self::Failed | Self::Limited)
    }
}

/// One check result for one provider, keyed by `(source_type, source_name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Component kind, e.g. "provider", "sidecar".
    pub source_type: String,
    /// Provider tag, e.g. "alpha_vantage".
    pub source_name: String,
    /// Current status.
    pub status: HealthStatus,
    /// Instant of the last check.
    pub last_check: DateTime<Utc>,
    /// Round-trip latency of the last check, in milliseconds.
    pub response_time_ms: u64,
    /// Error message from the last check, if it failed.
    pub error: Option<String>,
    /// Instant this provider was last observed transitioning into a
    /// non-failed status; preserved across updates that keep it non-failed.
    pub up_since: Option<DateTime<Utc>>,
    /// Count of consecutive errors (reset to 0 on success).
    pub consecutive_errors: u32,
    /// Count of consecutive successes (reset to 0 on error).
    pub consecutive_successes: u32,
    /// Open-ended metadata (cache hit ratio, rate-limit residual, version, ...).
    pub metadata: HashMap<String, serde_json::Value>,
}

impl HealthReport {
    /// Build an initial `unknown` report for a provider that has not been
    /// checked yet.
    #[must_use]
    pub fn unknown(source_type: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            source_type: source_type.into(),
            source_name: source_name.into(),
            status: HealthStatus::Unknown,
            last_check: Utc::now(),
            response_time_ms: 0,
            error: None,
            up_since: None,
            consecutive_errors: 0,
            consecutive_successes: 0,
            metadata: HashMap::new(),
        }
    }

    /// Fold a new check outcome into this report, preserving `up_since`
    /// across updates that keep the status non-failed (spec.md §3).
    pub fn record(&mut self, status: HealthStatus, response_time_ms: u64, error: Option<String>) {
        let was_failed = matches!(self.status, HealthStatus::Failed);
        self.status = status;
        self.response_time_ms = response_time_ms;
        self.error = error;
        self.last_check = Utc::now();

        if matches!(status, HealthStatus::Failed) {
            self.consecutive_errors += 1;
            self.consecutive_successes = 0;
            self.up_since = None;
        } else {
            self.consecutive_successes += 1;
            self.consecutive_errors = 0;
            if was_failed || self.up_since.is_none() {
                self.up_since = Some(self.last_check);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn up_since_preserved_across_healthy_updates() {
        let mut r = HealthReport::unknown("provider", "alpha_vantage");
        r.record(HealthStatus::Healthy, 120, None);
        let first_up_since = r.up_since;
        assert!(first_up_since.is_some());

        r.record(HealthStatus::Degraded, 900, None);
        assert_eq!(r.up_since, first_up_since);
    }

    #[test]
    fn up_since_reset_after_failure_then_recovery() {
        let mut r = HealthReport::unknown("provider", "alpha_vantage");
        r.record(HealthStatus::Healthy, 100, None);
        let first = r.up_since;
        r.record(HealthStatus::Failed, 0, Some("timeout".into()));
        assert!(r.up_since.is_none());
        assert_eq!(r.consecutive_errors, 1);

        r.record(HealthStatus::Healthy, 100, None);
        assert_ne!(r.up_since, first);
        assert_eq!(r.consecutive_errors, 0);
    }

    #[test]
    fn skip_in_failover_matches_closed_set() {
        assert!(HealthStatus::Failed.skip_in_failover());
        assert!(HealthStatus::Limited.skip_in_failover());
        assert!(!HealthStatus::Healthy.skip_in_failover());
        assert!(!HealthStatus::Degraded.skip_in_failover());
        assert!(!HealthStatus::Unknown.skip_in_failover());
    }
}

//! The `Job` contract every scheduled task implements (spec.md §4.5).

use std::collections::HashMap;

use async_trait::async_trait;
use quotron_core::QuotronError;

/// A named, parameterized unit of scheduled work.
#[async_trait]
pub trait Job: Send + Sync {
    /// Stable identifier, matched against schedule config entries.
    fn name(&self) -> &'static str;

    /// Human-readable description surfaced by introspection.
    fn description(&self) -> &'static str;

    /// Run the job once with the given parameters. Any `Err` return means
    /// the job's last-run timestamp is not advanced (spec.md §4.5).
    async fn execute(&self, params: HashMap<String, String>) -> Result<(), QuotronError>;
}

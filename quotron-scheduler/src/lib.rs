//! quotron-scheduler
//!
//! Cron-driven job registry and worker pool (spec.md §4.5, component C5):
//! jobs of the same name never overlap, jobs of different names run in
//! parallel, and manual one-shot invocation bypasses the cron grid.
#![warn(missing_docs)]

/// The `Job` trait every scheduled task implements.
pub mod job;
/// Job registry: last-run tracking and non-reentrance gate.
pub mod registry;
/// The cron loop binding schedule entries to registered jobs.
pub mod scheduler;

pub use job::Job;
pub use registry::JobRegistry;
pub use scheduler::Scheduler;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quotron_core::QuotronError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct CountingJob {
        count: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &'static str {
            "counting"
        }
        fn description(&self) -> &'static str {
            "increments a counter"
        }
        async fn execute(&self, _params: HashMap<String, String>) -> Result<(), QuotronError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn manual_run_updates_last_run_only_on_success() {
        let count = Arc::new(AtomicU32::new(0));
        let mut registry = JobRegistry::new();
        registry.register(Arc::new(CountingJob { count: Arc::clone(&count) }));
        let scheduler = Scheduler::new(registry).await.unwrap();

        assert!(scheduler.run_now("counting", HashMap::new()).await.is_ok());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        scheduler.shutdown(std::time::Duration::from_secs(1)).await;
    }
}

//! The scheduling loop: binds schedule entries to registered jobs, submits
//! fires to a worker pool, and enforces non-reentrance (spec.md §4.5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use quotron_core::config::ScheduleConfig;
use quotron_core::QuotronError;
use tokio::task::JoinSet;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing::{info, warn};

use crate::registry::JobRegistry;

/// Owns the cron loop, the job registry, and the set of currently
/// in-flight executions.
pub struct Scheduler {
    registry: Arc<JobRegistry>,
    inner: JobScheduler,
    in_flight: Arc<std::sync::Mutex<JoinSet<()>>>,
}

impl Scheduler {
    /// Build a scheduler with no entries yet bound.
    pub async fn new(registry: JobRegistry) -> Result<Self, QuotronError> {
        let inner = JobScheduler::new()
            .await
            .map_err(|e| QuotronError::Other(format!("failed to start cron loop: {e}")))?;
        Ok(Self {
            registry: Arc::new(registry),
            inner,
            in_flight: Arc::new(std::sync::Mutex::new(JoinSet::new())),
        })
    }

    /// Bind one schedule entry (job name == config key) to its cron
    /// expression. `entries` must already be validated (spec.md §6).
    pub async fn bind(&self, name: &'static str, config: &ScheduleConfig) -> Result<(), QuotronError> {
        if !config.enabled {
            info!(job = name, "schedule entry disabled, not binding");
            return Ok(());
        }
        let Some(_) = self.registry.get(name) else {
            return Err(QuotronError::Config(format!("no job registered for {name}")));
        };

        let registry = Arc::clone(&self.registry);
        let in_flight = Arc::clone(&self.in_flight);
        let params = config.parameters.clone();
        let six_field = format!("0 {}", config.cron);

        let cron_job = CronJob::new_async(six_field.as_str(), move |_uuid, _l| {
            let registry = Arc::clone(&registry);
            let in_flight = Arc::clone(&in_flight);
            let params = params.clone();
            Box::pin(async move {
                fire_once(registry, in_flight, name, params).await;
            })
        })
        .map_err(|e| QuotronError::Config(format!("invalid cron expression for {name}: {e}")))?;

        self.inner
            .add(cron_job)
            .await
            .map_err(|e| QuotronError::Other(format!("failed to schedule {name}: {e}")))?;
        Ok(())
    }

    /// Start the cron loop.
    pub async fn start(&self) -> Result<(), QuotronError> {
        self.inner
            .start()
            .await
            .map_err(|e| QuotronError::Other(format!("scheduler failed to start: {e}")))
    }

    /// Run `name` once immediately, bypassing its cron entry, honoring the
    /// same non-reentrance gate as a scheduled fire.
    pub async fn run_now(&self, name: &str, params: HashMap<String, String>) -> Result<(), QuotronError> {
        let Some(job) = self.registry.get(name) else {
            return Err(QuotronError::Config(format!("no job registered for {name}")));
        };
        let Some(_guard) = self.registry.try_begin(name) else {
            return Err(QuotronError::Unavailable(format!("{name} is already running")));
        };
        job.execute(params).await?;
        self.registry.record_success(name);
        Ok(())
    }

    /// Stop accepting new fires and wait up to `grace` for in-flight jobs
    /// to finish before abandoning them (spec.md §4.5).
    pub async fn shutdown(mut self, grace: Duration) {
        if let Err(e) = self.inner.shutdown().await {
            warn!(error = %e, "error stopping cron loop");
        }
        let mut set = std::mem::replace(
            &mut *self.in_flight.lock().expect("mutex poisoned"),
            JoinSet::new(),
        );
        let wait = async {
            while set.join_next().await.is_some() {}
        };
        if tokio::time::timeout(grace, wait).await.is_err() {
            warn!("grace period elapsed with jobs still running, abandoning them");
        }
    }
}

async fn fire_once(
    registry: Arc<JobRegistry>,
    in_flight: Arc<std::sync::Mutex<JoinSet<()>>>,
    name: &'static str,
    params: HashMap<String, String>,
) {
    // The non-reentrance gate is acquired inside the spawned task so the
    // guard's borrow of `registry` never has to cross the spawn boundary.
    let handle = tokio::spawn(async move {
        let Some(_guard) = registry.try_begin(name) else {
            info!(job = name, "previous run still in flight, skipping this fire");
            return;
        };
        let Some(job) = registry.get(name) else {
            return;
        };
        match job.execute(params).await {
            Ok(()) => registry.record_success(name),
            Err(e) => warn!(job = name, error = %e, "job execution failed"),
        }
    });
    in_flight.lock().expect("mutex poisoned").spawn(async move {
        let _ = handle.await;
    });
}

//! Job registry: tracks last-run instants and enforces non-reentrance per
//! job name (spec.md §4.5 — "jobs of the same name never overlap").

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex as AsyncMutex;

use crate::job::Job;

struct Entry {
    job: Arc<dyn Job>,
    /// Held for the duration of one execution; `try_lock` failing means a
    /// prior fire is still in flight.
    run_gate: AsyncMutex<()>,
    last_run: std::sync::Mutex<Option<DateTime<Utc>>>,
}

/// Holds every registered [`Job`] by name.
#[derive(Default)]
pub struct JobRegistry {
    entries: HashMap<&'static str, Entry>,
}

impl JobRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a job. Panics if a job with the same name is already registered.
    pub fn register(&mut self, job: Arc<dyn Job>) {
        let name = job.name();
        assert!(
            !self.entries.contains_key(name),
            "job {name} already registered"
        );
        self.entries.insert(
            name,
            Entry {
                job,
                run_gate: AsyncMutex::new(()),
                last_run: std::sync::Mutex::new(None),
            },
        );
    }

    /// The job registered under `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Job>> {
        self.entries.get(name).map(|e| Arc::clone(&e.job))
    }

    /// Last successful-completion instant for `name`.
    #[must_use]
    pub fn last_run(&self, name: &str) -> Option<DateTime<Utc>> {
        self.entries
            .get(name)
            .and_then(|e| *e.last_run.lock().expect("mutex poisoned"))
    }

    /// Try to acquire the non-reentrance gate for `name`. Returns `None`
    /// (meaning "skip this fire") if a run is already in flight.
    pub fn try_begin(&self, name: &str) -> Option<tokio::sync::MutexGuard<'_, ()>> {
        self.entries.get(name).and_then(|e| e.run_gate.try_lock().ok())
    }

    /// Record that `name` completed successfully just now.
    pub fn record_success(&self, name: &str) {
        if let Some(entry) = self.entries.get(name) {
            *entry.last_run.lock().expect("mutex poisoned") = Some(Utc::now());
        }
    }

    /// All registered job names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

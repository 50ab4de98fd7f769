//! Lifecycle handle for long-lived background tasks (the scheduler's worker
//! loop, the alert producer's monitor loop, the stream maintenance job).
//! Ground truth: the teacher's `StreamHandle`, generalized past streaming.

use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle};

/// Handle to a spawned background task with an optional cooperative stop
/// signal.
///
/// Lifecycle contract:
/// - Prefer [`stop`](TaskHandle::stop) for graceful shutdown.
/// - [`abort`](TaskHandle::abort) cancels immediately without waiting.
/// - Dropping without an explicit shutdown sends a best-effort stop signal
///   (if any) and then aborts; the task may not observe the signal first.
#[derive(Debug)]
pub struct TaskHandle {
    inner: Option<JoinHandle<()>>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl TaskHandle {
    /// Wrap a task and its cooperative stop sender.
    #[must_use]
    pub const fn new(inner: JoinHandle<()>, stop_tx: oneshot::Sender<()>) -> Self {
        Self {
            inner: Some(inner),
            stop_tx: Some(stop_tx),
        }
    }

    /// Wrap a task with no cooperative stop signal; only `abort` is effective.
    #[must_use]
    pub const fn new_abort_only(inner: JoinHandle<()>) -> Self {
        Self {
            inner: Some(inner),
            stop_tx: None,
        }
    }

    /// Request graceful shutdown and await the task's completion.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(inner) = self.inner.take() {
            let _ = inner.await;
        }
    }

    /// Wait up to `grace` for graceful completion, then cancel the task's
    /// context by aborting it (spec.md §4.5 — scheduler shutdown waits up
    /// to a configurable grace period, then cancels in-flight jobs).
    pub async fn stop_with_grace(mut self, grace: std::time::Duration) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(inner) = self.inner.take() {
            let abort_handle: AbortHandle = inner.abort_handle();
            if tokio::time::timeout(grace, inner).await.is_err() {
                tracing::warn!("task did not stop within grace period; cancelling");
                abort_handle.abort();
            }
        }
    }

    /// Force-cancel without waiting.
    pub fn abort(mut self) {
        if let Some(inner) = self.inner.take() {
            inner.abort();
        }
    }

    /// Whether the underlying task has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(h) = self.inner.take() {
            if !h.is_finished() {
                h.abort();
            }
        }
    }
}

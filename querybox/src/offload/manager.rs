//! OffloadManager implementation for background dispatch execution.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use smol_str::SmolStr;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{Instrument, info_span, warn};

use super::policy::{OffloadConfig, TimeoutPolicy};

#[derive(Debug)]
struct OffloadManagerInner {
    config: OffloadConfig,
    tasks: DashMap<u64, AbortHandle>,
    task_counter: AtomicU64,
}

/// Tracks dispatches spawned in the background.
///
/// Clones share the same set of tracked tasks.
#[derive(Clone, Debug)]
pub struct OffloadManager {
    inner: Arc<OffloadManagerInner>,
}

impl OffloadManager {
    /// Create a new OffloadManager with the given configuration.
    pub fn new(config: OffloadConfig) -> Self {
        Self {
            inner: Arc::new(OffloadManagerInner {
                config,
                tasks: DashMap::new(),
                task_counter: AtomicU64::new(0),
            }),
        }
    }

    /// Spawns `task` on `runtime` right away and starts tracking it.
    ///
    /// The task keeps running when the returned handle is dropped.
    pub fn spawn<F>(&self, runtime: &Handle, endpoint: &str, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let id = self.inner.task_counter.fetch_add(1, Ordering::Relaxed);
        let inner = self.inner.clone();
        let policy = self.inner.config.timeout_policy;
        let endpoint = SmolStr::new(endpoint);
        let span = info_span!("dispatch_task", %endpoint, id);
        let (registered_tx, registered_rx) = oneshot::channel::<()>();

        crate::metrics::record_task_spawned(&endpoint);

        let handle = runtime.spawn(
            async move {
                let start = Instant::now();
                let output = task.await;
                let elapsed = start.elapsed();
                // The entry must exist before it can be removed.
                let _ = registered_rx.await;
                if let TimeoutPolicy::Warn(threshold) = policy
                    && elapsed > threshold
                {
                    warn!(
                        elapsed_ms = elapsed.as_millis(),
                        threshold_ms = threshold.as_millis(),
                        "Dispatch task exceeded timeout threshold"
                    );
                }
                inner.tasks.remove(&id);
                crate::metrics::record_task_completed(&endpoint);
                output
            }
            .instrument(span),
        );

        self.inner.tasks.insert(id, handle.abort_handle());
        let _ = registered_tx.send(());
        handle
    }

    /// Get the number of tracked tasks that have not finished yet.
    pub fn active_task_count(&self) -> usize {
        self.inner
            .tasks
            .iter()
            .filter(|entry| !entry.is_finished())
            .count()
    }

    /// Clean up finished task handles.
    pub fn cleanup_finished(&self) {
        self.inner.tasks.retain(|_, handle| !handle.is_finished());
    }

    /// Wait for all currently tracked tasks to complete.
    ///
    /// Tasks spawned while waiting are waited for too.
    pub async fn wait_all(&self) {
        loop {
            self.cleanup_finished();
            if self.inner.tasks.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
    }
}

impl Default for OffloadManager {
    fn default() -> Self {
        Self::new(OffloadConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_spawned_task_runs_without_being_awaited() {
        let manager = OffloadManager::default();
        let (tx, rx) = tokio::sync::oneshot::channel();

        drop(manager.spawn(&Handle::current(), "ping", async move {
            let _ = tx.send(42);
        }));

        manager.wait_all().await;
        assert_eq!(rx.await.unwrap(), 42);
        assert_eq!(manager.active_task_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_wait_all_waits_for_every_task() {
        let manager = OffloadManager::new(OffloadConfig {
            timeout_policy: TimeoutPolicy::Warn(Duration::from_millis(1)),
        });
        let done = Arc::new(AtomicU64::new(0));

        for i in 0..8 {
            let done = done.clone();
            manager.spawn(&Handle::current(), "slow", async move {
                tokio::time::sleep(Duration::from_millis(5 * i)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        manager.wait_all().await;
        assert_eq!(done.load(Ordering::SeqCst), 8);
        assert_eq!(manager.active_task_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_finished_tasks_leave_no_entries() {
        let manager = OffloadManager::default();

        let handles: Vec<_> = (0..2_000)
            .map(|_| manager.spawn(&Handle::current(), "noop", async {}))
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(manager.inner.tasks.len(), 0);
        assert_eq!(manager.active_task_count(), 0);
    }

    #[tokio::test]
    async fn test_join_handle_yields_output() {
        let manager = OffloadManager::default();
        let handle = manager.spawn(&Handle::current(), "echo", async { "done" });
        assert_eq!(handle.await.unwrap(), "done");
    }
}

//! Bounded executor for detached cache work.
//!
//! Cache population and invalidation run after the caller already has its
//! answer. Each task gets its own time budget, is isolated from panics and
//! counts against a fixed number of slots; when every slot is taken the task
//! is dropped instead of queued.

use crate::metrics::{TaskMetrics, TaskOutcome};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, error, info_span, warn, Instrument};

/// Upper bound on configurable slots.
const MAX_SLOTS: usize = 1 << 16;

/// Bounded, panic-isolating spawner for cache tasks.
#[derive(Clone)]
pub struct BackgroundTasks {
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl BackgroundTasks {
    /// Creates an executor running at most `capacity` tasks at once.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_SLOTS);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of tasks currently running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }

    /// Spawns `task` with a time budget of `budget`.
    ///
    /// Returns `false` if the executor was saturated and the task dropped.
    /// Must be called from within a Tokio runtime.
    pub fn spawn<F>(&self, name: &'static str, budget: Duration, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(slot) = Arc::clone(&self.slots).try_acquire_owned() else {
            warn!(task = name, capacity = self.capacity, "Cache task dropped, executor saturated");
            TaskMetrics::record(name, TaskOutcome::Dropped);
            return false;
        };

        tokio::spawn(
            async move {
                let started = Instant::now();
                let outcome = match timeout(budget, AssertUnwindSafe(task).catch_unwind()).await {
                    Ok(Ok(())) => {
                        debug!("Cache task completed");
                        TaskOutcome::Completed
                    }
                    Ok(Err(panic)) => {
                        error!(panic = %panic_message(panic.as_ref()), "Cache task panicked");
                        TaskOutcome::Panicked
                    }
                    Err(_) => {
                        warn!(budget = ?budget, "Cache task timed out");
                        TaskOutcome::TimedOut
                    }
                };

                TaskMetrics::record(name, outcome);
                TaskMetrics::duration(name, started.elapsed());
                drop(slot);
            }
            .instrument(info_span!("cache_task", task = name)),
        );

        true
    }

    /// Waits until no task is running.
    pub async fn wait_idle(&self) {
        let all = u32::try_from(self.capacity).unwrap_or(u32::MAX);
        if let Ok(permits) = self.slots.acquire_many(all).await {
            drop(permits);
        }
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new(64)
    }
}

impl std::fmt::Debug for BackgroundTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTasks")
            .field("capacity", &self.capacity)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_runs_task() {
        let tasks = BackgroundTasks::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();

        assert!(tasks.spawn("test", Duration::from_secs(1), async move {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        tasks.wait_idle().await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(tasks.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_drops_when_saturated() {
        let tasks = BackgroundTasks::new(1);
        let release = Arc::new(Notify::new());
        let r = release.clone();

        assert!(tasks.spawn("blocker", Duration::from_secs(5), async move {
            r.notified().await;
        }));
        assert!(!tasks.spawn("extra", Duration::from_secs(5), async {}));
        assert_eq!(tasks.in_flight(), 1);

        release.notify_one();
        tasks.wait_idle().await;
        assert!(tasks.spawn("after", Duration::from_secs(5), async {}));
        tasks.wait_idle().await;
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let tasks = BackgroundTasks::new(2);
        assert!(tasks.spawn("boom", Duration::from_secs(1), async {
            panic!("cache task exploded");
        }));
        tasks.wait_idle().await;

        // The slot is released and the executor keeps working.
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        tasks.spawn("next", Duration::from_secs(1), async move {
            c.fetch_add(1, Ordering::SeqCst);
        });
        tasks.wait_idle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_cancels_slow_task() {
        let tasks = BackgroundTasks::new(1);
        let finished = Arc::new(AtomicUsize::new(0));
        let f = finished.clone();

        tasks.spawn("slow", Duration::from_millis(100), async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            f.fetch_add(1, Ordering::SeqCst);
        });
        tasks.wait_idle().await;

        assert_eq!(finished.load(Ordering::SeqCst), 0);
        assert_eq!(tasks.in_flight(), 0);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}

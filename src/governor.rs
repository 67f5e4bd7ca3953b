use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Admission gate capping the number of in-flight fetch tasks.
///
/// Cloning shares the same permits, so every batch of an engine draws from
/// one pool for the engine's whole lifetime.
#[derive(Debug, Clone)]
pub struct Governor {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl Governor {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Run `task` once a slot is free. The slot is held until the task
    /// completes; task failures are the task's own output.
    pub async fn run<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        // The semaphore is never closed, so acquire only fails if that changes
        let _permit = match self.permits.acquire().await {
            Ok(permit) => Some(permit),
            Err(e) => {
                tracing::warn!("Governor semaphore closed, running ungated: {}", e);
                None
            }
        };
        task.await
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tasks currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_caps_concurrency() {
        let governor = Governor::new(3);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks = (0..12).map(|i| {
            let governor = governor.clone();
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            tokio::spawn(async move {
                governor
                    .run(async {
                        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        current.fetch_sub(1, Ordering::SeqCst);
                        i
                    })
                    .await
            })
        });

        let results: Vec<usize> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

        assert_eq!(results.len(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
        assert_eq!(governor.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_task_failure_releases_slot() {
        let governor = Governor::new(1);

        let failed: std::result::Result<(), &str> = governor.run(async { Err("boom") }).await;
        assert!(failed.is_err());

        let ok = governor.run(async { 7 }).await;
        assert_eq!(ok, 7);
        assert_eq!(governor.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_raised_to_one() {
        let governor = Governor::new(0);
        assert_eq!(governor.capacity(), 1);
        assert_eq!(governor.run(async { "done" }).await, "done");
    }
}

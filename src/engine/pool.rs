//! Worker pool
//!
//! Bounds the number of in-flight tasks with a semaphore. Every task of a
//! batch is awaited before results are handed back, in input order.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    max_workers: usize,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_workers)),
            max_workers,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Run `task` over every item with at most `max_workers` running at once.
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, task: F) -> Vec<Result<R, JoinError>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut,
        Fut: Future<Output = R> + Send + 'static,
    {
        let handles: Vec<_> = items
            .into_iter()
            .map(|item| {
                let semaphore = self.semaphore.clone();
                let fut = task(item);
                tokio::spawn(async move {
                    // Closed only on drop, so the permit is always granted
                    let _permit = semaphore.acquire_owned().await;
                    fut.await
                })
            })
            .collect();

        futures::future::join_all(handles).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_returns_results_in_input_order() {
        let pool = WorkerPool::new(3);
        let results = pool
            .run((0..10u64).collect(), |n| async move {
                tokio::time::sleep(Duration::from_millis(10 - n)).await;
                n * 2
            })
            .await;

        let values: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, (0..10).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_bounds_concurrency() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = pool
            .run((0..8).collect::<Vec<u32>>(), |_| {
                let running = running.clone();
                let peak = peak.clone();
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                }
            })
            .await;

        assert_eq!(results.len(), 8);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_panicking_task_is_reported() {
        let pool = WorkerPool::new(2);
        let results = pool
            .run(vec![1, 2, 3], |n| async move {
                if n == 2 {
                    panic!("boom");
                }
                n
            })
            .await;

        assert_eq!(*results[0].as_ref().unwrap(), 1);
        assert!(results[1].is_err());
        assert_eq!(*results[2].as_ref().unwrap(), 3);
    }

    #[test]
    fn test_zero_workers_means_one() {
        assert_eq!(WorkerPool::new(0).max_workers(), 1);
    }
}

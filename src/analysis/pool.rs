//! Fixed-size worker pool fed by a bounded FIFO queue.
//!
//! Workers are tokio tasks that pull boxed jobs from one shared
//! `mpsc` receiver. `submit` waits for queue capacity, so a burst of
//! segments applies backpressure instead of spawning unbounded work.
//! Each job reports back through its own `oneshot` channel.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, mpsc, oneshot};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

static SHARED: StdMutex<Option<WorkerPool>> = StdMutex::new(None);

/// Errors surfaced by the pool itself (never by the jobs).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PoolError {
    #[error("Worker pool is shut down")]
    Closed,
    #[error("Job panicked or was dropped before completing")]
    JobLost,
}

/// Handle to a running pool. Cloning shares the same workers and queue.
#[derive(Clone)]
pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
    workers: usize,
    capacity: usize,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl WorkerPool {
    /// Starts `workers` worker tasks on the current tokio runtime.
    ///
    /// Zero values are raised to one. Must be called from within a runtime.
    pub fn new(workers: usize, capacity: usize) -> Self {
        let workers = workers.max(1);
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel::<Job>(capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        for worker_id in 0..workers {
            let receiver = Arc::clone(&receiver);
            tokio::spawn(async move {
                loop {
                    let job = {
                        let mut guard = receiver.lock().await;
                        guard.recv().await
                    };
                    let Some(job) = job else {
                        tracing::trace!(worker_id, "Worker queue closed, exiting");
                        break;
                    };
                    // A panicking job must not take the worker down with it.
                    if let Err(err) = tokio::spawn(job).await {
                        tracing::error!(worker_id, error = %err, "Worker job panicked");
                    }
                }
            });
        }

        tracing::debug!(workers, capacity, "Worker pool started");
        Self {
            sender,
            workers,
            capacity,
        }
    }

    /// Process-wide pool, created on first use with the given sizing.
    ///
    /// Later calls return the existing pool and ignore their arguments. A
    /// pool whose runtime has shut down is replaced.
    pub fn shared(workers: usize, capacity: usize) -> WorkerPool {
        let mut slot = SHARED.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match slot.as_ref() {
            Some(pool) if !pool.is_closed() => pool.clone(),
            _ => {
                let pool = WorkerPool::new(workers, capacity);
                *slot = Some(pool.clone());
                pool
            }
        }
    }

    /// True once every worker has exited.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Queues `task` and returns the receiver for its result.
    ///
    /// Waits while the queue is full.
    pub async fn submit<F, T>(&self, task: F) -> Result<oneshot::Receiver<T>, PoolError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let output = task.await;
            if tx.send(output).is_err() {
                tracing::trace!("Job result dropped: caller stopped waiting");
            }
        });
        self.sender
            .send(job)
            .await
            .map_err(|_| PoolError::Closed)?;
        Ok(rx)
    }

    /// Queues `task` and waits for its output.
    pub async fn run<F, T>(&self, task: F) -> Result<T, PoolError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let rx = self.submit(task).await?;
        rx.await.map_err(|_| PoolError::JobLost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_returns_job_output() {
        let pool = WorkerPool::new(2, 4);
        let value = pool.run(async { 21 * 2 }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_results_reassemble_in_submission_order() {
        let pool = WorkerPool::new(4, 8);
        let mut receivers = Vec::new();
        for i in 0..8u64 {
            // Earlier jobs sleep longer so completion order is reversed.
            let rx = pool
                .submit(async move {
                    tokio::time::sleep(Duration::from_millis(40 - i * 5)).await;
                    i
                })
                .await
                .unwrap();
            receivers.push(rx);
        }

        let mut results = Vec::new();
        for rx in receivers {
            results.push(rx.await.unwrap());
        }
        assert_eq!(results, (0..8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_by_worker_count() {
        let pool = WorkerPool::new(2, 16);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut receivers = Vec::new();
        for _ in 0..8 {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            let rx = pool
                .submit(async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
                .await
                .unwrap();
            receivers.push(rx);
        }
        for rx in receivers {
            rx.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_kill_worker() {
        let pool = WorkerPool::new(1, 2);
        let lost = pool
            .run(async {
                if true {
                    panic!("boom");
                }
                1
            })
            .await;
        assert_eq!(lost, Err(PoolError::JobLost));

        let value = pool.run(async { 7 }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_shared_pool_is_reused() {
        let first = WorkerPool::shared(3, 5);
        let second = WorkerPool::shared(9, 9);
        assert_eq!(second.workers(), first.workers());
        assert!(!second.is_closed());
    }

    #[tokio::test]
    async fn test_zero_sizes_are_raised() {
        let pool = WorkerPool::new(0, 0);
        assert_eq!(pool.workers(), 1);
        assert_eq!(pool.capacity(), 1);
        assert_eq!(pool.run(async { "ok" }).await.unwrap(), "ok");
    }
}

//! Bounded worker pool
//!
//! A fixed set of scoped OS threads pulls work items from a zero-capacity
//! channel, so an item is only handed out once a worker is free to start it.
//! Results travel back over a second channel and are delivered to the caller
//! in completion order.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::channel::{bounded, unbounded};
use tracing::trace;

use crate::error::{BatchError, BatchResult};

/// Upper bound on explicitly requested workers
pub const MAX_WORKERS: usize = 256;

/// Cap applied to the CPU-derived default
pub const DEFAULT_WORKER_CAP: usize = 8;

/// Worker count used when the caller does not pick one
pub fn default_workers() -> usize {
    num_cpus::get().clamp(1, DEFAULT_WORKER_CAP)
}

/// Cooperative cancellation flag shared between the caller and the workers
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop handing out new work; in-flight items see the flag between chunks
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Summary of one pool execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolRun {
    /// Items handed to a worker
    pub dispatched: usize,
    /// Items never handed out because of cancellation
    pub not_started: usize,
}

/// Fixed-size pool of worker threads
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// Create a pool with exactly `workers` threads
    pub fn new(workers: usize) -> BatchResult<Self> {
        if workers == 0 || workers > MAX_WORKERS {
            return Err(BatchError::InvalidWorkerCount {
                requested: workers,
                max: MAX_WORKERS,
            });
        }
        Ok(Self { workers })
    }

    /// Create a pool sized by `requested`, or by [`default_workers`]
    pub fn with_requested(requested: Option<usize>) -> BatchResult<Self> {
        Self::new(requested.unwrap_or_else(default_workers))
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `worker_fn` over `items` on at most `workers` threads.
    ///
    /// `on_result` runs on the calling thread, once per finished item, in
    /// completion order. Returns after every dispatched item has finished.
    pub fn execute<T, R, F, C>(
        &self,
        items: Vec<T>,
        cancel: &CancellationToken,
        worker_fn: F,
        mut on_result: C,
    ) -> BatchResult<PoolRun>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync,
        C: FnMut(R),
    {
        let total = items.len();
        if total == 0 {
            return Ok(PoolRun {
                dispatched: 0,
                not_started: 0,
            });
        }

        let thread_count = self.workers.min(total);
        let (work_tx, work_rx) = bounded::<T>(0);
        let (result_tx, result_rx) = unbounded::<R>();
        let dispatched = AtomicUsize::new(0);

        let worker_fn = &worker_fn;
        let dispatched_ref = &dispatched;

        crossbeam::thread::scope(|s| {
            for worker_id in 0..thread_count {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();

                s.spawn(move |_| {
                    trace!(worker_id, "worker started");
                    while let Ok(item) = work_rx.recv() {
                        if result_tx.send(worker_fn(item)).is_err() {
                            break; // Collector gone
                        }
                    }
                    trace!(worker_id, "worker finished");
                });
            }

            // Producer: blocks until a worker takes each item
            s.spawn(move |_| {
                for item in items {
                    if cancel.is_cancelled() {
                        break;
                    }
                    if work_tx.send(item).is_err() {
                        break;
                    }
                    dispatched_ref.fetch_add(1, Ordering::SeqCst);
                }
                // Dropping work_tx closes the queue and lets workers exit
            });

            // Only workers hold senders/receivers from here on
            drop(work_rx);
            drop(result_tx);

            for result in result_rx.iter() {
                on_result(result);
            }
        })
        .map_err(|_| BatchError::WorkerPool("a worker thread panicked".to_string()))?;

        let dispatched = dispatched.load(Ordering::SeqCst);
        Ok(PoolRun {
            dispatched,
            not_started: total - dispatched,
        })
    }
}

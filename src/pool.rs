//! Bounded worker pool: OS threads draining a closed-when-full task queue.
//!
//! ## Why OS threads instead of async tasks?
//!
//! Every unit of work here is blocking CPU + disk I/O (rasterise a PDF,
//! run recognition, write files). Persistent worker threads pulling from a
//! `crossbeam-channel` queue give true parallelism with no executor in the
//! middle and make the drain condition trivial: workers exit when the queue
//! is closed and empty, and `run` returns once every worker has exited.
//!
//! ## Backpressure
//!
//! The queue capacity equals the total task count, so enqueueing never
//! blocks — only execution is throttled, by the worker count. Peak in-flight
//! work is therefore bounded by the concurrency limit alone.
//!
//! ## Completion guarantee
//!
//! Every dispatched task produces exactly one [`TaskReport`]: success,
//! failure, cancellation, and even a panicking work closure all come back as
//! a report. All per-item completion signals (created flag, error, failed
//! path) travel in that single tagged record, so result streams can never
//! skew against each other.

use crate::error::ItemError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error};

/// Cooperative cancellation signal shared by a pool run.
///
/// Workers check the token before executing each dequeued task; once
/// cancelled, remaining tasks complete immediately with an
/// [`ItemError::Cancelled`] report instead of running. In-flight tasks are
/// not interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// The single completion record for one task.
///
/// Carrying the created flag, the error, and the failed identifier together
/// in one record keeps producers and consumers in lockstep by construction.
#[derive(Debug)]
pub struct TaskReport {
    /// Index of the task within its pool run.
    pub id: usize,
    /// Whether the task created a new output artifact (false when the
    /// artifact already existed or the task failed).
    pub created: bool,
    /// The item's failure, if any.
    pub error: Option<ItemError>,
    /// Identifying path of the failed item; `Some` iff `error` is `Some`.
    pub failed_path: Option<PathBuf>,
}

impl TaskReport {
    pub fn success(id: usize, created: bool) -> Self {
        Self {
            id,
            created,
            error: None,
            failed_path: None,
        }
    }

    pub fn failure(id: usize, error: ItemError, failed_path: PathBuf) -> Self {
        Self {
            id,
            created: false,
            error: Some(error),
            failed_path: Some(failed_path),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

type Work = Box<dyn FnOnce() -> TaskReport + Send + 'static>;

/// One unit of work submitted to the pool.
///
/// Owned exclusively by the pool until executed; the payload path identifies
/// the item in cancellation and panic reports.
pub struct Task {
    id: usize,
    payload: PathBuf,
    work: Work,
}

impl Task {
    pub fn new(
        id: usize,
        payload: impl Into<PathBuf>,
        work: impl FnOnce() -> TaskReport + Send + 'static,
    ) -> Self {
        Self {
            id,
            payload: payload.into(),
            work: Box::new(work),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }
}

/// Bounded-concurrency executor for an ordered list of [`Task`]s.
///
/// Tasks are independent: no ordering guarantee among concurrently executing
/// tasks, and one task's failure never prevents the rest from running.
pub struct WorkerPool {
    tasks: Vec<Task>,
    concurrency: usize,
}

impl WorkerPool {
    /// Create a pool. `concurrency` is clamped to at least 1.
    pub fn new(tasks: Vec<Task>, concurrency: usize) -> Self {
        Self {
            tasks,
            concurrency: concurrency.max(1),
        }
    }

    /// Execute every task to completion and return one report per task,
    /// ordered by task id.
    ///
    /// Returns immediately with an empty vec when there are no tasks.
    pub fn run(self, cancel: &CancelToken) -> Vec<TaskReport> {
        let total = self.tasks.len();
        if total == 0 {
            return Vec::new();
        }
        let workers = self.concurrency.min(total);
        debug!(total, workers, "starting pool run");

        // Capacity equals the task count, so enqueueing never blocks and the
        // receiver is still open, so sends cannot fail.
        let (task_tx, task_rx) = crossbeam_channel::bounded::<Task>(total);
        for task in self.tasks {
            task_tx
                .send(task)
                .expect("task queue receiver dropped before enqueue finished");
        }
        drop(task_tx);

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let rx = task_rx.clone();
            let token = cancel.clone();
            handles.push(thread::spawn(move || {
                debug!(worker_id, "worker started");
                let mut reports = Vec::new();
                for task in rx {
                    reports.push(execute(worker_id, task, &token));
                }
                debug!(worker_id, completed = reports.len(), "worker exited");
                reports
            }));
        }
        drop(task_rx);

        let mut reports = Vec::with_capacity(total);
        for handle in handles {
            // Panics inside work closures are caught per task; a worker
            // thread itself cannot panic, so join only fails if the
            // runtime is torn down beneath us.
            if let Ok(mut worker_reports) = handle.join() {
                reports.append(&mut worker_reports);
            }
        }
        reports.sort_by_key(|r| r.id);
        reports
    }
}

fn execute(worker_id: usize, task: Task, cancel: &CancelToken) -> TaskReport {
    let Task { id, payload, work } = task;

    if cancel.is_cancelled() {
        debug!(worker_id, task_id = id, "skipping cancelled task");
        return TaskReport::failure(id, ItemError::Cancelled { path: payload.clone() }, payload);
    }

    debug!(worker_id, task_id = id, "executing task");
    match catch_unwind(AssertUnwindSafe(work)) {
        Ok(report) => report,
        Err(panic) => {
            let detail = panic_detail(panic);
            error!(worker_id, task_id = id, detail = %detail, "task panicked");
            TaskReport::failure(id, ItemError::Panicked { detail }, payload)
        }
    }
}

fn panic_detail(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

//! Fixed-size pool of background worker threads
//!
//! Workers are plain OS threads named `honeybadger-pool-<pool>-thread-<n>`. Each one owns a
//! current-thread tokio runtime and loops over the shared [`EvictingQueue`], handing every
//! job to the [`JobHandler`]. A panicking job is logged and the worker moves on. Worker
//! threads are detached, so they never keep the process alive.

use crate::error::QueueError;
use crate::priority;
use crate::queue::{EvictingQueue, PushOutcome};
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};

static NEXT_POOL_ID: AtomicUsize = AtomicUsize::new(1);

/// Processes one job on a worker thread
#[async_trait]
pub trait JobHandler<J>: Send + Sync + 'static {
    async fn handle(&self, job: J);
}

#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub worker_count: usize,
    /// 1..=10 scale, see [`crate::priority`]
    pub priority: i32,
    pub queue_capacity: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            worker_count: 1,
            priority: priority::LOWEST,
            queue_capacity: usize::MAX,
        }
    }
}

/// Counts running workers so shutdown can wait for them with a deadline
struct ExitLatch {
    running: Mutex<usize>,
    finished: Condvar,
}

impl ExitLatch {
    fn new() -> Self {
        Self {
            running: Mutex::new(0),
            finished: Condvar::new(),
        }
    }

    fn enter(&self) {
        *self.running.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn exit(&self) {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        *running = running.saturating_sub(1);
        if *running == 0 {
            self.finished.notify_all();
        }
    }

    /// Returns false if workers were still running when the timeout elapsed
    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        while *running > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .finished
                .wait_timeout(running, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            running = guard;
        }
        true
    }
}

/// Decrements the latch when a worker exits, including by unwinding
struct ExitGuard(Arc<ExitLatch>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.exit();
    }
}

pub struct WorkerPool<J> {
    id: usize,
    worker_count: usize,
    queue: Arc<EvictingQueue<J>>,
    latch: Arc<ExitLatch>,
    shut_down: AtomicBool,
}

impl<J: Send + 'static> WorkerPool<J> {
    /// Spawns the workers. On failure every worker started so far is told to stop.
    pub fn start<H>(settings: PoolSettings, handler: Arc<H>) -> Result<Self, QueueError>
    where
        H: JobHandler<J>,
    {
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let worker_count = settings.worker_count.max(1);
        let queue = Arc::new(EvictingQueue::new(settings.queue_capacity));
        let latch = Arc::new(ExitLatch::new());

        for n in 1..=worker_count {
            let name = format!("honeybadger-pool-{}-thread-{}", id, n);
            if let Err(e) = spawn_worker(
                name,
                settings.priority,
                Arc::clone(&queue),
                Arc::clone(&handler),
                Arc::clone(&latch),
            ) {
                queue.close();
                return Err(e);
            }
        }

        debug!(
            pool = id,
            workers = worker_count,
            capacity = settings.queue_capacity,
            "Started worker pool"
        );

        Ok(Self {
            id,
            worker_count,
            queue,
            latch,
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn submit(&self, job: J) -> PushOutcome<J> {
        self.queue.push(job)
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Number of jobs waiting for a worker
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Stops accepting jobs and lets workers drain the queue for up to `timeout`.
    ///
    /// Jobs still queued after the deadline are removed and returned. Calling this more
    /// than once is harmless; later calls return an empty list.
    pub fn shutdown(&self, timeout: Duration) -> Vec<J> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Vec::new();
        }

        self.queue.close();
        if !self.latch.wait(timeout) {
            warn!("Graceful shutdown took too much time, forcing the shutdown.");
        }

        let discarded = self.queue.drain();
        if !discarded.is_empty() {
            info!(
                "{} tasks failed to execute before the shutdown.",
                discarded.len()
            );
        }
        debug!(pool = self.id, "Worker pool shut down");
        discarded
    }
}

fn spawn_worker<J, H>(
    name: String,
    priority: i32,
    queue: Arc<EvictingQueue<J>>,
    handler: Arc<H>,
    latch: Arc<ExitLatch>,
) -> Result<(), QueueError>
where
    J: Send + 'static,
    H: JobHandler<J>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(QueueError::Runtime)?;

    latch.enter();
    let guard = ExitGuard(Arc::clone(&latch));
    let thread_name = name.clone();

    std::thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            let _guard = guard;
            if let Err(e) = priority::set_current_thread_priority(priority) {
                debug!(worker = %thread_name, "Could not lower worker priority: {}", e);
            }
            run_worker(&thread_name, runtime, &queue, handler.as_ref());
        })
        // a failed spawn drops the closure, and with it the guard
        .map_err(|source| QueueError::Spawn { name, source })?;

    Ok(())
}

fn run_worker<J, H>(name: &str, runtime: Runtime, queue: &EvictingQueue<J>, handler: &H)
where
    H: JobHandler<J>,
{
    while let Some(job) = queue.pop() {
        let result = runtime.block_on(AssertUnwindSafe(handler.handle(job)).catch_unwind());
        if let Err(panic) = result {
            error!(
                worker = %name,
                "An exception occurred while dispatching the error: {}",
                panic_message(panic.as_ref())
            );
        }
    }
    debug!(worker = %name, "Worker exiting");
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

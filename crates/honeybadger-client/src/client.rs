//! Submission entry point
//!
//! [`HoneybadgerClient::report`] either dispatches inline (synchronous mode) or hands the
//! record to a lazily started worker pool. The pool is created at most once per client and
//! is shut down, with a grace period, by [`HoneybadgerClient::shutdown`] or on drop.

use crate::dispatcher::{DispatchStatus, Dispatcher};
use crate::filter::ExclusionPolicy;
use crate::payload::PayloadBuilder;
use crate::submission::Submission;
use crate::transport::{HttpTransport, Transport};
use async_trait::async_trait;
use honeybadger_core::{
    mdc, ConfigOverrides, DispatchConfig, ErrorRecord, HoneybadgerError, HoneybadgerResult,
    MdcSnapshot,
};
use honeybadger_queue::{JobHandler, PoolSettings, PushOutcome, WorkerPool};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error};

/// Grace period given to workers to drain the queue on shutdown
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// A record queued for a worker, with the submitter's diagnostic context
pub struct DispatchJob {
    record: ErrorRecord,
    context: MdcSnapshot,
    completion: oneshot::Sender<DispatchStatus>,
}

impl DispatchJob {
    fn complete(self, status: DispatchStatus) {
        // the submitter may have dropped its handle
        let _ = self.completion.send(status);
    }
}

struct DispatchHandler {
    dispatcher: Arc<Dispatcher>,
}

#[async_trait]
impl JobHandler<DispatchJob> for DispatchHandler {
    async fn handle(&self, mut job: DispatchJob) {
        let status = {
            let _scope = mdc::scope(std::mem::take(&mut job.context));
            self.dispatcher.dispatch(&job.record).await
        };
        job.complete(status);
    }
}

pub struct HoneybadgerClient {
    config: DispatchConfig,
    dispatcher: Arc<Dispatcher>,
    pool: OnceLock<Option<WorkerPool<DispatchJob>>>,
    closed: AtomicBool,
}

impl HoneybadgerClient {
    /// Creates a client that delivers over HTTP to the configured endpoint
    pub fn new(config: DispatchConfig) -> HoneybadgerResult<Self> {
        let transport = HttpTransport::new(&config).map_err(|e| {
            HoneybadgerError::configuration(format!("Failed to create HTTP client: {}", e))
        })?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a client from environment variables and the property registry
    pub fn from_env() -> HoneybadgerResult<Self> {
        Self::new(DispatchConfig::load(ConfigOverrides::default())?)
    }

    pub fn with_transport(config: DispatchConfig, transport: Arc<dyn Transport>) -> Self {
        let builder = PayloadBuilder::new(&config);
        Self::with_components(config, builder, transport)
    }

    pub fn with_components(
        config: DispatchConfig,
        builder: PayloadBuilder,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let dispatcher = Dispatcher::new(ExclusionPolicy::from_config(&config), builder, transport);
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
            pool: OnceLock::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Starts the worker pool ahead of the first report.
    ///
    /// Returns false in synchronous mode, after shutdown, or if the pool could not be
    /// started (reports then run inline).
    pub fn start(&self) -> bool {
        self.config.async_enabled && !self.is_shut_down() && self.pool().is_some()
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn pool(&self) -> Option<&WorkerPool<DispatchJob>> {
        self.pool
            .get_or_init(|| {
                // shutdown may have started after the caller checked
                if self.is_shut_down() {
                    return None;
                }
                let settings = PoolSettings {
                    worker_count: self.config.worker_count,
                    priority: self.config.worker_priority,
                    queue_capacity: self.config.queue_capacity,
                };
                let handler = Arc::new(DispatchHandler {
                    dispatcher: Arc::clone(&self.dispatcher),
                });
                match WorkerPool::start(settings, handler) {
                    Ok(pool) => Some(pool),
                    Err(e) => {
                        error!("Failed to start Honeybadger worker pool, reporting inline: {}", e);
                        None
                    }
                }
            })
            .as_ref()
    }

    /// Submits a record for reporting. Never fails; the handle only observes the outcome.
    pub fn report(&self, record: ErrorRecord) -> Submission {
        if self.is_shut_down() {
            return Submission::ready(DispatchStatus::Discarded);
        }
        if !self.config.async_enabled {
            return Submission::ready(self.run_inline(record));
        }

        let Some(pool) = self.pool() else {
            if self.is_shut_down() {
                return Submission::ready(DispatchStatus::Discarded);
            }
            return Submission::ready(self.run_inline(record));
        };

        let (completion, submission) = Submission::channel();
        let job = DispatchJob {
            record,
            context: mdc::snapshot(),
            completion,
        };

        match pool.submit(job) {
            PushOutcome::Queued => {}
            PushOutcome::Evicted(oldest) => {
                debug!("Honeybadger queue is full, dropping the oldest pending error");
                oldest.complete(DispatchStatus::Evicted);
            }
            PushOutcome::Closed(job) => job.complete(DispatchStatus::Discarded),
        }
        submission
    }

    /// Runs the pipeline directly and returns its status, bypassing the queue
    pub async fn dispatch(&self, record: &ErrorRecord) -> DispatchStatus {
        self.dispatcher.dispatch(record).await
    }

    /// Dispatches on the calling thread. From inside an async runtime a scoped helper
    /// thread is used instead, since a runtime cannot be entered twice.
    fn run_inline(&self, record: ErrorRecord) -> DispatchStatus {
        if tokio::runtime::Handle::try_current().is_err() {
            return block_on_dispatch(&self.dispatcher, &record);
        }

        let context = mdc::snapshot();
        let dispatcher = &self.dispatcher;
        let record = &record;
        std::thread::scope(|scope| {
            scope
                .spawn(move || {
                    let _scope = mdc::scope(context);
                    block_on_dispatch(dispatcher, record)
                })
                .join()
                .unwrap_or_else(|_| DispatchStatus::Failed("inline dispatch panicked".to_string()))
        })
    }

    /// Stops the worker pool, waiting up to [`SHUTDOWN_TIMEOUT`] for queued records.
    /// Returns the number of records discarded.
    pub fn shutdown(&self) -> usize {
        self.shutdown_with_timeout(SHUTDOWN_TIMEOUT)
    }

    pub fn shutdown_with_timeout(&self, timeout: Duration) -> usize {
        if self.closed.swap(true, Ordering::AcqRel) {
            return 0;
        }

        // waits out a pool start in progress, and stops any later one
        let Some(pool) = self.pool.get_or_init(|| None) else {
            return 0;
        };

        let discarded = pool.shutdown(timeout);
        let count = discarded.len();
        for job in discarded {
            job.complete(DispatchStatus::Discarded);
        }
        count
    }
}

impl Drop for HoneybadgerClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn block_on_dispatch(dispatcher: &Dispatcher, record: &ErrorRecord) -> DispatchStatus {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to build runtime for inline dispatch: {}", e);
            return DispatchStatus::Failed(e.to_string());
        }
    };

    std::panic::catch_unwind(AssertUnwindSafe(|| {
        runtime.block_on(dispatcher.dispatch(record))
    }))
    .unwrap_or_else(|_| {
        error!("An exception occurred while dispatching the error");
        DispatchStatus::Failed("inline dispatch panicked".to_string())
    })
}

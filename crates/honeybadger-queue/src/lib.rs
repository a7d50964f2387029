//! Background dispatch machinery for the Honeybadger notifier
//!
//! A fixed-capacity multi-producer queue that evicts its oldest entry instead of blocking
//! producers, and a small pool of named OS worker threads that drain it. Each worker drives
//! its own current-thread tokio runtime so async handlers can run off the caller's thread.

pub mod error;
pub mod pool;
pub mod priority;
pub mod queue;

pub use error::QueueError;
pub use pool::{JobHandler, PoolSettings, WorkerPool};
pub use queue::{EvictingQueue, PushOutcome};

// Re-export for handler implementations
pub use async_trait::async_trait;

//! # honeybadger-client
//!
//! Error reporting client for the Honeybadger notices API.
//!
//! This crate provides:
//! - Exclusion of unwanted faults by type or by innermost stack frame
//! - Notice payload construction with host, environment and diagnostic context metadata
//! - HTTP delivery with three attempts per record
//! - Asynchronous submission through a bounded, drop-oldest worker queue
//! - A panic hook that reports uncaught panics

mod client;
mod dispatcher;
mod filter;
mod panic_hook;
mod payload;
mod submission;
mod transport;

pub use client::{HoneybadgerClient, SHUTDOWN_TIMEOUT};
pub use dispatcher::{DispatchStatus, Dispatcher, MAX_ATTEMPTS};
pub use filter::{matches_prefix, ExclusionPolicy};
pub use panic_hook::{install_panic_hook, panic_record, PANIC_TYPE};
pub use payload::{
    environment_name, BacktraceEntry, ErrorSection, Notice, NotifierInfo, PayloadBuilder,
    ServerSection, NOTIFIER_NAME, NOTIFIER_VERSION,
};
pub use submission::Submission;
pub use transport::{DeliveryOutcome, HttpTransport, Transport, TransportError, API_KEY_HEADER};

// Re-export for Transport implementations
pub use async_trait::async_trait;

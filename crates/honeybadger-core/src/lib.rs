//! Core types shared by the Honeybadger notifier crates
//!
//! Holds the fault model captured from the application, the error record handed to the
//! dispatcher, the configuration surface, and the process-wide metadata sources
//! (property registry and diagnostic context) that end up in every notice.

pub mod config;
pub mod error;
pub mod fault;
pub mod mdc;
pub mod properties;
pub mod record;
pub mod request;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use error::*;
pub use fault::{capture_frames, frames_from_backtrace, trim_capture_frames, Fault, StackFrame};
pub use mdc::MdcSnapshot;
pub use record::ErrorRecord;
pub use request::{HttpRequestInfo, RequestInfo};
pub use utils::*;

// Re-export external dependencies
pub use serde_json;
pub use tracing;

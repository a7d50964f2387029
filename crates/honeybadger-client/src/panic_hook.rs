//! Reports uncaught panics
//!
//! The installed hook turns the panic into an [`ErrorRecord`], submits it, logs the panic
//! locally and then calls the previously installed hook, so the usual panic output and
//! behaviour are unchanged.
//!
//! The hook only holds a weak reference to the client. The application's own handle stays
//! the one that decides its lifetime, so dropping it (including while unwinding out of
//! `main`) still drains the queue.

use crate::client::HoneybadgerClient;
use honeybadger_core::{frames_from_backtrace, trim_capture_frames, ErrorRecord, Fault, StackFrame};
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::Cell;
use std::panic::Location;
use std::sync::{Arc, Weak};
use tracing::error;

/// Type name given to faults built from panics
pub const PANIC_TYPE: &str = "panic";

const WORKER_THREAD_PREFIX: &str = "honeybadger-pool-";

const HOOK_FRAME_PREFIX: &str = "honeybadger_client::panic_hook";

thread_local! {
    static IN_HOOK: Cell<bool> = const { Cell::new(false) };
}

/// Installs a process-wide panic hook that reports to `client` before chaining to the
/// previous hook.
///
/// Panics raised on the client's own worker threads are not reported, so a failing
/// dispatch cannot feed itself. Once every strong handle to the client is gone the hook
/// only chains.
pub fn install_panic_hook(client: &Arc<HoneybadgerClient>) {
    let client: Weak<HoneybadgerClient> = Arc::downgrade(client);
    let previous = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("<unnamed>");
        let reentered = IN_HOOK.with(|flag| flag.replace(true));

        if !reentered && !thread_name.starts_with(WORKER_THREAD_PREFIX) {
            let record = panic_record(info.payload(), info.location());
            error!(
                thread = thread_name,
                "An unhandled exception has occurred: {}",
                record.effective_message().unwrap_or("Box<dyn Any>")
            );
            match client.upgrade() {
                Some(client) => {
                    let _ = client.report(record);
                }
                None => error!("Honeybadger client is gone, the panic was not reported"),
            }
        }

        if !reentered {
            IN_HOOK.with(|flag| flag.set(false));
        }
        previous(info);
    }));
}

/// Builds the record for a panic payload, capturing the current stack
pub fn panic_record(payload: &(dyn Any + Send), location: Option<&Location<'_>>) -> ErrorRecord {
    let mut fault = Fault::new(PANIC_TYPE);
    if let Some(message) = payload_message(payload) {
        fault = fault.with_message(message);
    }

    let frames = trim_runtime_frames(frames_from_backtrace(&Backtrace::force_capture()));
    let fault = if frames.is_empty() {
        match location {
            Some(location) => fault.with_frame(location_frame(location)),
            None => fault,
        }
    } else {
        fault.with_frames(frames)
    };

    ErrorRecord::new(fault)
}

fn payload_message(payload: &(dyn Any + Send)) -> Option<String> {
    if let Some(message) = payload.downcast_ref::<&str>() {
        Some(message.to_string())
    } else {
        payload.downcast_ref::<String>().cloned()
    }
}

fn location_frame(location: &Location<'_>) -> StackFrame {
    StackFrame::new(location.file(), "panic")
        .with_file(location.file())
        .with_line(location.line())
}

/// Drops the leading frames that belong to the panic machinery
fn trim_runtime_frames(frames: Vec<StackFrame>) -> Vec<StackFrame> {
    trim_capture_frames(frames, &[HOOK_FRAME_PREFIX])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(payload_message(payload.as_ref()), Some("static".to_string()));
        let payload: Box<dyn Any + Send> = Box::new(format!("index {} out of range", 3));
        assert_eq!(
            payload_message(payload.as_ref()),
            Some("index 3 out of range".to_string())
        );
        let payload: Box<dyn Any + Send> = Box::new(7u32);
        assert_eq!(payload_message(payload.as_ref()), None);
    }

    #[test]
    fn test_trim_runtime_frames_keeps_application_frames() {
        let frames = vec![
            StackFrame::new("std::backtrace::Backtrace", "force_capture"),
            StackFrame::new("honeybadger_client::panic_hook::install_panic_hook", "{{closure}}"),
            StackFrame::new("std::panicking", "rust_panic_with_hook"),
            StackFrame::new("", "rust_begin_unwind"),
            StackFrame::new("core::panicking", "panic_fmt"),
            StackFrame::new("billing::invoice", "total"),
            StackFrame::new("std::rt", "lang_start"),
        ];

        let trimmed = trim_runtime_frames(frames);
        assert_eq!(trimmed.len(), 2);
        assert_eq!(trimmed[0].declaring_type, "billing::invoice");
        assert_eq!(trimmed[1].declaring_type, "std::rt");
    }

    #[test]
    fn test_record_has_panic_type_and_message() {
        let payload: Box<dyn Any + Send> = Box::new("kaboom");
        let record = panic_record(payload.as_ref(), Some(Location::caller()));
        let fault = record.fault().unwrap();
        assert_eq!(fault.type_name, PANIC_TYPE);
        assert_eq!(fault.message.as_deref(), Some("kaboom"));
        assert!(!fault.frames.is_empty());
    }
}

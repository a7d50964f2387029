//! Diagnostic context (MDC): a per-thread map of string keys to string values
//!
//! Applications put correlation values here (request id, user id, ...). The payload builder
//! copies the current thread's map into `request.context.mdc`. Worker threads install the
//! submitter's snapshot with [`scope`] so notices reflect the thread that reported the
//! error, not the worker.

use std::cell::RefCell;
use std::collections::BTreeMap;

/// Owned copy of a thread's diagnostic context
pub type MdcSnapshot = BTreeMap<String, String>;

thread_local! {
    static CONTEXT: RefCell<MdcSnapshot> = const { RefCell::new(BTreeMap::new()) };
}

pub fn put(key: impl Into<String>, value: impl Into<String>) -> Option<String> {
    CONTEXT.with(|ctx| ctx.borrow_mut().insert(key.into(), value.into()))
}

pub fn get(key: &str) -> Option<String> {
    CONTEXT.with(|ctx| ctx.borrow().get(key).cloned())
}

pub fn remove(key: &str) -> Option<String> {
    CONTEXT.with(|ctx| ctx.borrow_mut().remove(key))
}

pub fn clear() {
    CONTEXT.with(|ctx| ctx.borrow_mut().clear());
}

pub fn snapshot() -> MdcSnapshot {
    CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// Replaces the whole context, returning the previous one
pub fn replace(snapshot: MdcSnapshot) -> MdcSnapshot {
    CONTEXT.with(|ctx| std::mem::replace(&mut *ctx.borrow_mut(), snapshot))
}

/// Installs `snapshot` on the current thread until the returned guard is dropped
pub fn scope(snapshot: MdcSnapshot) -> MdcScope {
    MdcScope {
        prior: Some(replace(snapshot)),
    }
}

/// Restores the thread's previous diagnostic context on drop
#[must_use = "the context is restored as soon as the scope is dropped"]
pub struct MdcScope {
    prior: Option<MdcSnapshot>,
}

impl Drop for MdcScope {
    fn drop(&mut self) {
        if let Some(prior) = self.prior.take() {
            replace(prior);
        }
    }
}

use crate::fault::{capture_frames, Fault};
use crate::request::RequestInfo;
use std::error::Error as StdError;
use std::sync::Arc;

/// One captured error, handed to the client and consumed by a single dispatch
#[derive(Debug, Clone, Default)]
pub struct ErrorRecord {
    message: Option<String>,
    fault: Option<Fault>,
    reporter: Option<String>,
    context: Option<Arc<dyn RequestInfo>>,
}

impl ErrorRecord {
    pub fn new(fault: Fault) -> Self {
        Self {
            fault: Some(fault),
            ..Default::default()
        }
    }

    /// Captures a typed error together with its `source()` chain and, when backtraces are
    /// enabled, the caller's stack.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: StdError + 'static,
    {
        Self::new(Fault::from_error(error).with_frames(capture_frames()))
    }

    /// Overrides the fault's own message in the notice
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Logical source of the error, usually a logger or module name
    pub fn with_reporter(mut self, reporter: impl Into<String>) -> Self {
        self.reporter = Some(reporter.into());
        self
    }

    pub fn with_context(mut self, context: Arc<dyn RequestInfo>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn reporter(&self) -> Option<&str> {
        self.reporter.as_deref()
    }

    pub fn context(&self) -> Option<&dyn RequestInfo> {
        self.context.as_deref()
    }

    /// The explicit message if one was given, else the fault's own message
    pub fn effective_message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or_else(|| self.fault.as_ref().and_then(|f| f.message.as_deref()))
    }
}

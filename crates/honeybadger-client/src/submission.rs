use crate::dispatcher::DispatchStatus;
use tokio::sync::oneshot;

/// Completion handle returned by [`crate::HoneybadgerClient::report`].
///
/// Reporting is fire-and-forget; dropping the handle has no effect on delivery.
#[derive(Debug)]
pub struct Submission {
    receiver: oneshot::Receiver<DispatchStatus>,
}

impl Submission {
    pub(crate) fn channel() -> (oneshot::Sender<DispatchStatus>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self { receiver })
    }

    pub(crate) fn ready(status: DispatchStatus) -> Self {
        let (sender, submission) = Self::channel();
        let _ = sender.send(status);
        submission
    }

    /// Waits for the record to finish its way through the pipeline
    pub async fn status(self) -> DispatchStatus {
        self.receiver.await.unwrap_or_else(|_| abandoned())
    }

    /// Blocking variant of [`Submission::status`].
    ///
    /// Must not be called from within an async runtime.
    pub fn wait(self) -> DispatchStatus {
        self.receiver.blocking_recv().unwrap_or_else(|_| abandoned())
    }

    /// Returns the status if the record has already been processed
    pub fn try_status(&mut self) -> Option<DispatchStatus> {
        match self.receiver.try_recv() {
            Ok(status) => Some(status),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(abandoned()),
        }
    }
}

// the worker dropped the job without completing it, which only happens when the
// dispatch panicked
fn abandoned() -> DispatchStatus {
    DispatchStatus::Failed("dispatch was abandoned before completing".to_string())
}

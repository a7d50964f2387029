//! Filter, build and deliver one error record with bounded retries

use crate::filter::ExclusionPolicy;
use crate::payload::PayloadBuilder;
use crate::transport::Transport;
use honeybadger_core::ErrorRecord;
use std::fmt;
use std::sync::Arc;
use tracing::{error, trace};

/// Delivery attempts per record before giving up
pub const MAX_ATTEMPTS: u32 = 3;

/// What happened to a submitted record. Informational only; failures are already logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchStatus {
    /// Suppressed by the exclusion policy, nothing was sent
    Filtered,
    Delivered { attempts: u32 },
    GaveUp { attempts: u32 },
    /// The pipeline itself failed (payload construction, worker panic, ...)
    Failed(String),
    /// Dropped from a full queue to make room for a newer record
    Evicted,
    /// Still queued when the client shut down
    Discarded,
}

impl DispatchStatus {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchStatus::Delivered { .. })
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchStatus::Filtered => write!(f, "filtered"),
            DispatchStatus::Delivered { attempts } => {
                write!(f, "delivered after {} attempt(s)", attempts)
            }
            DispatchStatus::GaveUp { attempts } => write!(f, "gave up after {} attempts", attempts),
            DispatchStatus::Failed(reason) => write!(f, "failed: {}", reason),
            DispatchStatus::Evicted => write!(f, "evicted from a full queue"),
            DispatchStatus::Discarded => write!(f, "discarded at shutdown"),
        }
    }
}

pub struct Dispatcher {
    policy: ExclusionPolicy,
    builder: PayloadBuilder,
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(
        policy: ExclusionPolicy,
        builder: PayloadBuilder,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            policy,
            builder,
            transport,
        }
    }

    pub fn policy(&self) -> &ExclusionPolicy {
        &self.policy
    }

    /// Runs the pipeline for one record. Never returns an error to the caller.
    pub async fn dispatch(&self, record: &ErrorRecord) -> DispatchStatus {
        if self.policy.should_exclude(record.fault()) {
            return DispatchStatus::Filtered;
        }

        for attempt in 1..=MAX_ATTEMPTS {
            // rebuilt per attempt so each one carries current metadata
            let notice = match self.builder.build(record) {
                Ok(notice) => notice,
                Err(e) => {
                    error!("Failed to build Honeybadger notice: {}", e);
                    return DispatchStatus::Failed(e.to_string());
                }
            };

            let outcome = self.transport.send(&notice).await;
            if outcome.succeeded {
                trace!(
                    attempt,
                    class = %notice.error.class,
                    "Error reported to Honeybadger"
                );
                return DispatchStatus::Delivered { attempts: attempt };
            }

            error!(
                "Honeybadger did not respond with the correct code. Response was [{}]. Retries = {}",
                outcome.describe(),
                attempt
            );
        }

        DispatchStatus::GaveUp {
            attempts: MAX_ATTEMPTS,
        }
    }
}

//! Common test utilities shared across client integration tests
//!
//! - Scripted transport returning a fixed sequence of status codes
//! - Gated transport that blocks deliveries until released

#![allow(dead_code)]

use honeybadger_client::{async_trait, DeliveryOutcome, Notice, Transport};
use honeybadger_core::{DispatchConfig, ErrorRecord, Fault, StackFrame};
use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Transport answering with scripted status codes, then `fallback` once the script is used up
pub struct ScriptedTransport {
    script: Mutex<VecDeque<u16>>,
    fallback: u16,
    sent: Mutex<Vec<Notice>>,
}

impl ScriptedTransport {
    pub fn new(script: &[u16], fallback: u16) -> Self {
        Self {
            script: Mutex::new(script.iter().copied().collect()),
            fallback,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn always(status: u16) -> Self {
        Self::new(&[], status)
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<Notice> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, notice: &Notice) -> DeliveryOutcome {
        self.sent.lock().unwrap().push(notice.clone());
        let status = self.script.lock().unwrap().pop_front().unwrap_or(self.fallback);
        DeliveryOutcome::from_status(status)
    }
}

/// Transport that reports each delivery as it starts and holds it until the gate opens
pub struct GatedTransport {
    open: Mutex<bool>,
    opened: Condvar,
    started: Mutex<mpsc::Sender<String>>,
    delivered: Mutex<Vec<String>>,
}

impl GatedTransport {
    pub fn new() -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                open: Mutex::new(false),
                opened: Condvar::new(),
                started: Mutex::new(tx),
                delivered: Mutex::new(Vec::new()),
            },
            rx,
        )
    }

    pub fn release(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }

    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn send(&self, notice: &Notice) -> DeliveryOutcome {
        let message = notice.error.message.clone().unwrap_or_default();
        let _ = self.started.lock().unwrap().send(message.clone());

        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
        drop(open);

        self.delivered.lock().unwrap().push(message);
        DeliveryOutcome::from_status(201)
    }
}

pub fn test_config() -> DispatchConfig {
    DispatchConfig::builder("test-api-key").build().unwrap()
}

/// Record with a message and a single application frame
pub fn record(message: &str) -> ErrorRecord {
    ErrorRecord::new(
        Fault::new("billing::InvoiceError")
            .with_message(message)
            .with_frame(
                StackFrame::new("billing::invoice::Invoice", "total")
                    .with_file("src/invoice.rs")
                    .with_line(88),
            ),
    )
}

pub const WAIT: Duration = Duration::from_secs(5);

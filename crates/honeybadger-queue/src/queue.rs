//! Bounded queue that never blocks producers
//!
//! When the queue is full, pushing evicts the oldest pending item and hands it back to the
//! caller. Consumers block in [`EvictingQueue::pop`] until an item arrives or the queue is
//! closed and empty.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Result of [`EvictingQueue::push`]
#[derive(Debug, PartialEq, Eq)]
pub enum PushOutcome<T> {
    /// The item was queued without displacing anything
    Queued,
    /// The item was queued and the returned oldest item was dropped to make room
    Evicted(T),
    /// The queue no longer accepts items; the item is handed back
    Closed(T),
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

pub struct EvictingQueue<T> {
    capacity: usize,
    state: Mutex<State<T>>,
    available: Condvar,
}

impl<T> EvictingQueue<T> {
    /// Creates a queue holding at most `capacity` items (at least one).
    ///
    /// Storage grows on demand, so `usize::MAX` is a valid "unbounded" capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(State {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, item: T) -> PushOutcome<T> {
        let mut state = self.lock();
        if state.closed {
            return PushOutcome::Closed(item);
        }

        let evicted = if state.items.len() >= self.capacity {
            state.items.pop_front()
        } else {
            None
        };
        state.items.push_back(item);
        drop(state);

        self.available.notify_one();
        match evicted {
            Some(oldest) => PushOutcome::Evicted(oldest),
            None => PushOutcome::Queued,
        }
    }

    /// Blocks until an item is available. Returns `None` once the queue is closed and empty.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn try_pop(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Stops accepting items and wakes every blocked consumer.
    /// Items already queued can still be popped.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }

    /// Removes and returns every pending item
    pub fn drain(&self) -> Vec<T> {
        self.lock().items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::capture::error::{CaptureError, Result};
use crate::diagnostics::stats::{BridgeSnapshot, BridgeStats};

/// Queue bound used when the configuration does not set one.
pub const DEFAULT_CAPACITY: usize = 64;

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

struct Shared<T> {
    label: String,
    capacity: usize,
    state: Mutex<QueueState<T>>,
    /// Wakes an async consumer. `notify_one` stores a permit, so a push
    /// that lands before the consumer parks is not lost.
    notify: Notify,
    /// Wakes a consumer parked in `blocking_next`.
    condvar: Condvar,
    subscribed: AtomicBool,
    stats: Mutex<BridgeStats>,
}

impl<T> Shared<T> {
    fn close(&self) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
        }
        tracing::debug!(target: "output::bridge", "{} closed", self.label);
        self.notify.notify_one();
        self.condvar.notify_all();
    }

    fn wake(&self) {
        self.notify.notify_one();
        self.condvar.notify_one();
    }

    /// Pop the next item. `Err(())` means the bridge is closed and drained.
    fn pop(&self) -> std::result::Result<Option<T>, ()> {
        let mut state = self.state.lock();
        match state.items.pop_front() {
            Some(item) => {
                drop(state);
                self.stats.lock().record_event();
                Ok(Some(item))
            }
            None if state.closed => Err(()),
            None => Ok(None),
        }
    }

    fn record_drops(&self, dropped: usize) {
        if dropped == 0 {
            return;
        }
        let mut stats = self.stats.lock();
        for _ in 0..dropped {
            if stats.record_drop() {
                tracing::warn!(
                    target: "output::bridge",
                    "{} consumer is falling behind, dropping oldest events",
                    self.label
                );
            }
        }
    }
}

/// Push-to-pull adapter for one output.
///
/// Backends deliver through cloned [`OutputSink`]s from any thread; exactly
/// one [`OutputStream`] drains the queue in production order. The queue is
/// bounded and drops its oldest entry instead of blocking the producer.
/// Dropping the bridge closes it.
pub struct OutputBridge<T> {
    shared: Arc<Shared<T>>,
}

impl<T> OutputBridge<T> {
    pub fn new(label: impl Into<String>, capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                label: label.into(),
                capacity: capacity.max(1),
                state: Mutex::new(QueueState {
                    items: VecDeque::new(),
                    closed: false,
                }),
                notify: Notify::new(),
                condvar: Condvar::new(),
                subscribed: AtomicBool::new(false),
                stats: Mutex::new(BridgeStats::new()),
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// A producer handle for delivery callbacks.
    pub fn sink(&self) -> OutputSink<T> {
        OutputSink {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Attach the single consumer.
    ///
    /// Fails with [`CaptureError::AlreadySubscribed`] while another stream
    /// for this bridge is alive.
    pub fn subscribe(&self) -> Result<OutputStream<T>> {
        if self
            .shared
            .subscribed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CaptureError::AlreadySubscribed(self.shared.label.clone()));
        }
        Ok(OutputStream {
            shared: Arc::clone(&self.shared),
        })
    }

    /// Complete the sequence. Already queued items are still delivered.
    pub fn close(&self) {
        self.shared.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    pub fn queued(&self) -> usize {
        self.shared.state.lock().items.len()
    }

    pub fn diagnostics(&self) -> BridgeSnapshot {
        let (queued, closed) = {
            let state = self.shared.state.lock();
            (state.items.len(), state.closed)
        };
        self.shared
            .stats
            .lock()
            .snapshot(&self.shared.label, queued, closed)
    }
}

impl<T> Drop for OutputBridge<T> {
    fn drop(&mut self) {
        self.shared.close();
    }
}

/// Producer side of an [`OutputBridge`].
pub struct OutputSink<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for OutputSink<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> OutputSink<T> {
    /// Enqueue one item without blocking. Returns false once the bridge is
    /// closed, in which case the item is discarded.
    pub fn push(&self, item: T) -> bool {
        let dropped = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return false;
            }
            let mut dropped = 0;
            while state.items.len() >= self.shared.capacity {
                state.items.pop_front();
                dropped += 1;
            }
            state.items.push_back(item);
            dropped
        };
        self.shared.record_drops(dropped);
        self.shared.wake();
        true
    }

    /// Replace everything still queued with `item`.
    ///
    /// Used by outputs that only care about the newest sample.
    pub fn push_latest(&self, item: T) -> bool {
        let dropped = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return false;
            }
            let dropped = state.items.len();
            state.items.clear();
            state.items.push_back(item);
            dropped
        };
        self.shared.record_drops(dropped);
        self.shared.wake();
        true
    }

    /// Complete the sequence from the producer side.
    pub fn close(&self) {
        self.shared.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }
}

/// Consumer side of an [`OutputBridge`]. Dropping it frees the bridge for a
/// new subscriber.
pub struct OutputStream<T> {
    shared: Arc<Shared<T>>,
}

impl<T> OutputStream<T> {
    /// Wait for the next item. `None` once the bridge is closed and drained.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            let notified = self.shared.notify.notified();
            match self.shared.pop() {
                Ok(Some(item)) => return Some(item),
                Err(()) => return None,
                Ok(None) => notified.await,
            }
        }
    }

    /// Take the next item if one is queued.
    pub fn try_next(&mut self) -> Option<T> {
        self.shared.pop().ok().flatten()
    }

    /// Like [`next`](Self::next), for plain threads outside the runtime.
    pub fn blocking_next(&mut self) -> Option<T> {
        let mut state = self.shared.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.shared.stats.lock().record_event();
                return Some(item);
            }
            if state.closed {
                return None;
            }
            self.shared.condvar.wait(&mut state);
        }
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }
}

impl<T> Drop for OutputStream<T> {
    fn drop(&mut self) {
        self.shared.subscribed.store(false, Ordering::Release);
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Ordered, best-effort delivery of events to a single consumer
///
/// Events are carried for observability only: once the emitter is closed,
/// or the consumer has gone away, further sends are silently dropped and
/// never retried.
#[derive(Debug)]
pub struct EventEmitter<E> {
    tx: UnboundedSender<E>,
    closed: AtomicBool,
}

impl<E> EventEmitter<E> {
    /// Creates an emitter together with the receiving end for the consumer
    pub fn channel() -> (Self, UnboundedReceiver<E>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Wraps an existing sender
    pub fn new(tx: UnboundedSender<E>) -> Self {
        Self {
            tx,
            closed: AtomicBool::new(false),
        }
    }

    /// Sends an event; a no-op once closed
    ///
    /// Returns true if the event was handed to the transport.
    pub fn send(&self, event: E) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }

        if self.tx.send(event).is_err() {
            tracing::debug!("Event consumer disconnected, closing emitter");
            self.closed.store(true, Ordering::Release);
            return false;
        }

        true
    }

    /// Closes the emitter; calling it again has no effect
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Event emitter closed");
        }
    }

    /// Returns true once closed locally or when the consumer disconnected
    ///
    /// Runs poll this between pages to notice cancellation.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.tx.is_closed()
    }
}

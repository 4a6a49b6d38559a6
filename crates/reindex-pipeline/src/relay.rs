//! Bounded relay queue between the producer and one sink worker.
//!
//! Each queue has exactly one consumer. Senders block when the queue is
//! full, which is what bounds memory when a sink is slower than the
//! producer. Completion is an explicit [`RelayMessage::End`], never a
//! reserved document value.
//!
//! Built on `tokio::sync::mpsc` driven through its blocking API, so every
//! call here must run on a plain OS thread (rayon workers and
//! `std::thread` are fine, a tokio runtime thread is not).

use std::sync::Arc;

use tokio::sync::mpsc;

use reindex_types::Document;

use crate::error::RelayClosed;

/// A message on a relay queue.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayMessage {
    Item(Document),
    /// No more items will follow in this cycle.
    End,
}

/// Create a relay queue for one consumer role.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn relay_queue(role: &str, capacity: usize) -> (RelaySender, RelayReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let role: Arc<str> = Arc::from(role);
    (
        RelaySender {
            role: Arc::clone(&role),
            inner: tx,
        },
        RelayReceiver { role, inner: rx },
    )
}

/// Producer side of a relay queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RelaySender {
    role: Arc<str>,
    inner: mpsc::Sender<RelayMessage>,
}

impl RelaySender {
    /// Enqueue a document, blocking while the queue is full.
    ///
    /// Fails immediately if the consumer has gone away.
    pub fn send(&self, document: Document) -> Result<(), RelayClosed> {
        self.push(RelayMessage::Item(document))
    }

    /// Enqueue the end marker.
    pub fn end(&self) -> Result<(), RelayClosed> {
        self.push(RelayMessage::End)
    }

    fn push(&self, message: RelayMessage) -> Result<(), RelayClosed> {
        self.inner
            .blocking_send(message)
            .map_err(|_| RelayClosed(self.role.to_string()))
    }

    /// Messages enqueued but not yet received.
    pub fn pending(&self) -> usize {
        self.inner.max_capacity() - self.inner.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub fn role(&self) -> &str {
        &self.role
    }
}

/// Consumer side of a relay queue.
#[derive(Debug)]
pub struct RelayReceiver {
    role: Arc<str>,
    inner: mpsc::Receiver<RelayMessage>,
}

impl RelayReceiver {
    /// Dequeue the next message, blocking while the queue is empty.
    ///
    /// Returns `None` once every sender is dropped and the queue is drained.
    pub fn recv(&mut self) -> Option<RelayMessage> {
        self.inner.blocking_recv()
    }

    pub fn pending(&self) -> usize {
        self.inner.len()
    }

    pub fn role(&self) -> &str {
        &self.role
    }
}

//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus distributes messages that have **already been committed** to the
//! activity ledger. It is not a store: a subscriber that joins late only sees
//! what is published after it subscribed, and must go back to the ledger for
//! history.
//!
//! Delivery is at-least-once and consumers (activity feeds on operator
//! terminals) must tolerate duplicates.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to a message stream.
///
/// Each subscription receives its own copy of every message published after
/// it was created (broadcast semantics). Intended for a single consuming
/// thread.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently buffered without blocking.
    pub fn drain(&self) -> Vec<M> {
        let mut out = Vec::new();
        while let Ok(m) = self.receiver.try_recv() {
            out.push(m);
        }
        out
    }
}

/// Transport-agnostic pub/sub abstraction.
///
/// `publish()` may fail (bus full, transport down). Because messages are
/// committed before publication, callers may log and continue.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    /// Publish one committed batch. Buses that can should deliver it to each
    /// subscriber without interleaving another publisher's messages.
    fn publish_batch(&self, messages: &[M]) -> Result<(), Self::Error>
    where
        M: Clone,
    {
        for message in messages {
            self.publish(message.clone())?;
        }
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn publish_batch(&self, messages: &[M]) -> Result<(), Self::Error>
    where
        M: Clone,
    {
        (**self).publish_batch(messages)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}

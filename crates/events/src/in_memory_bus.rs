//! Single-process fan-out of committed activity to live feeds.
//!
//! Publishers hand over entries that are already durable in the ledger, in
//! commit order. A batch goes out under one lock, so every feed sees it as a
//! contiguous run, and feeds whose receiving end is gone are dropped on the
//! next publish.

use std::sync::{Mutex, MutexGuard, mpsc};

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InMemoryBusError {
    #[error("event bus lock poisoned")]
    Poisoned,
}

#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    feeds: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds still connected as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.feeds.lock().map(|f| f.len()).unwrap_or(0)
    }

    fn feeds(&self) -> Result<MutexGuard<'_, Vec<mpsc::Sender<M>>>, InMemoryBusError> {
        self.feeds.lock().map_err(|_| InMemoryBusError::Poisoned)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            feeds: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        self.publish_batch(std::slice::from_ref(&message))
    }

    fn publish_batch(&self, messages: &[M]) -> Result<(), Self::Error> {
        if messages.is_empty() {
            return Ok(());
        }
        let mut feeds = self.feeds()?;
        feeds.retain(|tx| messages.iter().all(|m| tx.send(m.clone()).is_ok()));
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        // A poisoned bus still hands out a feed; it just stays silent.
        if let Ok(mut feeds) = self.feeds.lock() {
            feeds.push(tx);
        }
        Subscription::new(rx)
    }
}

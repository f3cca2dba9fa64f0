//! In-memory event bus with optional per-subscriber bounds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, mpsc};

use tracing::warn;

use crate::bus::{EventBus, Subscription};

#[derive(Debug)]
pub enum InMemoryBusError {
    /// Publish failed due to internal lock poisoning.
    Poisoned,
}

#[derive(Debug)]
enum Subscriber<M> {
    Unbounded(mpsc::Sender<M>),
    Bounded(mpsc::SyncSender<M>),
}

enum Delivery {
    Delivered,
    Full,
    Disconnected,
}

impl<M> Subscriber<M> {
    fn deliver(&self, message: M) -> Delivery {
        match self {
            Subscriber::Unbounded(tx) => match tx.send(message) {
                Ok(()) => Delivery::Delivered,
                Err(_) => Delivery::Disconnected,
            },
            Subscriber::Bounded(tx) => match tx.try_send(message) {
                Ok(()) => Delivery::Delivered,
                Err(mpsc::TrySendError::Full(_)) => Delivery::Full,
                Err(mpsc::TrySendError::Disconnected(_)) => Delivery::Disconnected,
            },
        }
    }
}

/// In-memory pub/sub bus.
///
/// - No IO / no async
/// - Publishing never blocks: with a capacity set, a subscriber whose queue is
///   full misses the message and the drop is counted
/// - Dead subscribers are pruned while publishing
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<Subscriber<M>>>,
    capacity: Option<usize>,
    dropped: AtomicU64,
}

impl<M> InMemoryEventBus<M> {
    /// Unbounded subscriber queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Each subscriber queue holds at most `capacity` undelivered messages.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            capacity: Some(capacity.max(1)),
            dropped: AtomicU64::new(0),
        }
    }

    /// Number of messages dropped because a subscriber queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            capacity: None,
            dropped: AtomicU64::new(0),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subs = self.subscribers.lock().map_err(|_| InMemoryBusError::Poisoned)?;

        subs.retain(|sub| match sub.deliver(message.clone()) {
            Delivery::Delivered => true,
            Delivery::Full => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("subscriber queue full; message dropped");
                true
            }
            Delivery::Disconnected => false,
        });

        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (sub, rx) = match self.capacity {
            Some(cap) => {
                let (tx, rx) = mpsc::sync_channel(cap);
                (Subscriber::Bounded(tx), rx)
            }
            None => {
                let (tx, rx) = mpsc::channel();
                (Subscriber::Unbounded(tx), rx)
            }
        };

        // If the lock is poisoned, we still return a subscription;
        // it just won't receive messages.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(sub);
        }

        Subscription::new(rx)
    }
}

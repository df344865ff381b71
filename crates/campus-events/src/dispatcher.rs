use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, info, warn};

use campus_types::events::Topic;

/// Default number of undelivered signals a slow subscriber may fall behind by.
pub const DEFAULT_CAPACITY: usize = 64;

/// Owns the refresh channel. Create one at startup and hand out clones;
/// `shutdown` closes every subscription.
#[derive(Clone)]
pub struct EventDispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// `None` once shut down.
    tx: Mutex<Option<broadcast::Sender<Topic>>>,
}

impl EventDispatcher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(DispatcherInner {
                tx: Mutex::new(Some(tx)),
            }),
        }
    }

    fn sender(&self) -> Option<broadcast::Sender<Topic>> {
        self.inner
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Broadcast a signal. Returns how many subscriptions will see it.
    pub fn publish(&self, topic: Topic) -> usize {
        match self.sender() {
            Some(tx) => {
                let delivered = tx.send(topic).unwrap_or(0);
                debug!("Published {} to {} subscriber(s)", topic, delivered);
                delivered
            }
            None => {
                debug!("Dropped {}: dispatcher is shut down", topic);
                0
            }
        }
    }

    /// Subscribe to every topic.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.sender().map(|tx| tx.subscribe()),
            topics: None,
        }
    }

    /// Subscribe to a subset of topics; everything else is skipped.
    pub fn subscribe_to(&self, topics: impl IntoIterator<Item = Topic>) -> Subscription {
        Subscription {
            rx: self.sender().map(|tx| tx.subscribe()),
            topics: Some(topics.into_iter().collect()),
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.sender().map_or(0, |tx| tx.receiver_count())
    }

    /// Drop the sender. Pending signals are still delivered, then every
    /// subscription's `recv` returns `None`.
    pub fn shutdown(&self) {
        let taken = self
            .inner
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if taken.is_some() {
            info!("Event dispatcher shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.sender().is_none()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// One module's view of the refresh channel.
pub struct Subscription {
    rx: Option<broadcast::Receiver<Topic>>,
    topics: Option<HashSet<Topic>>,
}

impl Subscription {
    fn wants(&self, topic: Topic) -> bool {
        self.topics.as_ref().is_none_or(|t| t.contains(&topic))
    }

    /// Wait for the next wanted signal. `None` once the dispatcher is shut down.
    pub async fn recv(&mut self) -> Option<Topic> {
        loop {
            let result = self.rx.as_mut()?.recv().await;
            match result {
                Ok(topic) if self.wants(topic) => return Some(topic),
                Ok(_) => continue,
                Err(RecvError::Lagged(n)) => {
                    warn!("Refresh subscriber lagged by {} signals", n);
                    continue;
                }
                Err(RecvError::Closed) => {
                    self.rx = None;
                    return None;
                }
            }
        }
    }

    /// Non-blocking variant of `recv`: the next wanted signal already queued.
    pub fn try_recv(&mut self) -> Option<Topic> {
        loop {
            let result = self.rx.as_mut()?.try_recv();
            match result {
                Ok(topic) if self.wants(topic) => return Some(topic),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(n)) => {
                    warn!("Refresh subscriber lagged by {} signals", n);
                    continue;
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Closed) => {
                    self.rx = None;
                    return None;
                }
            }
        }
    }
}

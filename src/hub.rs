//! Broadcast hub - best-effort live fan-out of stored events
//!
//! Every subscriber owns a bounded channel. `publish` only ever calls
//! `try_send`, so a slow or dead subscriber never blocks ingestion or the
//! other subscribers: the first failed delivery removes it for good.
//!
//! ```text
//!                        ┌──▶ [buf] ──▶ ws task A
//!  pipeline ──publish──▶ hub ──▶ [buf] ──▶ ws task B
//!                        └──▶ [buf] ✗ full/closed → removed
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::models::AnomalyEvent;

/// Default per-subscriber buffer
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Why a subscriber left the hub. Removal is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// Receiver side dropped or closed
    Closed,
    /// Buffer full when an event arrived
    Lagging,
    /// Explicit `unregister`
    Unregistered,
    /// Hub shut down
    Shutdown,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemovalReason::Closed => "closed",
            RemovalReason::Lagging => "lagging",
            RemovalReason::Unregistered => "unregistered",
            RemovalReason::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

/// Receiving side handed to a subscriber
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Arc<AnomalyEvent>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next event, or `None` once the subscriber has been removed and its
    /// buffer drained.
    pub async fn recv(&mut self) -> Option<Arc<AnomalyEvent>> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Option<Arc<AnomalyEvent>> {
        self.rx.try_recv().ok()
    }

    /// Refuse further deliveries; the hub drops this subscriber on its next publish.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// Delivery outcome of one `publish`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub removed: usize,
}

pub struct BroadcastHub {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<Arc<AnomalyEvent>>>>,
    buffer: usize,
    removed_total: AtomicU64,
}

impl BroadcastHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            buffer: buffer.max(1),
            removed_total: AtomicU64::new(0),
        }
    }

    /// Admit a new subscriber. It only sees events published after this call.
    pub fn register(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = SubscriberId::new();

        let count = {
            let mut subscribers = self.subscribers.write();
            subscribers.insert(id, tx);
            subscribers.len()
        };

        tracing::info!("Subscriber {} connected ({} active)", id, count);
        Subscription { id, rx }
    }

    /// Remove a subscriber. Unknown or already-removed ids are a no-op.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        self.remove(id, RemovalReason::Unregistered)
    }

    /// Deliver `event` to the subscribers registered right now.
    ///
    /// Never fails: a subscriber whose buffer is full or whose receiver is
    /// gone is removed and reported in [`PublishReport::removed`].
    pub fn publish(&self, event: &AnomalyEvent) -> PublishReport {
        let snapshot: Vec<(SubscriberId, mpsc::Sender<Arc<AnomalyEvent>>)> = self
            .subscribers
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        if snapshot.is_empty() {
            return PublishReport::default();
        }

        let event = Arc::new(event.clone());
        let mut report = PublishReport::default();

        for (id, tx) in snapshot {
            match tx.try_send(Arc::clone(&event)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    if self.remove(id, RemovalReason::Lagging) {
                        report.removed += 1;
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    if self.remove(id, RemovalReason::Closed) {
                        report.removed += 1;
                    }
                }
            }
        }

        tracing::debug!(
            "Event {} delivered to {} subscriber(s), {} removed",
            event.id,
            report.delivered,
            report.removed
        );
        report
    }

    /// Drop every subscriber; their streams end once drained.
    pub fn close_all(&self) {
        let drained: Vec<SubscriberId> = self.subscribers.write().drain().map(|(id, _)| id).collect();
        if drained.is_empty() {
            return;
        }
        self.removed_total.fetch_add(drained.len() as u64, Ordering::Relaxed);
        tracing::info!(
            "Broadcast hub closed, {} subscriber(s) removed: {}",
            drained.len(),
            RemovalReason::Shutdown
        );
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Subscribers removed since startup, for any reason
    pub fn removed_total(&self) -> u64 {
        self.removed_total.load(Ordering::Relaxed)
    }

    fn remove(&self, id: SubscriberId, reason: RemovalReason) -> bool {
        let (removed, remaining) = {
            let mut subscribers = self.subscribers.write();
            let removed = subscribers.remove(&id).is_some();
            (removed, subscribers.len())
        };

        if removed {
            self.removed_total.fetch_add(1, Ordering::Relaxed);
            match reason {
                RemovalReason::Lagging | RemovalReason::Closed => tracing::warn!(
                    "Subscriber {} removed: {} ({} active)",
                    id, reason, remaining
                ),
                _ => tracing::info!(
                    "Subscriber {} removed: {} ({} active)",
                    id, reason, remaining
                ),
            }
        }
        removed
    }
}

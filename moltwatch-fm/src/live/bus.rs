//! Live bus: latest snapshot, bounded history, subscriber fan-out
//!
//! All shared state lives behind a single mutex with no await points inside
//! critical sections. Delivery to subscribers is non-blocking: a full
//! per-subscriber queue drops the message for that subscriber only, so a slow
//! viewer never stalls the producer, the heartbeat loop, or other viewers.

use moltwatch_common::events::LiveSnapshot;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Number of snapshots retained in the history ring
pub const HISTORY_CAPACITY: usize = 20;

/// Per-subscriber queue depth before messages are dropped for that subscriber
const SUBSCRIBER_QUEUE_CAPACITY: usize = 16;

/// Heartbeat interval for re-delivering the current snapshot
const BROADCAST_INTERVAL: Duration = Duration::from_millis(500);

/// Per-viewer handle returned by [`LiveBus::subscribe`]
pub struct Subscriber {
    pub id: Uuid,
    pub rx: mpsc::Receiver<LiveSnapshot>,
}

struct BusInner {
    latest: Option<LiveSnapshot>,
    history: VecDeque<LiveSnapshot>,
    subscribers: HashMap<Uuid, mpsc::Sender<LiveSnapshot>>,
}

/// Fan-out broadcaster for the live feed
pub struct LiveBus {
    inner: Mutex<BusInner>,
}

impl LiveBus {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BusInner {
                latest: None,
                history: VecDeque::with_capacity(HISTORY_CAPACITY),
                subscribers: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BusInner> {
        self.inner.lock().expect("live bus mutex poisoned")
    }

    /// Publish a snapshot: update latest, record history, fan out.
    ///
    /// History evicts oldest-first at capacity. Enqueue never blocks; closed
    /// subscriber channels are pruned here as a side effect.
    pub fn publish(&self, snapshot: LiveSnapshot) {
        let mut inner = self.lock();

        inner.latest = Some(snapshot.clone());
        if inner.history.len() == HISTORY_CAPACITY {
            inner.history.pop_front();
        }
        inner.history.push_back(snapshot.clone());

        Self::deliver(&mut inner, &snapshot);
    }

    /// Register a new subscriber.
    ///
    /// If a latest snapshot exists it is enqueued before registration, so it
    /// is always the subscriber's first message regardless of concurrent
    /// publishes.
    pub fn subscribe(&self) -> Subscriber {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        let id = Uuid::new_v4();

        let mut inner = self.lock();
        if let Some(latest) = &inner.latest {
            // Freshly created queue, cannot be full
            let _ = tx.try_send(latest.clone());
        }
        inner.subscribers.insert(id, tx);
        info!("live subscriber {} registered ({} total)", id, inner.subscribers.len());

        Subscriber { id, rx }
    }

    /// Remove a subscriber. Idempotent; safe to race with publish.
    pub fn unsubscribe(&self, id: Uuid) {
        let mut inner = self.lock();
        if inner.subscribers.remove(&id).is_some() {
            info!("live subscriber {} unregistered ({} left)", id, inner.subscribers.len());
        }
    }

    /// Current snapshot, if any sample has been published yet
    pub fn latest(&self) -> Option<LiveSnapshot> {
        self.lock().latest.clone()
    }

    /// Published history, oldest to newest, at most [`HISTORY_CAPACITY`] entries
    pub fn history(&self) -> Vec<LiveSnapshot> {
        self.lock().history.iter().cloned().collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn deliver(inner: &mut BusInner, snapshot: &LiveSnapshot) {
        let mut stale = Vec::new();
        for (id, tx) in &inner.subscribers {
            match tx.try_send(snapshot.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // Slow consumer: drop for this subscriber only
                    debug!("live subscriber {} queue full, dropping snapshot", id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    stale.push(*id);
                }
            }
        }
        for id in stale {
            inner.subscribers.remove(&id);
            debug!("pruned closed live subscriber {}", id);
        }
    }

    /// Start the heartbeat loop: every tick, re-deliver the current latest
    /// snapshot to all subscribers, whether or not a new publish occurred.
    ///
    /// Returns a handle carrying the shutdown signal for the loop.
    pub fn start(self: &Arc<Self>) -> BroadcastHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let bus = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(BROADCAST_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let mut inner = bus.lock();
                        if let Some(latest) = inner.latest.clone() {
                            if !inner.subscribers.is_empty() {
                                LiveBus::deliver(&mut inner, &latest);
                            }
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("live broadcast loop stopped");
        });

        info!("live broadcast loop started ({}ms interval)", BROADCAST_INTERVAL.as_millis());
        BroadcastHandle { shutdown_tx, task }
    }
}

impl Default for LiveBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to the running broadcast loop
pub struct BroadcastHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl BroadcastHandle {
    /// Signal the loop to stop and wait for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}

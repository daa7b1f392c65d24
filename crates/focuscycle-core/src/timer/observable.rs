//! Replay-latest values.
//!
//! An [`Observable`] holds the current value of one engine output. New
//! subscribers receive that value first and then every later change, in
//! publication order. A subscriber that falls behind skips straight to the
//! newest value instead of replaying the backlog.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug)]
struct Shared<T> {
    current: T,
    tx: broadcast::Sender<T>,
}

#[derive(Debug)]
pub struct Observable<T> {
    shared: Mutex<Shared<T>>,
}

impl<T: Clone + Send + 'static> Observable<T> {
    pub fn new(initial: T, capacity: usize) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Arc::new(Self {
            shared: Mutex::new(Shared {
                current: initial,
                tx,
            }),
        })
    }

    pub fn get(&self) -> T {
        self.lock().current.clone()
    }

    /// Store `value` and notify subscribers.
    pub fn publish(&self, value: T) {
        let mut shared = self.lock();
        shared.current = value.clone();
        // No receivers is fine; the value is still retained for late subscribers.
        let _ = shared.tx.send(value);
    }

    /// Publish only when `value` differs from the current one.
    pub fn publish_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        let mut shared = self.lock();
        if shared.current == value {
            return false;
        }
        shared.current = value.clone();
        let _ = shared.tx.send(value);
        true
    }

    pub fn subscribe(self: &Arc<Self>) -> Subscription<T> {
        let (current, rx) = self.snapshot();
        Subscription {
            pending: Some(current),
            rx,
            source: Arc::downgrade(self),
        }
    }

    /// Current value plus a receiver positioned right after it, taken under
    /// one lock so nothing is missed or repeated.
    fn snapshot(&self) -> (T, broadcast::Receiver<T>) {
        let shared = self.lock();
        (shared.current.clone(), shared.tx.subscribe())
    }

    fn lock(&self) -> MutexGuard<'_, Shared<T>> {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A stream of values from an [`Observable`], starting with its current one.
///
/// Holds the source weakly, so the stream ends once its owner is dropped.
/// A subscriber that lags past the channel capacity resumes at the latest
/// value; the values it missed are not delivered.
#[derive(Debug)]
pub struct Subscription<T> {
    pending: Option<T>,
    rx: broadcast::Receiver<T>,
    source: Weak<Observable<T>>,
}

impl<T: Clone + Send + 'static> Subscription<T> {
    /// Next value. Returns `None` once the engine is gone and the stream has
    /// drained.
    pub async fn recv(&mut self) -> Option<T> {
        if let Some(value) = self.pending.take() {
            return Some(value);
        }
        match self.rx.recv().await {
            Ok(value) => Some(value),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "subscriber lagged, resyncing to latest value");
                self.resync()
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Next value if one is ready, without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        if let Some(value) = self.pending.take() {
            return Some(value);
        }
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(broadcast::error::TryRecvError::Lagged(_)) => self.resync(),
            Err(_) => None,
        }
    }

    /// The newest value, regardless of what this subscription has consumed.
    pub fn latest(&self) -> Option<T> {
        self.source.upgrade().map(|source| source.get())
    }

    fn resync(&mut self) -> Option<T> {
        let source = self.source.upgrade()?;
        let (current, rx) = source.snapshot();
        self.rx = rx;
        Some(current)
    }
}

use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Lifecycle of a cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Fresh,
    Stale,
}

struct CacheValue<V> {
    value: V,
    stored_at: Instant,
}

/// Single-slot cache whose value goes stale after a fixed time-to-live.
///
/// Staleness is checked lazily when the slot is read. Holding the guard returned by
/// [`TimedSlot::lock`] excludes every other reader and writer, so a caller can check, rebuild and
/// replace the value as one step.
pub struct TimedSlot<V> {
    inner: Mutex<Option<CacheValue<V>>>,
    ttl: Duration,
}

impl<V: Clone> TimedSlot<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(None),
            ttl,
        }
    }

    pub async fn lock(&self) -> SlotGuard<'_, V> {
        SlotGuard {
            slot: self.inner.lock().await,
            ttl: self.ttl,
        }
    }

    pub async fn state(&self) -> CacheState {
        self.lock().await.state()
    }

    pub async fn clear(&self) {
        let mut slot = self.inner.lock().await;
        *slot = None;
        debug!("Cache CLEAR");
    }
}

pub struct SlotGuard<'a, V> {
    slot: MutexGuard<'a, Option<CacheValue<V>>>,
    ttl: Duration,
}

impl<V: Clone> SlotGuard<'_, V> {
    pub fn state(&self) -> CacheState {
        match self.slot.as_ref() {
            None => CacheState::Empty,
            Some(entry) if entry.stored_at.elapsed() < self.ttl => CacheState::Fresh,
            Some(_) => CacheState::Stale,
        }
    }

    /// The cached value, unless it is missing or stale.
    pub fn fresh(&self) -> Option<V> {
        match self.state() {
            CacheState::Fresh => {
                debug!("Cache HIT");
                self.slot.as_ref().map(|entry| entry.value.clone())
            }
            CacheState::Stale => {
                debug!("Cache entry expired");
                None
            }
            CacheState::Empty => {
                debug!("Cache MISS");
                None
            }
        }
    }

    pub fn put(&mut self, value: V) {
        debug!("Cache PUT");
        *self.slot = Some(CacheValue {
            value,
            stored_at: Instant::now(),
        });
    }
}

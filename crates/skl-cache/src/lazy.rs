use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use serde::Serialize;
use tracing::debug;

use crate::error::{CacheError, CacheResult};

type Slot<V> = Arc<Mutex<Option<V>>>;

/// Hit/miss counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

/// Keyed lookup that computes a value at most once per resident key.
///
/// Each key owns a slot mutex. The first caller holds it while computing;
/// concurrent callers for the same key block on it and then read the stored
/// value. A failed computation leaves the slot empty so the next caller
/// retries. An evicted key simply computes again.
///
/// A computation that panics poisons only its slot; the slot is still empty
/// and is reused by the next caller.
pub struct LazyCache<K: Hash + Eq, V> {
    slots: Mutex<LruCache<K, Slot<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K: Hash + Eq + Clone, V: Clone> LazyCache<K, V> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            slots: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn with_capacity(capacity: usize) -> CacheResult<Self> {
        NonZeroUsize::new(capacity)
            .map(Self::new)
            .ok_or(CacheError::ZeroCapacity)
    }

    /// Return the cached value for `key`, or run `compute` and store its
    /// result.
    pub fn get_or_try_compute<E>(
        &self,
        key: &K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        let slot = {
            let mut slots = lock(&self.slots);
            Arc::clone(slots.get_or_insert(key.clone(), || Arc::new(Mutex::new(None))))
        };
        let mut value = lock(&slot);
        if let Some(v) = value.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(v.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let computed = compute()?;
        *value = Some(computed.clone());
        Ok(computed)
    }

    pub fn get_or_compute(&self, key: &K, compute: impl FnOnce() -> V) -> V {
        match self.get_or_try_compute::<std::convert::Infallible>(key, || Ok(compute())) {
            Ok(v) => v,
            Err(never) => match never {},
        }
    }

    /// The stored value for `key`, without computing or touching recency.
    /// Blocks while a computation for `key` is in flight.
    pub fn peek(&self, key: &K) -> Option<V> {
        let slot = lock(&self.slots).peek(key).map(Arc::clone)?;
        let value = lock(&slot);
        value.clone()
    }

    pub fn invalidate(&self, key: &K) -> bool {
        lock(&self.slots).pop(key).is_some()
    }

    pub fn clear(&self) {
        let mut slots = lock(&self.slots);
        let dropped = slots.len();
        slots.clear();
        debug!(dropped, "cache cleared");
    }

    /// Number of resident keys, including ones still computing.
    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        lock(&self.slots).cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        let slots = lock(&self.slots);
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: slots.len(),
            capacity: slots.cap().get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn computes_once_then_hits() {
        let cache = LazyCache::with_capacity(4).unwrap();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let v = cache.get_or_compute(&"a", || {
                calls.fetch_add(1, Ordering::SeqCst);
                7
            });
            assert_eq!(v, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.len), (2, 1, 1));
    }

    #[test]
    fn zero_capacity_rejected() {
        assert_eq!(
            LazyCache::<u32, u32>::with_capacity(0).err(),
            Some(CacheError::ZeroCapacity)
        );
    }

    #[test]
    fn failed_computation_is_retried() {
        let cache: LazyCache<u8, u8> = LazyCache::with_capacity(2).unwrap();
        let err: Result<u8, &str> = cache.get_or_try_compute(&1, || Err("boom"));
        assert_eq!(err, Err("boom"));
        assert_eq!(cache.peek(&1), None);
        assert_eq!(cache.get_or_try_compute::<&str>(&1, || Ok(9)), Ok(9));
        assert_eq!(cache.peek(&1), Some(9));
    }

    #[test]
    fn least_recently_used_key_is_evicted() {
        let cache = LazyCache::with_capacity(2).unwrap();
        cache.get_or_compute(&1, || "one");
        cache.get_or_compute(&2, || "two");
        cache.get_or_compute(&1, || "one");
        cache.get_or_compute(&3, || "three");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.peek(&2), None);
        assert_eq!(cache.peek(&1), Some("one"));
        assert_eq!(cache.capacity(), 2);
    }

    #[test]
    fn invalidate_and_clear() {
        let cache = LazyCache::with_capacity(8).unwrap();
        for k in 0..4 {
            cache.get_or_compute(&k, || k * 10);
        }
        assert!(cache.invalidate(&2));
        assert!(!cache.invalidate(&2));
        assert_eq!(cache.len(), 3);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn single_computation_under_contention() {
        let cache = Arc::new(LazyCache::with_capacity(4).unwrap());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(16));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_or_compute(&"key", || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        42u64
                    })
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_computation_does_not_wedge_the_key() {
        let cache = Arc::new(LazyCache::<u8, u8>::with_capacity(2).unwrap());
        let c = Arc::clone(&cache);
        let joined = thread::spawn(move || c.get_or_compute(&5, || panic!("compute failed"))).join();
        assert!(joined.is_err());
        assert_eq!(cache.get_or_compute(&5, || 1), 1);
    }
}

//! Bounded, time-expiring cache for imported key handles.
//!
//! Importing a key from interchange form costs a parse + validation on every
//! message; within a session the same handful of public keys recurs, so a
//! small LRU cache amortises the cost.  The cache knows nothing about crypto
//! semantics and is never the sole source of truth — re-import from the
//! codec always produces an equivalent handle.
//!
//! - Capacity bound: least-recently-used entry is evicted on insert.
//! - TTL: an entry older than the TTL is treated as absent even if still
//!   physically cached, and evicted on access.
//! - `clear()` is invoked on logout so no key material outlives the session.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use tracing::debug;

pub const DEFAULT_CAPACITY: usize = 100;
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

struct Entry<T> {
    value: T,
    last_used: Instant,
}

/// Shared key-handle cache.  Interior mutability: callers hold `&KeyCache`
/// from any thread; each operation takes the single internal lock, which is
/// enough to keep LRU order consistent (no cross-entry locking needed).
pub struct KeyCache<T> {
    inner: Mutex<LruCache<String, Entry<T>>>,
    ttl: Duration,
}

impl<T: Clone> KeyCache<T> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("max(1) is non-zero");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Return the cached handle for `fingerprint` if present and fresh.
    /// A hit refreshes both the TTL stamp and the LRU position; a stale
    /// entry is evicted and reported absent.
    pub fn get(&self, fingerprint: &str) -> Option<T> {
        let mut cache = self.lock();
        match cache.get_mut(fingerprint) {
            None => return None,
            Some(entry) => {
                if entry.last_used.elapsed() <= self.ttl {
                    entry.last_used = Instant::now();
                    return Some(entry.value.clone());
                }
            }
        }
        debug!(fingerprint, "key cache entry expired");
        cache.pop(fingerprint);
        None
    }

    /// Insert a handle, evicting the least-recently-used entry if at
    /// capacity.
    pub fn put(&self, fingerprint: String, handle: T) {
        let mut cache = self.lock();
        if let Some((evicted, _)) = cache.push(
            fingerprint,
            Entry { value: handle, last_used: Instant::now() },
        ) {
            debug!(fingerprint = %evicted, "key cache evicted LRU entry");
        }
    }

    /// Drop all entries.  Called on logout.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, Entry<T>>> {
        // A poisoned lock only means another thread panicked mid-operation;
        // the LRU structure itself stays valid, so recover rather than
        // propagate the panic.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Clone> Default for KeyCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// Per-key mutual exclusion for a single process. Entries are created
/// lazily on first use and never removed.
pub struct KeyedLock<K> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash> KeyedLock<K> {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Runs `action` with at most one concurrent execution per distinct key.
    /// Same-key callers queue in lock-request order (tokio's mutex is fair);
    /// distinct keys never contend. The lock is released on every exit path,
    /// so a failed `action` leaves the key acquirable and its result is
    /// returned untouched.
    pub async fn acquire<F, Fut, R>(&self, key: K, action: F) -> R
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
    {
        let mutex = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let _guard = mutex.lock().await;
        action().await
    }
}

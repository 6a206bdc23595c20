//! In-flight request coalescing.
//!
//! Concurrent calls with the same key share one execution of the request.
//! The entry for a key exists exactly while its request is running: a guard
//! owned by the shared future removes it when the request finishes or when
//! every caller has given up on it.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use tracing::trace;

type Flight<V> = Shared<BoxFuture<'static, V>>;
type Table<K, V> = Arc<Mutex<HashMap<K, (u64, WeakShared<BoxFuture<'static, V>>)>>>;

/// Shares in-flight requests between concurrent callers.
pub struct RequestCoalescer<K, V> {
    inflight: Table<K, V>,
    generation: Arc<AtomicU64>,
}

impl<K, V> Clone for RequestCoalescer<K, V> {
    fn clone(&self) -> Self {
        Self {
            inflight: Arc::clone(&self.inflight),
            generation: Arc::clone(&self.generation),
        }
    }
}

impl<K, V> Default for RequestCoalescer<K, V> {
    fn default() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<K, V> std::fmt::Debug for RequestCoalescer<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoalescer").finish_non_exhaustive()
    }
}

/// Removes its table entry on drop, unless a newer request took the key.
struct FlightGuard<K: Eq + Hash, V> {
    table: Table<K, V>,
    key: K,
    generation: u64,
}

impl<K: Eq + Hash, V> Drop for FlightGuard<K, V> {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if table.get(&self.key).is_some_and(|(g, _)| *g == self.generation) {
            table.remove(&self.key);
        }
    }
}

impl<K, V> RequestCoalescer<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the request for `key`, or join the one already running. `make`
    /// is only called when no request for `key` is in flight.
    pub async fn run<F, Fut>(&self, key: K, make: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let flight = self.join_or_start(key, make);
        flight.await
    }

    fn join_or_start<F, Fut>(&self, key: K, make: F) -> Flight<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let mut table = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(flight) = table.get(&key).and_then(|(_, weak)| weak.upgrade()) {
            trace!(subsystem = "sync", component = "coalescer", "Joined in-flight request");
            return flight;
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let guard = FlightGuard {
            table: Arc::clone(&self.inflight),
            key: key.clone(),
            generation,
        };
        let request = make();
        let flight = async move {
            let _guard = guard;
            request.await
        }
        .boxed()
        .shared();
        if let Some(weak) = flight.downgrade() {
            table.insert(key, (generation, weak));
        }
        flight
    }

    /// Number of keys with a request in flight.
    pub fn in_flight(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

//! Request coalescing for concurrent cache misses.
//!
//! The first caller for a key starts the work; anyone asking for the same key
//! while it is running awaits the same shared future instead of issuing a
//! second request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::debug;

struct Flight<V: Clone> {
    id: u64,
    future: Shared<BoxFuture<'static, V>>,
    forgotten: Arc<AtomicBool>,
}

/// Result of a coalesced call.
#[derive(Debug)]
pub struct FlightOutcome<V> {
    pub value: V,
    /// This caller started the work.
    pub leader: bool,
    /// The flight was forgotten (its key invalidated) while running.
    pub forgotten: bool,
}

impl<V> FlightOutcome<V> {
    /// Only the leader of a flight nobody invalidated should persist the result.
    pub fn should_store(&self) -> bool {
        self.leader && !self.forgotten
    }
}

pub struct SingleFlight<V: Clone> {
    next_id: AtomicU64,
    inflight: Mutex<HashMap<String, Flight<V>>>,
}

impl<V: Clone + Send + Sync + 'static> Default for SingleFlight<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync + 'static> SingleFlight<V> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Run `work` for `key`, or join the call already in flight.
    pub async fn run<F>(&self, key: &str, work: F) -> FlightOutcome<V>
    where
        F: FnOnce() -> BoxFuture<'static, V>,
    {
        self.run_and_commit(key, work, |_| {}).await
    }

    /// Like `run`, but the leader hands the result to `commit` before the
    /// flight is unregistered. `commit` runs under the map lock and is
    /// skipped once the flight has been forgotten, so a concurrent `forget`
    /// lands either before the commit (no commit) or after it.
    pub async fn run_and_commit<F, C>(&self, key: &str, work: F, commit: C) -> FlightOutcome<V>
    where
        F: FnOnce() -> BoxFuture<'static, V>,
        C: FnOnce(&V),
    {
        let (id, future, forgotten, leader) = {
            let mut inflight = self.inflight.lock().await;
            match inflight.get(key) {
                Some(flight) => {
                    debug!(key = key, "Joining in-flight request");
                    (flight.id, flight.future.clone(), flight.forgotten.clone(), false)
                }
                None => {
                    let flight = Flight {
                        id: self.next_id.fetch_add(1, Ordering::Relaxed),
                        future: work().shared(),
                        forgotten: Arc::new(AtomicBool::new(false)),
                    };
                    let joined = (flight.id, flight.future.clone(), flight.forgotten.clone(), true);
                    inflight.insert(key.to_string(), flight);
                    joined
                }
            }
        };

        let value = future.await;

        {
            let mut inflight = self.inflight.lock().await;
            if inflight.get(key).map(|f| f.id) == Some(id) {
                if leader && !forgotten.load(Ordering::SeqCst) {
                    commit(&value);
                }
                inflight.remove(key);
            }
        }

        FlightOutcome {
            value,
            leader,
            forgotten: forgotten.load(Ordering::SeqCst),
        }
    }

    /// Detach any in-flight call for `key`; later callers start fresh.
    pub async fn forget(&self, key: &str) {
        if let Some(flight) = self.inflight.lock().await.remove(key) {
            debug!(key = key, "Forgetting in-flight request");
            flight.forgotten.store(true, Ordering::SeqCst);
        }
    }

    /// Forget every in-flight call whose key starts with `prefix`.
    pub async fn forget_prefix(&self, prefix: &str) {
        self.inflight.lock().await.retain(|key, flight| {
            if key.starts_with(prefix) {
                flight.forgotten.store(true, Ordering::SeqCst);
                false
            } else {
                true
            }
        });
    }

    pub async fn in_flight(&self) -> usize {
        self.inflight.lock().await.len()
    }
}

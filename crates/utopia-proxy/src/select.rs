//! Backend-selection strategies.
//!
//! The roster itself is owned by the caller (the supervisor, shared with the
//! proxy via a guarded snapshot); a [`Selector`] only owns the mutable state a
//! strategy needs between calls — the round-robin cursor — and is handed the
//! current roster slice on every `select()` call.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

use utopia_core::{Strategy, WorkerHandle};

/// Picks one [`WorkerHandle`] per request according to a configured [`Strategy`].
pub struct Selector {
    strategy: Strategy,
    cursor: AtomicUsize,
}

impl Selector {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Choose a worker from `roster`. Returns `None` iff `roster` is empty —
    /// the proxy handler turns that into a `502` without ever calling a
    /// strategy against zero workers.
    pub fn select(&self, roster: &[Arc<WorkerHandle>]) -> Option<Arc<WorkerHandle>> {
        if roster.is_empty() {
            return None;
        }

        match self.strategy {
            Strategy::RoundRobin => {
                let len = roster.len();
                let idx = self.cursor.fetch_add(1, Ordering::SeqCst) % len;
                Some(Arc::clone(&roster[idx]))
            }
            Strategy::LeastConnections => {
                // `min_by_key` returns the first minimal element on ties, which
                // matches "ties broken by first occurrence in the roster".
                roster.iter().min_by_key(|w| w.active_connections()).cloned()
            }
            Strategy::Random => {
                let idx = rand::thread_rng().gen_range(0..roster.len());
                Some(Arc::clone(&roster[idx]))
            }
        }
    }
}

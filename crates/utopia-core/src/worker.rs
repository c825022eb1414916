//! `WorkerHandle` — the stable, proxy-shared descriptor for one cluster worker.
//!
//! The connection counter lives directly on the handle as an atomic rather than
//! in a side map keyed by handle identity, so the proxy can hold a plain `Arc`
//! clone without needing to agree with the supervisor on object identity.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Stable, shared descriptor for one supervised worker.
///
/// `id` and `port` never change across restarts. `active_connections` is mutated
/// only by the reverse proxy; the supervisor never touches it.
#[derive(Debug)]
pub struct WorkerHandle {
    id: u16,
    port: u16,
    active_connections: AtomicUsize,
}

impl WorkerHandle {
    /// Create a new handle for worker `id` bound to `port`, with zero active connections.
    pub fn new(id: u16, port: u16) -> Arc<Self> {
        Arc::new(Self {
            id,
            port,
            active_connections: AtomicUsize::new(0),
        })
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Current in-flight connection count. Only a snapshot under concurrent access.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }

    /// Increment the connection counter; called before the upstream request is issued.
    pub fn inc_connections(&self) {
        self.active_connections.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the connection counter; called in the guaranteed cleanup step.
    pub fn dec_connections(&self) {
        self.active_connections.fetch_sub(1, Ordering::SeqCst);
    }

    /// Loopback base URL for this worker, e.g. `http://127.0.0.1:8081`.
    pub fn upstream_base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

/// RAII guard that increments a worker's connection counter on creation and
/// decrements it on drop, guaranteeing the release step runs on every code path
/// (including early returns and panics unwinding through the proxy handler).
pub struct ConnectionGuard {
    handle: Arc<WorkerHandle>,
}

impl ConnectionGuard {
    pub fn new(handle: Arc<WorkerHandle>) -> Self {
        handle.inc_connections();
        Self { handle }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.handle.dec_connections();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_handle_starts_at_zero() {
        let handle = WorkerHandle::new(0, 8080);
        assert_eq!(handle.active_connections(), 0);
        assert_eq!(handle.id(), 0);
        assert_eq!(handle.port(), 8080);
    }

    #[test]
    fn guard_increments_and_decrements() {
        let handle = WorkerHandle::new(1, 8081);
        {
            let _guard = ConnectionGuard::new(handle.clone());
            assert_eq!(handle.active_connections(), 1);
        }
        assert_eq!(handle.active_connections(), 0);
    }

    #[test]
    fn guard_releases_on_early_return() {
        fn do_work(handle: Arc<WorkerHandle>) -> Result<(), ()> {
            let _guard = ConnectionGuard::new(handle.clone());
            Err(())
        }

        let handle = WorkerHandle::new(2, 8082);
        let _ = do_work(handle.clone());
        assert_eq!(handle.active_connections(), 0);
    }

    #[test]
    fn upstream_url_is_loopback() {
        let handle = WorkerHandle::new(0, 9000);
        assert_eq!(handle.upstream_base_url(), "http://127.0.0.1:9000");
    }
}

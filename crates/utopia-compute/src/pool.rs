//! `ComputePool` — a fixed set of long-lived executor threads with round-robin
//! dispatch and inline fallback when every executor is busy.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::JoinHandle;

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::ComputeError;
use crate::registry::HandlerRegistry;

enum ExecutorMessage {
    Task {
        handler_tag: String,
        payload: Value,
        reply: oneshot::Sender<Result<Value, ComputeError>>,
    },
    Shutdown,
}

/// Scope guard that clears an executor's `busy` flag on drop, so the flag is
/// released on every code path out of `submit` — including the error path.
struct BusyGuard<'a> {
    busy: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn new(busy: &'a AtomicBool) -> Self {
        Self { busy }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

struct ExecutorSlot {
    inbox: std::sync::mpsc::Sender<ExecutorMessage>,
    busy: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

/// Bounded pool of isolated compute executors.
///
/// Each executor is a dedicated OS thread (not a tokio task) so CPU-bound
/// handlers never starve the async runtime that serves the reverse proxy.
/// `submit` favors latency over queueing: if every executor is busy it simply
/// runs the handler inline on the caller's task instead of waiting.
pub struct ComputePool {
    executors: Vec<ExecutorSlot>,
    cursor: AtomicUsize,
    registry: Arc<HandlerRegistry>,
}

impl ComputePool {
    /// Spawn `count` executor threads, each running `registry`. Returns once every
    /// executor has signalled it is ready to receive tasks.
    pub async fn initialize(count: usize, registry: HandlerRegistry) -> Self {
        let registry = Arc::new(registry);
        let mut executors = Vec::with_capacity(count);
        let mut ready_rxs = Vec::with_capacity(count);

        for id in 0..count {
            let (inbox, rx) = std::sync::mpsc::channel::<ExecutorMessage>();
            let (ready_tx, ready_rx) = oneshot::channel::<()>();
            let busy = Arc::new(AtomicBool::new(false));
            let executor_registry = registry.clone();

            let thread = std::thread::Builder::new()
                .name(format!("utopia-executor-{id}"))
                .spawn(move || run_executor(id, rx, executor_registry, ready_tx))
                .expect("failed to spawn compute executor thread");

            executors.push(ExecutorSlot {
                inbox,
                busy,
                thread: Some(thread),
            });
            ready_rxs.push(ready_rx);
        }

        for ready_rx in ready_rxs {
            // The thread closes its ready channel on spawn failure paths too;
            // an error here just means the executor is already gone.
            let _ = ready_rx.await;
        }

        Self {
            executors,
            cursor: AtomicUsize::new(0),
            registry,
        }
    }

    /// Number of executor threads in the pool.
    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }

    /// Dispatch `payload` to the handler registered under `handler_tag`.
    ///
    /// Scans executors starting at the shared cursor for the first idle one; if
    /// found, the task runs there and the result comes back over a reply
    /// channel. If none are idle, the handler runs inline on the calling task.
    pub async fn submit(&self, handler_tag: &str, payload: Value) -> Result<Value, ComputeError> {
        let len = self.executors.len();

        for offset in 0..len {
            let idx = (self.cursor.load(Ordering::SeqCst) + offset) % len;
            let slot = &self.executors[idx];

            if slot
                .busy
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                self.cursor.store((idx + 1) % len, Ordering::SeqCst);
                let _release = BusyGuard::new(&slot.busy);

                let (reply_tx, reply_rx) = oneshot::channel();
                let message = ExecutorMessage::Task {
                    handler_tag: handler_tag.to_string(),
                    payload,
                    reply: reply_tx,
                };

                if slot.inbox.send(message).is_err() {
                    warn!(executor = idx, "executor inbox closed; handler exited early");
                    return Err(ComputeError::ExecutorLost(handler_tag.to_string()));
                }

                return reply_rx
                    .await
                    .unwrap_or_else(|_| Err(ComputeError::ExecutorLost(handler_tag.to_string())));
            }
        }

        debug!(handler_tag, "no idle executor, running inline");
        self.registry.dispatch(handler_tag, payload)
    }

    /// Tell every executor to terminate and join its thread.
    pub async fn shutdown(&mut self) {
        for slot in &self.executors {
            let _ = slot.inbox.send(ExecutorMessage::Shutdown);
        }
        for slot in &mut self.executors {
            if let Some(thread) = slot.thread.take() {
                let _ = tokio::task::spawn_blocking(move || thread.join()).await;
            }
        }
    }
}

fn run_executor(
    id: usize,
    inbox: std::sync::mpsc::Receiver<ExecutorMessage>,
    registry: Arc<HandlerRegistry>,
    ready: oneshot::Sender<()>,
) {
    let _ = ready.send(());
    debug!(executor = id, "executor ready");

    while let Ok(message) = inbox.recv() {
        match message {
            ExecutorMessage::Task { handler_tag, payload, reply } => {
                let result = registry.dispatch(&handler_tag, payload);
                let _ = reply.send(result);
            }
            ExecutorMessage::Shutdown => break,
        }
    }

    debug!(executor = id, "executor stopped");
}

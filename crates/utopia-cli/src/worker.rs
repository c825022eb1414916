//! Minimal demonstration HTTP server run by a process once the handshake
//! dispatches it into worker mode (see [`utopia_core::handshake`]).
//!
//! This is explicitly outside the CORE the rest of the crate implements — the
//! reverse proxy and cluster supervisor are server-agnostic — but the
//! supervisor needs something real to spawn and the proxy something real to
//! forward to, so every worker runs this.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::info;

use utopia_compute::{ComputePool, HandlerRegistry};

#[derive(Clone)]
struct WorkerState {
    id: u16,
    port: u16,
    compute: Arc<ComputePool>,
}

/// Bind `0.0.0.0:port` and serve until the process is terminated by the
/// supervisor. Never returns under normal operation.
pub async fn run(id: u16, port: u16) -> anyhow::Result<()> {
    let mut registry = HandlerRegistry::new();
    registry.register("square", |payload: Value| {
        let n = payload
            .get("n")
            .and_then(Value::as_i64)
            .ok_or_else(|| "expected { \"n\": <integer> }".to_string())?;
        Ok(serde_json::json!({ "result": n * n }))
    });

    let compute = Arc::new(ComputePool::initialize(2, registry).await);
    let state = WorkerState { id, port, compute };

    let app = Router::new()
        .route("/", get(root))
        .route("/echo", post(echo))
        .route("/compute/square", post(compute_square))
        .layer(axum::extract::DefaultBodyLimit::max(32 * 1024 * 1024))
        .with_state(state);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(id, port, "worker listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Reports the worker's own port as plain text, used by the round-robin
/// end-to-end property: a client can tell which backend answered.
async fn root(State(state): State<WorkerState>) -> String {
    state.port.to_string()
}

/// Echoes the request body back unchanged, used by the body round-trip
/// property (sizes from 0 bytes to 16 MiB).
async fn echo(body: axum::body::Bytes) -> axum::body::Bytes {
    body
}

/// Offloads a toy CPU-bound computation to this worker's own compute pool,
/// demonstrating the pool's intended use: CPU work delegated off the
/// request-serving task.
async fn compute_square(State(state): State<WorkerState>, Json(payload): Json<Value>) -> Json<Value> {
    match state.compute.submit("square", payload).await {
        Ok(result) => Json(result),
        Err(e) => Json(serde_json::json!({ "error": e.to_string() })),
    }
}

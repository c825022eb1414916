//! End-to-end tests that bind real TCP listeners for both the proxy and a
//! handful of stand-in "worker" HTTP servers, and drive requests through
//! `reqwest` exactly as an external client would.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State as AxumState;
use axum::http::HeaderMap;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use utopia_core::{Strategy, WorkerHandle};
use utopia_proxy::ReverseProxy;
use utopia_proxy::server::Roster;

/// Start a minimal worker that answers `GET /` with its own port as plain
/// text and `POST /echo` by echoing the request body back untouched, mirroring
/// the demonstration worker described for the CLI's worker mode.
async fn spawn_echo_worker() -> u16 {
    #[derive(Clone)]
    struct WorkerState {
        port: u16,
    }

    async fn port_handler(AxumState(state): AxumState<WorkerState>) -> String {
        state.port.to_string()
    }

    async fn echo_handler(body: axum::body::Bytes) -> axum::body::Bytes {
        body
    }

    async fn headers_handler(headers: HeaderMap) -> String {
        let host = headers
            .get(axum::http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let x_a = headers.get("x-a").and_then(|v| v.to_str().ok()).unwrap_or("");
        let x_b = headers.get("x-b").and_then(|v| v.to_str().ok()).unwrap_or("");
        format!("{host}|{x_a}|{x_b}")
    }

    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let app = Router::new()
        .route("/", get(port_handler))
        .route("/echo", axum::routing::post(echo_handler))
        .route("/headers", get(headers_handler))
        .layer(axum::extract::DefaultBodyLimit::max(32 * 1024 * 1024))
        .with_state(WorkerState { port });

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    port
}

async fn spawn_stalling_worker() -> u16 {
    async fn stall_handler() -> &'static str {
        tokio::time::sleep(Duration::from_secs(5)).await;
        "done"
    }

    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let app = Router::new().route("/", get(stall_handler));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    port
}

async fn spawn_proxy(strategy: Strategy, worker_ports: &[u16]) -> (u16, Roster) {
    let roster: Roster = Arc::new(RwLock::new(
        worker_ports
            .iter()
            .enumerate()
            .map(|(id, &port)| WorkerHandle::new(id as u16, port))
            .collect(),
    ));

    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let proxy_port = listener.local_addr().unwrap().port();
    drop(listener);

    let proxy = ReverseProxy::new(proxy_port, strategy, roster.clone());
    tokio::spawn(async move {
        proxy.serve().await.unwrap();
    });

    // Give the listener a moment to bind before the first request races it.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (proxy_port, roster)
}

#[tokio::test]
async fn round_robin_cycles_through_workers_in_order() {
    let mut ports = Vec::new();
    for _ in 0..3 {
        ports.push(spawn_echo_worker().await);
    }

    let (proxy_port, _roster) = spawn_proxy(Strategy::RoundRobin, &ports).await;
    let client = reqwest::Client::new();

    let mut observed = Vec::new();
    for _ in 0..(ports.len() * 2) {
        let body = client
            .get(format!("http://127.0.0.1:{proxy_port}/"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        observed.push(body.parse::<u16>().unwrap());
    }

    let expected: Vec<u16> = ports.iter().copied().chain(ports.iter().copied()).collect();
    assert_eq!(observed, expected);
}

#[tokio::test]
async fn body_round_trips_bit_identically_for_various_sizes() {
    let port = spawn_echo_worker().await;
    let (proxy_port, _roster) = spawn_proxy(Strategy::RoundRobin, &[port]).await;
    let client = reqwest::Client::new();

    for size in [0usize, 1, 1024 * 1024, 16 * 1024 * 1024] {
        let body = vec![0xABu8; size];
        let response = client
            .post(format!("http://127.0.0.1:{proxy_port}/echo"))
            .body(body.clone())
            .send()
            .await
            .unwrap();
        let received = response.bytes().await.unwrap();
        assert_eq!(received.as_ref(), body.as_slice(), "mismatch at size {size}");
    }
}

#[tokio::test]
async fn host_header_is_replaced_but_others_pass_through() {
    let port = spawn_echo_worker().await;
    let (proxy_port, _roster) = spawn_proxy(Strategy::RoundRobin, &[port]).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://127.0.0.1:{proxy_port}/headers?q=1"))
        .header("Host", "example")
        .header("X-A", "1")
        .header("X-B", "2")
        .send()
        .await
        .unwrap();

    let body = response.text().await.unwrap();
    let parts: Vec<&str> = body.split('|').collect();
    assert_eq!(parts[1], "1");
    assert_eq!(parts[2], "2");
    // The worker's own HTTP client set Host to the upstream loopback address,
    // not the client-supplied "example".
    assert!(parts[0].starts_with("127.0.0.1:"));
    assert_ne!(parts[0], "example");
}

#[tokio::test]
async fn empty_roster_returns_bad_gateway() {
    let roster: Roster = Arc::new(RwLock::new(Vec::new()));
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let proxy_port = listener.local_addr().unwrap().port();
    drop(listener);

    let proxy = ReverseProxy::new(proxy_port, Strategy::RoundRobin, roster);
    tokio::spawn(async move {
        proxy.serve().await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{proxy_port}/"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    assert_eq!(response.text().await.unwrap(), "Bad Gateway");
}

#[tokio::test]
async fn least_connections_avoids_a_stalled_worker() {
    let stalling = spawn_stalling_worker().await;
    let healthy = spawn_echo_worker().await;

    let (proxy_port, roster) = spawn_proxy(Strategy::LeastConnections, &[stalling, healthy]).await;
    let client = reqwest::Client::new();

    // Tie up the stalling worker's single connection.
    let stuck_client = client.clone();
    let stuck_url = format!("http://127.0.0.1:{proxy_port}/");
    let stuck = tokio::spawn(async move { stuck_client.get(stuck_url).send().await });

    // Give the stuck request time to register its connection count.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(roster.read().await[0].active_connections(), 1);

    let response = client
        .get(format!("http://127.0.0.1:{proxy_port}/"))
        .send()
        .await
        .unwrap();
    let body = response.text().await.unwrap();
    assert_eq!(body.parse::<u16>().unwrap(), healthy);

    stuck.abort();
}

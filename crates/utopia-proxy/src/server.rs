//! `ReverseProxy` — the HTTP/1.1 server that sits in front of a cluster's
//! worker roster, selecting a backend per request and streaming the request
//! and response bodies through unbuffered.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::TryStreamExt;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::{info, warn};

use utopia_core::worker::ConnectionGuard;
use utopia_core::{Strategy, WorkerHandle};

use crate::error::ProxyError;
use crate::select::Selector;

const BAD_GATEWAY_BODY: &str = "Bad Gateway";

/// Snapshot of the cluster's live worker roster, shared with whoever mutates
/// it (the supervisor) behind a `tokio::sync::RwLock`.
pub type Roster = Arc<RwLock<Vec<Arc<WorkerHandle>>>>;

#[derive(Clone)]
struct ProxyState {
    roster: Roster,
    selector: Arc<Selector>,
    client: reqwest::Client,
}

/// HTTP/1.1 reverse proxy in front of a cluster's worker roster.
///
/// Binds its own listener on `0.0.0.0:port`; every accepted request is
/// handled independently of every other, so request N+1 may complete before
/// request N (see the crate's concurrency notes).
pub struct ReverseProxy {
    port: u16,
    state: ProxyState,
}

impl ReverseProxy {
    /// Build a proxy for `port` that selects backends from `roster` using
    /// `strategy`. Does not bind the listener yet — that happens in [`serve`](Self::serve).
    pub fn new(port: u16, strategy: Strategy, roster: Roster) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("reqwest client with default TLS backend must build");

        Self {
            port,
            state: ProxyState {
                roster,
                selector: Arc::new(Selector::new(strategy)),
                client,
            },
        }
    }

    /// Bind `0.0.0.0:port` and serve until the listener closes or a fatal I/O
    /// error occurs. A failed upstream request never aborts this loop — it
    /// is recovered locally as a `502` to the one client that hit it.
    pub async fn serve(self) -> Result<(), ProxyError> {
        let listener = TcpListener::bind(("0.0.0.0", self.port))
            .await
            .map_err(|source| ProxyError::Bind { port: self.port, source })?;

        info!(port = self.port, "reverse proxy listening");

        let app = Router::new().fallback(handle_request).with_state(self.state);

        axum::serve(listener, app).await.map_err(ProxyError::Serve)
    }
}

/// Select a backend, stream the request to it, and stream the response back.
/// Every selected worker's connection counter is incremented before the
/// upstream request is issued and decremented in a guaranteed cleanup step
/// via [`ConnectionGuard`], on every exit path including the error path.
async fn handle_request(State(state): State<ProxyState>, request: Request) -> Response {
    let roster = state.roster.read().await.clone();
    let Some(worker) = state.selector.select(&roster) else {
        warn!("no workers in roster, returning 502");
        return bad_gateway();
    };

    let _guard = ConnectionGuard::new(Arc::clone(&worker));

    match forward(&state.client, &worker, request).await {
        Ok(response) => response,
        Err(source) => {
            warn!(
                worker_id = worker.id(),
                worker_port = worker.port(),
                error = %source,
                "upstream request failed"
            );
            bad_gateway()
        }
    }
}

/// Issue the upstream HTTP request and stream its response back, copying the
/// method, request-target, and every header except `Host` in one direction,
/// and the status and all headers in the other.
async fn forward(
    client: &reqwest::Client,
    worker: &WorkerHandle,
    request: Request,
) -> reqwest::Result<Response> {
    let method = reqwest::Method::from_bytes(request.method().as_str().as_bytes())
        .unwrap_or(reqwest::Method::GET);
    let path_and_query = request.uri().path_and_query().map_or("/", |pq| pq.as_str());
    let url = format!("{}{path_and_query}", worker.upstream_base_url());

    let mut upstream_headers = reqwest::header::HeaderMap::new();
    for (name, value) in request.headers() {
        if *name == axum::http::header::HOST {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes()),
            reqwest::header::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            upstream_headers.append(name, value);
        }
    }

    let body_stream = request.into_body().into_data_stream().map_err(std::io::Error::other);
    let upstream_body = reqwest::Body::wrap_stream(body_stream);

    let upstream_response = client
        .request(method, url)
        .headers(upstream_headers)
        .body(upstream_body)
        .send()
        .await?;

    let status = StatusCode::from_u16(upstream_response.status().as_u16())
        .unwrap_or(StatusCode::BAD_GATEWAY);

    let mut response_headers = HeaderMap::new();
    for (name, value) in upstream_response.headers() {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            axum::http::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            response_headers.append(name, value);
        }
    }

    let body_stream = upstream_response.bytes_stream().map_err(std::io::Error::other);
    let body = Body::from_stream(body_stream);

    let mut response = Response::builder()
        .status(status)
        .body(body)
        .expect("a status code and a streamed body always build a valid response");
    *response.headers_mut() = response_headers;

    Ok(response)
}

fn bad_gateway() -> Response {
    (
        StatusCode::BAD_GATEWAY,
        [(axum::http::header::CONTENT_TYPE, "text/plain")],
        BAD_GATEWAY_BODY,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_roster_returns_bad_gateway() {
        let roster: Roster = Arc::new(RwLock::new(Vec::new()));
        let selector = Selector::new(Strategy::RoundRobin);

        let picked = selector.select(&roster.read().await.clone());
        assert!(picked.is_none());
    }

    #[test]
    fn bad_gateway_has_expected_status_and_body() {
        let response = bad_gateway();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}

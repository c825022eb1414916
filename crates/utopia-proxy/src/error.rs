//! Error taxonomy for the reverse proxy.

use thiserror::Error;

/// Errors that can abort [`crate::ReverseProxy::serve`] itself (not a single
/// proxied request — those are recovered locally and surfaced as `502`).
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to bind proxy listener on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("proxy listener error: {0}")]
    Serve(#[source] std::io::Error),
}

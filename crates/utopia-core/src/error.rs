//! Error types shared by the config and handshake modules.

use thiserror::Error;

/// Error raised when a [`crate::config::ScalingConfig`] violates one of its invariants.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `processes` was zero.
    #[error("processes must be at least 1")]
    ZeroProcesses,

    /// `basePort + processes - 1` overflowed past the valid TCP port range.
    #[error(
        "worker port range {base_port}..={last_port} exceeds 65535 for {processes} process(es)"
    )]
    PortRangeOverflow {
        base_port: u16,
        last_port: u32,
        processes: u32,
    },

    /// The proxy port collides with a worker port.
    #[error(
        "proxy port {proxy_port} collides with the worker port range {base_port}..{range_end}"
    )]
    ProxyPortCollision {
        proxy_port: u16,
        base_port: u16,
        range_end: u32,
    },
}

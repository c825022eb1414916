//! Error taxonomy for the cluster supervisor.

use thiserror::Error;

/// Errors raised while starting or running a [`crate::ClusterSupervisor`].
///
/// `SpawnFailure` is fatal: the operating system refused to start a child at
/// all, which means the supervisor's own environment is broken (missing
/// executable, exhausted process table, …) and restarting will not help.
/// A child that starts and later exits is not an error at this level — it is
/// handled internally via the restart loop.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to spawn worker {id} on port {port}: {source}")]
    SpawnFailure {
        id: u16,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to determine the current executable: {0}")]
    CurrentExe(#[source] std::io::Error),

    #[error("reverse proxy exited: {0}")]
    ProxyFailure(#[source] anyhow::Error),
}

//! The worker-handshake environment variables and the process-role discriminator.
//!
//! The supervisor sets three environment variables on every child it spawns; a
//! child reads them exactly once at startup via [`discover_role`] and never
//! re-queries them, so a worker can never recursively re-enter supervisor mode.

use std::env;

/// Stable worker id, set by the supervisor on every spawned child.
pub const ENV_PROCESS_ID: &str = "UTOPIA_PROCESS_ID";
/// TCP port the child must bind, set by the supervisor.
pub const ENV_WORKER_PORT: &str = "UTOPIA_WORKER_PORT";
/// Marks a child as a cluster worker for introspection. Always the literal `"worker"`.
pub const ENV_SCALING_MODE: &str = "UTOPIA_SCALING_MODE";

/// The literal value `UTOPIA_SCALING_MODE` is set to on a worker.
pub const SCALING_MODE_WORKER: &str = "worker";

/// Which role the current process should run as, decided once at entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessRole {
    /// Run as a supervised worker bound to `port` with stable identity `id`.
    Worker { id: u16, port: u16 },
    /// Run as the cluster supervisor.
    Supervisor,
}

/// Decide the process role by inspecting the handshake environment.
///
/// A process is a worker iff `UTOPIA_PROCESS_ID` and `UTOPIA_WORKER_PORT` are both
/// present and parse as the expected integer types. Any other state — including a
/// present-but-unparsable variable — falls back to supervisor mode, since a
/// malformed handshake cannot have come from a well-behaved supervisor spawn.
pub fn discover_role() -> ProcessRole {
    let id = env::var(ENV_PROCESS_ID).ok().and_then(|v| v.parse::<u16>().ok());
    let port = env::var(ENV_WORKER_PORT).ok().and_then(|v| v.parse::<u16>().ok());

    match (id, port) {
        (Some(id), Some(port)) => ProcessRole::Worker { id, port },
        _ => ProcessRole::Supervisor,
    }
}

/// Introspection surface for code running inside a worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Handshake {
    process_id: Option<u16>,
    worker_port: Option<u16>,
    scaling_mode: Option<bool>,
}

impl Handshake {
    /// Read the handshake environment variables once into an immutable snapshot.
    pub fn from_env() -> Self {
        Self {
            process_id: env::var(ENV_PROCESS_ID).ok().and_then(|v| v.parse().ok()),
            worker_port: env::var(ENV_WORKER_PORT).ok().and_then(|v| v.parse().ok()),
            scaling_mode: env::var(ENV_SCALING_MODE).ok().map(|v| v == SCALING_MODE_WORKER),
        }
    }

    /// True iff `UTOPIA_SCALING_MODE` is set at all.
    pub fn is_cluster_mode(&self) -> bool {
        self.scaling_mode.is_some()
    }

    /// True iff `UTOPIA_SCALING_MODE == "worker"`.
    pub fn is_worker(&self) -> bool {
        self.scaling_mode == Some(true)
    }

    /// The parsed `UTOPIA_WORKER_PORT`, if present and valid.
    pub fn worker_port(&self) -> Option<u16> {
        self.worker_port
    }

    /// The parsed `UTOPIA_PROCESS_ID`, if present and valid.
    pub fn process_id(&self) -> Option<u16> {
        self.process_id
    }
}

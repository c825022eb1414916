//! `ClusterSupervisor` — spawns, monitors, restarts, and optionally proxies a
//! fleet of worker child processes from a single parent.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use utopia_core::{ScalingConfig, WorkerHandle, handshake};
use utopia_proxy::ReverseProxy;

use crate::error::SupervisorError;
use crate::process::shutdown::terminate;

const RESTART_BACKOFF: Duration = Duration::from_secs(2);

/// One supervised worker slot. `pid` is read by [`shutdown`] and written only
/// by the slot's own restart loop, so the lock is held only for the instant
/// it takes to copy or overwrite the PID — never across an `.await`.
struct Slot {
    id: u16,
    port: u16,
    pid: StdMutex<Option<u32>>,
}

/// Owns the fleet of worker processes described by a [`ScalingConfig`] and,
/// if configured, the [`ReverseProxy`] in front of them.
pub struct ClusterSupervisor {
    config: ScalingConfig,
    argv: Vec<String>,
    slots: Arc<Vec<Slot>>,
    roster: Arc<RwLock<Vec<Arc<WorkerHandle>>>>,
}

impl ClusterSupervisor {
    /// Build a supervisor for `config`. `argv` is the target script/binary
    /// path (and any fixed arguments) passed to every spawned child verbatim.
    pub fn new(config: ScalingConfig, argv: Vec<String>) -> Self {
        let slots = (0..config.processes)
            .map(|id| Slot {
                id,
                port: config.worker_port(id),
                pid: StdMutex::new(None),
            })
            .collect();

        Self {
            config,
            argv,
            slots: Arc::new(slots),
            roster: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Spawn every worker, optionally start the reverse proxy, and block until
    /// a shutdown signal arrives. Does not return on success: the process
    /// exits from within this call once shutdown completes.
    pub async fn start(self) -> Result<(), SupervisorError> {
        let current_exe = std::env::current_exe().map_err(SupervisorError::CurrentExe)?;

        // Every spawn is a synchronous `fork`+`exec` under the hood, so a
        // plain loop already issues all N concurrently from the OS's point of
        // view; there is no `.await` between them to serialize on.
        for (index, slot) in self.slots.iter().enumerate() {
            let child = spawn_worker(&current_exe, &self.argv, slot.id, slot.port)?;
            *slot.pid.lock().unwrap() = child.id();
            self.roster
                .write()
                .await
                .push(WorkerHandle::new(slot.id, slot.port));

            tokio::spawn(supervise_slot(
                current_exe.clone(),
                self.argv.clone(),
                self.slots.clone(),
                index,
                child,
                self.roster.clone(),
            ));
        }

        info!(processes = self.config.processes, "all workers spawned");

        if self.config.enable_proxy {
            let proxy = ReverseProxy::new(
                self.config.proxy_port,
                self.config.strategy,
                self.roster.clone(),
            );
            let slots_for_proxy = self.slots.clone();
            tokio::spawn(async move {
                if let Err(e) = proxy.serve().await {
                    let proxy_failure = SupervisorError::ProxyFailure(anyhow::Error::new(e));
                    error!(error = %proxy_failure, "reverse proxy exited unexpectedly");
                    shutdown(&slots_for_proxy);
                    std::process::exit(1);
                }
            });
            info!(port = self.config.proxy_port, "reverse proxy listening");
        } else {
            for slot in self.slots.iter() {
                info!(id = slot.id, url = %format!("http://127.0.0.1:{}", slot.port), "worker ready");
            }
        }

        wait_for_shutdown_signal().await;
        info!("shutdown signal received, terminating workers");
        shutdown(&self.slots);
        std::process::exit(0);
    }
}

/// Sends a termination signal to every worker that currently has a live PID.
/// Does not wait for any child to exit — see [`terminate`].
fn shutdown(slots: &[Slot]) {
    for slot in slots {
        let pid = *slot.pid.lock().unwrap();
        if let Some(pid) = pid {
            if let Err(e) = terminate(pid) {
                warn!(id = slot.id, pid, error = %e, "failed to signal worker");
            }
        }
    }
}

fn spawn_worker(
    current_exe: &Path,
    argv: &[String],
    id: u16,
    port: u16,
) -> Result<Child, SupervisorError> {
    Command::new(current_exe)
        .args(argv)
        .env(handshake::ENV_PROCESS_ID, id.to_string())
        .env(handshake::ENV_WORKER_PORT, port.to_string())
        .env(handshake::ENV_SCALING_MODE, handshake::SCALING_MODE_WORKER)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| SupervisorError::SpawnFailure { id, port, source })
}

/// Waits on one worker's child handle for the remainder of the supervisor's
/// lifetime, restarting it with a fixed backoff every time it exits.
///
/// Exits only when `shutdown` has already fired a termination signal at this
/// slot's PID and the resulting process exit is observed — there is no
/// explicit stop flag, since the whole supervisor process exits immediately
/// after `shutdown` runs and this task is torn down along with it.
async fn supervise_slot(
    current_exe: PathBuf,
    argv: Vec<String>,
    slots: Arc<Vec<Slot>>,
    index: usize,
    mut child: Child,
    roster: Arc<RwLock<Vec<Arc<WorkerHandle>>>>,
) {
    let id = slots[index].id;
    let port = slots[index].port;

    loop {
        let status = child.wait().await;
        match status {
            Ok(status) => warn!(id, port, code = ?status.code(), "worker exited, restarting"),
            Err(e) => error!(id, port, error = %e, "failed to wait on worker"),
        }

        *slots[index].pid.lock().unwrap() = None;
        roster.write().await.retain(|h| h.id() != id);

        tokio::time::sleep(RESTART_BACKOFF).await;

        loop {
            match spawn_worker(&current_exe, &argv, id, port) {
                Ok(new_child) => {
                    *slots[index].pid.lock().unwrap() = new_child.id();
                    roster.write().await.push(WorkerHandle::new(id, port));
                    child = new_child;
                    break;
                }
                Err(e) => {
                    error!(id, port, error = %e, "respawn failed, retrying");
                    tokio::time::sleep(RESTART_BACKOFF).await;
                }
            }
        }
    }
}

/// Resolves once `SIGINT` arrives (all platforms) or `SIGTERM` arrives
/// (non-Windows).
#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

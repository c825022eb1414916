//! Immediate, non-blocking termination of a live worker process by PID.
//!
//! `ClusterSupervisor::shutdown` intentionally does not wait for children to
//! drain in-flight requests before the supervisor exits (open question, see
//! the crate-level docs) — it fires a termination signal at every live child
//! and returns immediately, without reaping. Operating on a raw PID rather
//! than a [`tokio::process::Child`] means shutdown never has to contend with
//! the restart loop for ownership of the child handle.

use std::io;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Send a termination signal to the process identified by `pid`, without
/// waiting for it to exit.
///
/// Unix: `SIGTERM`, matching the spec's "send a termination signal" wording.
/// A PID that no longer refers to a live process is not an error — the
/// process has already exited, which is the desired end state.
#[cfg(unix)]
pub fn terminate(pid: u32) -> io::Result<()> {
    match signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::other(e)),
    }
}

/// Windows has no direct raw-PID signal equivalent without extra FFI; this is
/// a best-effort no-op rather than pulling in a Windows-only dependency for a
/// platform the spec does not require `SIGTERM` support on.
#[cfg(not(unix))]
pub fn terminate(_pid: u32) -> io::Result<()> {
    Ok(())
}

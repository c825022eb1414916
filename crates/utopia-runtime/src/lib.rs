//! Cluster supervisor: spawns, monitors, and restarts worker processes, with
//! an optional reverse proxy in front of the fleet.

#![deny(unsafe_code)]

pub mod error;
pub mod process;
pub mod supervisor;

pub use error::SupervisorError;
pub use supervisor::ClusterSupervisor;

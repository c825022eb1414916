//! Core domain types shared by the supervisor, proxy, and compute pool:
//! [`ScalingConfig`], [`WorkerHandle`], and the handshake used to tell a freshly
//! spawned child process whether it should run as a worker.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod handshake;
pub mod worker;

pub use config::{DEFAULT_PROXY_PORT, ScalingConfig, ScalingConfigBuilder, Strategy};
pub use error::ConfigError;
pub use handshake::{
    ENV_PROCESS_ID, ENV_SCALING_MODE, ENV_WORKER_PORT, Handshake, ProcessRole, discover_role,
};
pub use worker::{ConnectionGuard, WorkerHandle};

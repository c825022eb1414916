//! `utopia-scale` entry point — the process-role discriminator's home.
//!
//! Every invocation of the binary, supervisor or worker alike, starts here.
//! The handshake environment is inspected exactly once, before any argument
//! parsing happens, so a worker child can never recursively re-enter
//! supervisor mode (see [`utopia_core::handshake`]).

use clap::Parser;

use utopia_cli::{Cli, worker};
use utopia_core::ScalingConfig;
use utopia_core::handshake::{self, ProcessRole};
use utopia_runtime::ClusterSupervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match handshake::discover_role() {
        ProcessRole::Worker { id, port } => worker::run(id, port).await,
        ProcessRole::Supervisor => run_supervisor().await,
    }
}

async fn run_supervisor() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ScalingConfig::new(
        cli.processes,
        cli.base_port,
        cli.enable_proxy,
        cli.proxy_port,
        cli.strategy.into(),
    )?;

    ClusterSupervisor::new(config, cli.worker_args).start().await?;
    Ok(())
}

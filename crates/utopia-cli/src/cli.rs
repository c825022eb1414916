//! Command-line surface for the supervisor. Every flag also has an
//! environment-variable fallback, matching the teacher crate's own CLI flags.

use clap::{Parser, ValueEnum};

use utopia_core::Strategy;

/// Backend selection strategy, as a `clap`-friendly mirror of [`Strategy`].
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    RoundRobin,
    LeastConnections,
    Random,
}

impl From<StrategyArg> for Strategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::RoundRobin => Strategy::RoundRobin,
            StrategyArg::LeastConnections => Strategy::LeastConnections,
            StrategyArg::Random => Strategy::Random,
        }
    }
}

/// Supervisor configuration, parsed from CLI flags or their environment
/// fallbacks. Worker processes never parse this — they are dispatched before
/// argument parsing runs, via the handshake environment (see [`crate::worker`]).
#[derive(Debug, Parser)]
#[command(name = "utopia-scale")]
#[command(about = "Supervise a fixed-size pool of worker processes behind a reverse proxy")]
pub struct Cli {
    /// Number of worker processes to supervise.
    #[arg(long, env = "UTOPIA_PROCESSES", default_value_t = 4)]
    pub processes: u16,

    /// First worker port; worker `id` binds to `base_port + id`.
    #[arg(long, env = "UTOPIA_BASE_PORT", default_value_t = 8080)]
    pub base_port: u16,

    /// Start the reverse proxy alongside the workers.
    #[arg(long, env = "UTOPIA_ENABLE_PROXY")]
    pub enable_proxy: bool,

    /// Port the reverse proxy listens on. Defaults to 8080 when absent.
    #[arg(long, env = "UTOPIA_PROXY_PORT")]
    pub proxy_port: Option<u16>,

    /// Backend selection strategy used by the reverse proxy.
    #[arg(long, value_enum, env = "UTOPIA_STRATEGY", default_value = "round-robin")]
    pub strategy: StrategyArg,

    /// Extra arguments forwarded verbatim to every spawned worker process.
    #[arg(last = true)]
    pub worker_args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_scaling_config_defaults() {
        let cli = Cli::parse_from(["utopia-scale"]);
        assert_eq!(cli.processes, 4);
        assert_eq!(cli.base_port, 8080);
        assert!(!cli.enable_proxy);
        assert!(cli.proxy_port.is_none());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "utopia-scale",
            "--processes",
            "3",
            "--base-port",
            "9000",
            "--enable-proxy",
            "--proxy-port",
            "3000",
            "--strategy",
            "least-connections",
        ]);
        assert_eq!(cli.processes, 3);
        assert_eq!(cli.base_port, 9000);
        assert!(cli.enable_proxy);
        assert_eq!(cli.proxy_port, Some(3000));
        assert!(matches!(cli.strategy, StrategyArg::LeastConnections));
    }

    #[test]
    fn trailing_args_are_collected_as_worker_args() {
        let cli = Cli::parse_from(["utopia-scale", "--", "./worker.js", "--flag"]);
        assert_eq!(cli.worker_args, vec!["./worker.js", "--flag"]);
    }
}

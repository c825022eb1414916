//! `ScalingConfig` — the immutable record that drives the whole cluster.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default proxy port used when `enable_proxy` is set but no explicit port was given.
pub const DEFAULT_PROXY_PORT: u16 = 8080;

/// Backend selection strategy used by the reverse proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Cycle through workers in a fixed, deterministic order.
    #[default]
    RoundRobin,
    /// Always route to the worker with the fewest in-flight connections.
    LeastConnections,
    /// Sample a worker uniformly at random for each request.
    Random,
}

/// Immutable configuration for a cluster of worker processes and their proxy.
///
/// Construct with [`ScalingConfig::builder`] or [`ScalingConfig::new`]; both paths
/// run through [`ScalingConfig::validate`] so an invalid config can never be built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingConfig {
    /// Number of worker processes to supervise.
    pub processes: u16,
    /// First worker port; worker `id` binds to `base_port + id`.
    pub base_port: u16,
    /// Whether the reverse proxy should be started alongside the workers.
    pub enable_proxy: bool,
    /// Port the reverse proxy listens on, when `enable_proxy` is set.
    pub proxy_port: u16,
    /// Backend selection policy used by the proxy.
    pub strategy: Strategy,
}

impl ScalingConfig {
    /// Build a config directly, validating invariants immediately.
    pub fn new(
        processes: u16,
        base_port: u16,
        enable_proxy: bool,
        proxy_port: Option<u16>,
        strategy: Strategy,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            processes,
            base_port,
            enable_proxy,
            proxy_port: proxy_port.unwrap_or(DEFAULT_PROXY_PORT),
            strategy,
        };
        config.validate()?;
        Ok(config)
    }

    /// Start a [`ScalingConfigBuilder`] with sane defaults (1 process, base port 8080).
    pub fn builder() -> ScalingConfigBuilder {
        ScalingConfigBuilder::default()
    }

    /// The exclusive upper bound of the worker port range (`base_port + processes`).
    pub fn worker_port_range_end(&self) -> u32 {
        u32::from(self.base_port) + u32::from(self.processes)
    }

    /// The port assigned to worker `id`.
    pub fn worker_port(&self, id: u16) -> u16 {
        self.base_port + id
    }

    /// Check the two config invariants from the spec:
    /// `base_port + processes - 1 <= 65535` and `proxy_port` outside the worker range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processes == 0 {
            return Err(ConfigError::ZeroProcesses);
        }

        let last_port = u32::from(self.base_port) + u32::from(self.processes) - 1;
        if last_port > u32::from(u16::MAX) {
            return Err(ConfigError::PortRangeOverflow {
                base_port: self.base_port,
                last_port,
                processes: u32::from(self.processes),
            });
        }

        if self.enable_proxy {
            let range_end = self.worker_port_range_end();
            let proxy_port = u32::from(self.proxy_port);
            if proxy_port >= u32::from(self.base_port) && proxy_port < range_end {
                return Err(ConfigError::ProxyPortCollision {
                    proxy_port: self.proxy_port,
                    base_port: self.base_port,
                    range_end,
                });
            }
        }

        Ok(())
    }
}

/// Builder for [`ScalingConfig`].
#[derive(Debug, Clone)]
pub struct ScalingConfigBuilder {
    processes: u16,
    base_port: u16,
    enable_proxy: bool,
    proxy_port: Option<u16>,
    strategy: Strategy,
}

impl Default for ScalingConfigBuilder {
    fn default() -> Self {
        Self {
            processes: 1,
            base_port: 8080,
            enable_proxy: false,
            proxy_port: None,
            strategy: Strategy::default(),
        }
    }
}

impl ScalingConfigBuilder {
    pub fn processes(mut self, processes: u16) -> Self {
        self.processes = processes;
        self
    }

    pub fn base_port(mut self, base_port: u16) -> Self {
        self.base_port = base_port;
        self
    }

    pub fn enable_proxy(mut self, enable_proxy: bool) -> Self {
        self.enable_proxy = enable_proxy;
        self
    }

    pub fn proxy_port(mut self, proxy_port: u16) -> Self {
        self.proxy_port = Some(proxy_port);
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Validate and produce the final [`ScalingConfig`].
    pub fn build(self) -> Result<ScalingConfig, ConfigError> {
        ScalingConfig::new(
            self.processes,
            self.base_port,
            self.enable_proxy,
            self.proxy_port,
            self.strategy,
        )
    }
}

use anyhow::{Context, Result};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const CONFIG_PATH_ENV: &str = "NET_HEALTH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
/// Largest CIDR block (in addresses) a single target entry may expand to.
pub const MAX_BLOCK_ADDRESSES: u32 = 256;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MonitorConfig {
    #[serde(default = "default_targets")]
    pub targets: Vec<String>,
    #[serde(default = "default_round_interval")]
    pub round_interval_ms: u64,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

fn default_targets() -> Vec<String> {
    vec!["8.8.8.8".into(), "1.1.1.1".into()]
}

fn default_round_interval() -> u64 {
    5000
}

fn default_probe_timeout() -> u64 {
    3000
}

fn default_api_port() -> u16 {
    3000
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one target must be configured")]
    NoTargets,
    #[error("round_interval_ms must be greater than zero")]
    ZeroInterval,
    #[error("probe_timeout_ms must be greater than zero")]
    ZeroTimeout,
    #[error("target block {block} exceeds {limit} addresses")]
    TargetBlockTooLarge { block: String, limit: u32 },
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            round_interval_ms: default_round_interval(),
            probe_timeout_ms: default_probe_timeout(),
            api_port: default_api_port(),
            webhook_url: None,
        }
    }
}

impl MonitorConfig {
    /// Reads the config from `NET_HEALTH_CONFIG` or `config.json`. A missing
    /// file is not an error: the built-in defaults are used instead.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::load_from(&path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("{} not found, using default targets", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: MonitorConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolved_targets()?.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        if self.round_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.probe_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Target list in configured order. CIDR blocks expand to their host
    /// addresses; repeated entries keep their first position.
    pub fn resolved_targets(&self) -> Result<Vec<String>, ConfigError> {
        let mut seen = HashSet::new();
        let mut targets = Vec::new();

        for entry in &self.targets {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let addresses = if let Ok(net) = entry.parse::<IpNet>() {
                let host_bits = u32::from(net.max_prefix_len() - net.prefix_len());
                if host_bits > MAX_BLOCK_ADDRESSES.ilog2() {
                    return Err(ConfigError::TargetBlockTooLarge {
                        block: entry.to_string(),
                        limit: MAX_BLOCK_ADDRESSES,
                    });
                }
                net.hosts().map(|ip| ip.to_string()).collect::<Vec<_>>()
            } else {
                vec![entry.to_string()]
            };

            for address in addresses {
                if seen.insert(address.clone()) {
                    targets.push(address);
                }
            }
        }
        Ok(targets)
    }

    pub fn round_interval(&self) -> Duration {
        Duration::from_millis(self.round_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

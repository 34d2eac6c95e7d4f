//! Daemon configuration
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. TOML file at `$JOBENGINE_CONFIG` (default `~/.jobengine/config.toml`), optional
//! 3. `JOBENGINE__*` environment variables, e.g. `JOBENGINE__WORKER__CONCURRENCY=8`

use anyhow::{Context, Result};
use jobengine_core::{RetryPolicy, WorkerOptions};
use serde::Deserialize;
use std::path::PathBuf;

pub const CONFIG_PATH_ENV: &str = "JOBENGINE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "~/.jobengine/config.toml";
const ENV_PREFIX: &str = "JOBENGINE";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub worker: WorkerOptions,

    /// Retry policy attached to demo jobs
    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub format: LogFormat,

    /// Adds a daily rolling file layer when set
    #[serde(default)]
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Probability in `[0, 1]` that a `notification.deliver` run fails
    #[serde(default = "default_failure_rate")]
    pub failure_rate: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            failure_rate: default_failure_rate(),
        }
    }
}

fn default_heartbeat_interval_secs() -> u64 {
    5
}

fn default_failure_rate() -> f64 {
    0.3
}

impl DaemonConfig {
    /// Load from the config file (if present) and the environment
    pub fn load() -> Result<Self> {
        let path = config_path();
        let settings = config::Config::builder()
            .add_source(config::File::from(path.clone()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read configuration ({})", path.display()))?;

        let cfg: DaemonConfig = settings
            .try_deserialize()
            .context("invalid configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.worker.validate()?;
        self.retry.validate()?;
        if self.demo.heartbeat_interval_secs == 0 {
            anyhow::bail!("demo.heartbeat_interval_secs must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.demo.failure_rate) {
            anyhow::bail!(
                "demo.failure_rate must be within [0, 1], got {}",
                self.demo.failure_rate
            );
        }
        Ok(())
    }
}

fn config_path() -> PathBuf {
    let raw = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}

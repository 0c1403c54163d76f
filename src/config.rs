use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::strategy::{
    default_pool_size, DaemonThreadFactory, FixedPool, GrowablePool, UncaughtPolicy,
};

fn default_workers() -> usize {
    default_pool_size()
}

fn default_prefix() -> String {
    "rivulet-worker".to_string()
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_exit_on_fatal() -> bool {
    true
}

/// Pool tuning, loadable from a `[pool]`-style TOML file or built in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Worker count for fixed pools (defaults to available parallelism).
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Prefix for worker thread names; threads are named `{prefix}-{n}`.
    #[serde(default = "default_prefix")]
    pub thread_name_prefix: String,
    /// Idle seconds before a growable-pool worker retires.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// Whether an unclassified worker error terminates the process.
    /// Disable for supervised environments with their own restart policy.
    #[serde(default = "default_exit_on_fatal")]
    pub exit_on_fatal: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            thread_name_prefix: default_prefix(),
            keep_alive_secs: default_keep_alive_secs(),
            exit_on_fatal: default_exit_on_fatal(),
        }
    }
}

impl PoolConfig {
    fn factory(&self) -> DaemonThreadFactory {
        let policy = if self.exit_on_fatal {
            UncaughtPolicy::new()
        } else {
            UncaughtPolicy::disarmed()
        };
        DaemonThreadFactory::new(self.thread_name_prefix.clone(), policy)
    }

    /// Build a fixed pool per this config.
    pub fn build_fixed(&self) -> Result<FixedPool> {
        FixedPool::new(self.workers, self.factory())
    }

    /// Build a growable pool per this config.
    pub fn build_growable(&self) -> GrowablePool {
        GrowablePool::new(self.factory(), Duration::from_secs(self.keep_alive_secs))
    }
}

/// Load a [`PoolConfig`] from a TOML file. Missing keys take their defaults.
pub fn load_config(path: &Path) -> Result<PoolConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: PoolConfig =
        toml::from_str(&text).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

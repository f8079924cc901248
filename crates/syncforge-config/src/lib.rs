//! # syncforge-config
//!
//! Hierarchical configuration loading for every `syncforge-*` component,
//! mirroring the precedence chain spec.md §6 describes:
//!
//! 1. Environment variables (`SFG_*`, highest precedence)
//! 2. `syncforge.local.toml` (gitignored, local overrides)
//! 3. `syncforge.toml` (git-tracked, project config)
//! 4. `~/.config/syncforge/config.toml` (user defaults)
//! 5. Built-in defaults (lowest precedence)

use serde::{Deserialize, Serialize};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Aggregated configuration for the whole synchronization core. One field
/// per component, each deserialized from its own TOML table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncforgeConfig {
    pub server: ServerConfig,
    pub mapper: syncforge_mapper::MapperConfig,
    pub queue: syncforge_queue::QueueConfig,
    pub conflict: syncforge_conflict::ConflictConfig,
    pub fanout: syncforge_fanout::FanoutConfig,
    pub monitor: syncforge_monitor::MonitorConfig,
    pub orchestrator: syncforge_orchestrator::OrchestratorConfig,
}

/// The HTTP/WebSocket bind address and related top-level server knobs.
/// Kept here rather than in `syncforge-server` itself so `syncforge-config`
/// has no dependency back on the binary crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub shutdown_grace_period_ms: u64,
    /// HMAC secret the fan-out hub's `TokenValidator` checks bearer tokens
    /// against. The built-in default is deliberately unfit for production
    /// use; real deployments override it via `SFG_SERVER__JWT_SECRET`.
    pub jwt_secret: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            shutdown_grace_period_ms: 5_000,
            jwt_secret: "changeme".to_string(),
        }
    }
}

impl SyncforgeConfig {
    pub fn load() -> anyhow::Result<Self> {
        ConfigLoader::new().load()
    }

    pub fn load_from_dir(project_dir: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_component_defaults() {
        let config = SyncforgeConfig::default();
        assert_eq!(config.orchestrator.shard_count, 64);
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
    }
}

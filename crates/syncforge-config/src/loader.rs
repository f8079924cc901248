use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::{Paths, SyncforgeConfig};

/// Loads [`SyncforgeConfig`] from all sources with the precedence spec.md
/// §6 names, built on the same `config`-crate source-stacking pattern as
/// `kimberlite-config::ConfigLoader`.
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "SFG".to_string(),
        }
    }

    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn load(self) -> Result<SyncforgeConfig> {
        let mut builder = config::Config::builder();

        let defaults = SyncforgeConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        let paths = Paths::new();
        if let Ok(user_config_file) = paths.user_config_file() {
            if user_config_file.exists() {
                builder = builder.add_source(
                    config::File::from(user_config_file)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }
        }

        let project_config_file = Paths::project_config_file(&self.project_dir);
        if project_config_file.exists() {
            builder = builder.add_source(
                config::File::from(project_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        let local_config_file = Paths::local_config_file(&self.project_dir);
        if local_config_file.exists() {
            builder = builder.add_source(
                config::File::from(local_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build().context("failed to build configuration")?;
        let syncforge_config: SyncforgeConfig =
            config.try_deserialize().context("failed to deserialize configuration")?;

        Ok(syncforge_config)
    }

    pub fn load_or_default(self) -> SyncforgeConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn loads_defaults() {
        let temp_dir = tempdir().expect("tempdir");
        let config = ConfigLoader::new().with_project_dir(temp_dir.path()).load().expect("load");
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.orchestrator.shard_count, 64);
    }

    #[test]
    fn project_config_overrides_defaults() {
        let temp_dir = tempdir().expect("tempdir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("syncforge.toml"),
            r#"
[server]
bind_address = "0.0.0.0:9000"

[orchestrator]
shard_count = 128
"#,
        )
        .expect("write project config");

        let config = ConfigLoader::new().with_project_dir(project_dir).load().expect("load");
        assert_eq!(config.server.bind_address, "0.0.0.0:9000");
        assert_eq!(config.orchestrator.shard_count, 128);
    }

    #[test]
    fn local_config_overrides_project_config() {
        let temp_dir = tempdir().expect("tempdir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("syncforge.toml"),
            "[server]\nbind_address = \"127.0.0.1:5432\"\n",
        )
        .expect("write project config");
        fs::write(
            project_dir.join("syncforge.local.toml"),
            "[server]\nbind_address = \"localhost:9999\"\n",
        )
        .expect("write local config");

        let config = ConfigLoader::new().with_project_dir(project_dir).load().expect("load");
        assert_eq!(config.server.bind_address, "localhost:9999");
    }
}

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::ConfigError;

/// XDG-compliant paths for the synchronization core's config files.
pub struct Paths {
    project_dirs: Option<ProjectDirs>,
}

impl Paths {
    pub fn new() -> Self {
        Self {
            project_dirs: ProjectDirs::from("com", "Syncforge", "syncforge"),
        }
    }

    pub fn user_config_dir(&self) -> Result<PathBuf, ConfigError> {
        self.project_dirs
            .as_ref()
            .map(|p| p.config_dir().to_path_buf())
            .ok_or_else(|| ConfigError::XdgError("failed to determine user config directory".to_string()))
    }

    pub fn user_config_file(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.user_config_dir()?.join("config.toml"))
    }

    pub fn project_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join("syncforge.toml")
    }

    pub fn local_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join("syncforge.local.toml")
    }

    pub fn is_initialized(project_dir: impl AsRef<Path>) -> bool {
        Self::project_config_file(project_dir).exists()
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn project_paths() {
        let temp_dir = tempdir().expect("tempdir");
        let project_dir = temp_dir.path();

        assert_eq!(
            Paths::project_config_file(project_dir),
            project_dir.join("syncforge.toml")
        );
        assert_eq!(
            Paths::local_config_file(project_dir),
            project_dir.join("syncforge.local.toml")
        );
        assert!(!Paths::is_initialized(project_dir));

        std::fs::write(Paths::project_config_file(project_dir), "").unwrap();
        assert!(Paths::is_initialized(project_dir));
    }
}

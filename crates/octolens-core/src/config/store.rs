//! Config store for loading and saving octolens.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{OctolensConfig, parser, paths};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Store at the platform default location.
    pub fn from_default_location() -> anyhow::Result<Self> {
        let dir = paths::default_config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(Self::from_dir(&dir))
    }

    /// Store for `octolens.toml` inside `dir`.
    pub fn from_dir(dir: &Path) -> Self {
        Self::from_path(paths::config_path_in(dir))
    }

    pub fn from_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the config, or the defaults when the file does not exist.
    pub fn load(&self) -> anyhow::Result<OctolensConfig> {
        if !self.config_path.exists() {
            return Ok(OctolensConfig::new());
        }
        parser::parse_octolens_toml(&self.config_path)
    }

    /// Write `config` as TOML, creating parent directories as needed.
    pub fn save(&self, config: &OctolensConfig) -> anyhow::Result<()> {
        let content = parser::to_toml(config).context("Failed to serialize config to TOML")?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!("Failed to write config file: {}", self.config_path.display())
        })?;
        Ok(())
    }
}

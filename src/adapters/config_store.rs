use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::domain::{AppConfig, PipelineError};
use crate::ports::ConfigStore;

/// TOML-backed configuration store under the platform's per-user directory.
pub struct TomlConfigStore {
    data_dir: PathBuf,
}

impl TomlConfigStore {
    /// Store rooted at the platform default location, created if missing.
    pub fn new() -> Result<Self, PipelineError> {
        let data_dir = Self::platform_data_dir()?;
        fs::create_dir_all(&data_dir)?;

        info!(data_dir = ?data_dir, "Configuration store ready");
        Ok(Self { data_dir })
    }

    /// A config store rooted at an explicit directory, mainly for tests.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    // macOS keeps per-app state under Application Support; everywhere else
    // the user config root is the right place.
    fn platform_data_dir() -> Result<PathBuf, PipelineError> {
        #[cfg(target_os = "macos")]
        let base = dirs::data_dir();
        #[cfg(not(target_os = "macos"))]
        let base = dirs::config_dir();

        base.map(|p| p.join("Scribeline")).ok_or_else(|| {
            PipelineError::Config("no per-user data directory on this platform".to_string())
        })
    }
}

impl ConfigStore for TomlConfigStore {
    fn load(&self) -> Result<AppConfig, PipelineError> {
        let path = self.config_path();

        if !path.exists() {
            info!(path = ?path, "No configuration on disk, writing defaults");
            let config = AppConfig::new();
            self.save(&config)?;
            return Ok(config);
        }

        let config: AppConfig = toml::from_str(&fs::read_to_string(&path)?)?;
        debug!(path = ?path, "Configuration loaded");
        Ok(config)
    }

    fn save(&self, config: &AppConfig) -> Result<(), PipelineError> {
        let path = self.config_path();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml::to_string_pretty(config)?)?;

        debug!(path = ?path, "Configuration saved");
        Ok(())
    }

    fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }

    fn data_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

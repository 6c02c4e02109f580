use std::path::PathBuf;

use crate::domain::{AppConfig, PipelineError};

/// Port for configuration persistence.
pub trait ConfigStore: Send + Sync {
    /// Load the configuration, creating defaults if none exists.
    fn load(&self) -> Result<AppConfig, PipelineError>;

    /// Persist the configuration.
    fn save(&self, config: &AppConfig) -> Result<(), PipelineError>;

    /// Path to the configuration file.
    fn config_path(&self) -> PathBuf;

    /// Application data directory.
    fn data_dir(&self) -> PathBuf;

    /// Log directory.
    fn logs_dir(&self) -> PathBuf;
}

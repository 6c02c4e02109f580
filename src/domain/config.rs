use serde::{Deserialize, Serialize};

/// Model selection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Default model identifier (e.g. "whisper-tiny.en").
    pub default_model: String,
    /// Language code ("en", "fr", ...) or "auto" for detection.
    pub language: String,
    /// Recognition task: "transcribe" or "translate".
    pub task: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default_model: "whisper-tiny.en".to_string(),
            language: "auto".to_string(),
            task: "transcribe".to_string(),
        }
    }
}

/// Engine front-end configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate the recognition engine expects.
    pub sample_rate: u32,
    /// Recognition window length in seconds for standard model variants.
    /// Distilled variants ignore the configured geometry and run a fixed
    /// shorter window.
    pub chunk_length_secs: f64,
    /// Overlap between consecutive windows in seconds.
    pub stride_length_secs: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            chunk_length_secs: 30.0,
            stride_length_secs: 5.0,
        }
    }
}

/// Subtitle export configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExportConfig {
    /// Export directory; defaults to the platform data dir when empty.
    pub directory: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Enable file logging with rotation.
    pub file_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: true,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub engine: EngineConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Create a new AppConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::new();
        assert_eq!(config.engine.sample_rate, 16_000);
        assert_eq!(config.model.task, "transcribe");
        assert!(config.logging.file_logging);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str("[model]\ndefault_model = \"whisper-base\"\n").unwrap();
        assert_eq!(config.model.default_model, "whisper-base");
        assert_eq!(config.model.language, "auto");
        assert!((config.engine.chunk_length_secs - 30.0).abs() < 1e-9);
    }
}

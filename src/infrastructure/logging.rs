//! Tracing setup for hosts that want the library to own logging.
//!
//! Layer selection follows [`LoggingConfig`]: a human-readable console layer
//! is always installed, and a daily-rolling JSON file layer is added when
//! file logging is enabled. `RUST_LOG` overrides the configured level.

use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::domain::config::LoggingConfig;
use crate::domain::PipelineError;

const LOG_FILE_PREFIX: &str = "scribeline.log";

fn filter_for(directive: String) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
}

/// Install the global subscriber per `config`.
///
/// Returns the file writer's flush guard when file logging is on; hold it
/// for the process lifetime or buffered lines are lost on exit. Calling this
/// again is harmless and leaves the existing subscriber in place, so
/// embedders that already installed their own subscriber win.
pub fn init_logging(
    config: &LoggingConfig,
    logs_dir: &Path,
) -> Result<Option<WorkerGuard>, PipelineError> {
    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(filter_for(format!("scribeline={},warn", config.level)));

    if !config.file_logging {
        let _ = tracing_subscriber::registry().with(console).try_init();
        tracing::info!(level = %config.level, "Logging initialized");
        return Ok(None);
    }

    fs::create_dir_all(logs_dir)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, logs_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .json()
        .with_filter(filter_for(format!("scribeline={}", config.level)));

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
    tracing::info!(
        logs_dir = ?logs_dir,
        level = %config.level,
        "Logging initialized with file output"
    );

    Ok(Some(guard))
}

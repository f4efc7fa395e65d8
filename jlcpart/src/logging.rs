//! Tracing setup: stderr plus a log file.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, time::LocalTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Log file name inside the log directory.
pub const LOG_FILE_NAME: &str = "jlcpart.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file in {}: {reason}", .directory.display())]
    File { directory: PathBuf, reason: String },

    #[error("failed to install log subscriber: {0}")]
    Subscriber(String),
}

/// Logging options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Preferred log directory; the platform data directory when unset.
    pub directory: Option<PathBuf>,
    /// Also log to stderr.
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::from(&LoggingSettings::default())
    }
}

impl From<&LoggingSettings> for LoggingConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level.clone(),
            directory: settings.directory.clone(),
            stderr: true,
        }
    }
}

impl LoggingConfig {
    pub fn with_stderr(mut self, stderr: bool) -> Self {
        self.stderr = stderr;
        self
    }
}

/// Keeps the file writer alive; drop it last to flush buffered lines.
pub struct LoggingGuard {
    _worker: WorkerGuard,
    log_file: PathBuf,
}

impl LoggingGuard {
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

/// Default log directory.
pub fn default_log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("jlcpart")
        .join("logs")
}

/// `preferred` if a log file can be created there, otherwise a directory
/// under the system temp dir.
pub fn writable_log_directory(preferred: &Path) -> PathBuf {
    if can_write_log(preferred) {
        return preferred.to_path_buf();
    }
    let fallback = std::env::temp_dir().join(format!("jlcpart-logs-{}", std::process::id()));
    let _ = std::fs::create_dir_all(&fallback);
    fallback
}

fn can_write_log(dir: &Path) -> bool {
    std::fs::create_dir_all(dir).is_ok()
        && OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(LOG_FILE_NAME))
            .is_ok()
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `config.level`. Call once per process.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let preferred = config
        .directory
        .clone()
        .unwrap_or_else(default_log_directory);
    let directory = writable_log_directory(&preferred);

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_NAME)
        .build(&directory)
        .map_err(|e| LoggingError::File {
            directory: directory.clone(),
            reason: e.to_string(),
        })?;
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = config.stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::rfc_3339()),
        )
        .with(stderr_layer)
        .try_init()
        .map_err(|e| LoggingError::Subscriber(e.to_string()))?;

    Ok(LoggingGuard {
        _worker: worker,
        log_file: directory.join(LOG_FILE_NAME),
    })
}

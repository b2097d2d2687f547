use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Where and how verbosely the binary logs
pub struct LogConfig {
    pub log_dir: PathBuf,
    /// File names are `<prefix>.<date>.log`
    pub file_prefix: String,
    /// Rotated files kept on disk
    pub max_files: usize,
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Also write JSON logs to `log_dir`
    pub to_file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        let log_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".drive-uploader")
            .join("logs");

        Self {
            log_dir,
            file_prefix: "drive-uploader".to_string(),
            max_files: 5,
            level: "info".to_string(),
            to_file: true,
        }
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber: compact lines on stdout and, when enabled,
/// a daily-rotated JSON file.
///
/// Targets used across the crate: `api`, `uploader`, `uploader::folders`,
/// `uploader::transfer`, `uploader::finalize`, `events`, `config`, `scan`, `main`.
///
/// ```bash
/// RUST_LOG=uploader=debug,api=trace drive-uploader ./photos
/// ```
pub fn init_logging(config: LogConfig) -> Result<LogGuard> {
    let (file_layer, worker_guard) = if config.to_file {
        std::fs::create_dir_all(&config.log_dir).context("Failed to create log directory")?;

        let appender = tracing_appender::rolling::RollingFileAppender::builder()
            .rotation(tracing_appender::rolling::Rotation::DAILY)
            .filename_prefix(&config.file_prefix)
            .filename_suffix("log")
            .max_log_files(config.max_files)
            .build(&config.log_dir)
            .context("Failed to create file appender")?;
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);

        let layer = fmt::layer()
            .json()
            .with_writer(writer)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter(&config.level));
        (Some(layer), Some(worker_guard))
    } else {
        (None, None)
    };

    let stdout_layer = fmt::layer()
        .compact()
        .with_line_number(true)
        .with_filter(env_filter(&config.level));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        target: "main",
        log_dir = %config.log_dir.display(),
        to_file = config.to_file,
        max_files = config.max_files,
        "Logging system initialized"
    );

    Ok(LogGuard {
        _worker_guard: worker_guard,
    })
}

/// Guard that flushes buffered file logs when dropped.
/// Keep it alive for the whole program.
pub struct LogGuard {
    _worker_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        tracing::debug!(target: "main", "Flushing logs before shutdown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_config() {
        let config = LogConfig::default();
        assert_eq!(config.file_prefix, "drive-uploader");
        assert_eq!(config.max_files, 5);
        assert_eq!(config.level, "info");
        assert!(config.log_dir.ends_with(".drive-uploader/logs"));
    }

    #[test]
    fn test_log_directory_creation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_dir = temp_dir.path().join("logs");
        let config = LogConfig {
            log_dir: log_dir.clone(),
            file_prefix: "test".to_string(),
            max_files: 3,
            level: "debug".to_string(),
            to_file: true,
        };

        let guard = init_logging(config);
        assert!(guard.is_ok());
        assert!(log_dir.exists());
    }
}

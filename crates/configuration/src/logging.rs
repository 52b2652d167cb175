use crate::error::ConfigError;
use crate::settings::{LogFormat, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// File name prefix of the rolling log files.
const LOG_FILE_PREFIX: &str = "fxtools.log";

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. When a log directory is
/// configured, output goes to a daily-rolling file through a non-blocking writer;
/// the returned guard must be held until the process exits so buffered lines are
/// flushed.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>, ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ConfigError::LoggingError(e.to_string()))?;

    let (writer, guard, ansi) = if config.directory.as_os_str().is_empty() {
        (BoxMakeWriter::new(std::io::stdout), None, true)
    } else {
        let appender = tracing_appender::rolling::daily(&config.directory, LOG_FILE_PREFIX);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        (BoxMakeWriter::new(non_blocking), Some(guard), false)
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi);

    let result = match config.format {
        LogFormat::Full => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    result.map_err(|e| ConfigError::LoggingError(e.to_string()))?;

    Ok(guard)
}

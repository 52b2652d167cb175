use crate::error::ConfigError;
use events::MAX_BATCH_EVENTS;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub collector: CollectorConfig,
    pub tracking: TrackingConfig,
    pub logging: LoggingConfig,
}

/// Where tracked events are delivered.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Origin of the site API, e.g. "https://fxtools.example". The analytics
    /// routes (`/api/analytics`, `/api/analytics/batch`) are appended to it.
    pub base_url: String,
    /// Upper bound on a single delivery request.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

/// Behaviour of the event tracker.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// When false, events are still recorded in memory but never delivered.
    pub enabled: bool,
    /// A pending batch is flushed as soon as it holds this many events, at most
    /// `events::MAX_BATCH_EVENTS`.
    pub batch_size: usize,
    /// A pending batch is flushed this long after its first event was queued.
    #[serde(with = "humantime_serde")]
    pub batch_delay: Duration,
    /// The location reported with filter and pagination events when the
    /// application has not navigated anywhere yet.
    pub location: String,
}

/// Output format of the log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, used when `RUST_LOG` is not set.
    pub level: String,
    pub format: LogFormat,
    /// Directory for daily-rolling log files. Empty means stdout only.
    pub directory: PathBuf,
}

// --- Default Implementations ---
// This allows a user to omit any section (or the whole file)
// and still have it work with sensible defaults.

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: 10,
            batch_delay: Duration::from_secs(5),
            location: "http://localhost:3000/".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Full,
            directory: PathBuf::new(),
        }
    }
}

impl Config {
    /// Rejects settings the tracker cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collector.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "collector.base_url must not be empty".to_string(),
            ));
        }
        if self.tracking.batch_size == 0 || self.tracking.batch_size > MAX_BATCH_EVENTS {
            return Err(ConfigError::ValidationError(format!(
                "tracking.batch_size must be between 1 and {}, got {}",
                MAX_BATCH_EVENTS, self.tracking.batch_size
            )));
        }
        if self.tracking.batch_delay.is_zero() {
            return Err(ConfigError::ValidationError(
                "tracking.batch_delay must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_config_from;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_match_tracker_contract() {
        let config = Config::default();
        assert_eq!(config.tracking.batch_size, 10);
        assert_eq!(config.tracking.batch_delay, Duration::from_secs(5));
        assert!(config.tracking.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_config_from(std::path::Path::new("does-not-exist.toml")).unwrap();
        assert_eq!(config.collector.base_url, "http://localhost:3000");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_overrides_only_named_fields() {
        let file = write_config(
            r#"
            [collector]
            base_url = "https://fxtools.example"

            [tracking]
            batch_delay = "750ms"

            [logging]
            format = "compact"
            "#,
        );
        let config = load_config_from(file.path()).unwrap();

        assert_eq!(config.collector.base_url, "https://fxtools.example");
        assert_eq!(config.collector.request_timeout, Duration::from_secs(10));
        assert_eq!(config.tracking.batch_delay, Duration::from_millis(750));
        assert_eq!(config.tracking.batch_size, 10);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let file = write_config("[tracking]\nbatch_size = 0\n");
        let err = load_config_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)), "got: {err}");
    }

    #[test]
    fn test_batch_size_above_collector_limit_is_rejected() {
        let file = write_config("[tracking]\nbatch_size = 25\n");
        let err = load_config_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)), "got: {err}");

        let mut config = Config::default();
        config.tracking.batch_size = MAX_BATCH_EVENTS;
        assert!(config.validate().is_ok());
        config.tracking.batch_size = MAX_BATCH_EVENTS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_base_url_is_rejected() {
        let mut config = Config::default();
        config.collector.base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }
}

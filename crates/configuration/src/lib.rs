use crate::error::ConfigError;
use crate::settings::Config;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{CollectorConfig, LogFormat, LoggingConfig, TrackingConfig};

/// Prefix of the environment variables that override file settings,
/// e.g. `FXTOOLS__TRACKING__BATCH_SIZE=20`.
pub const ENV_PREFIX: &str = "FXTOOLS";

/// Loads the application configuration from the `config.toml` file.
///
/// This function is the primary entry point for this crate. The file is optional:
/// every setting has a default, and any of them can be overridden from the
/// environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(Path::new("config.toml"))
}

/// Loads the configuration from an explicit file path, layered with environment overrides.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;
    tracing::debug!(path = %path.display(), "Configuration loaded.");

    Ok(config)
}

//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{CourierConfig, DispatchConfig, LogFormat, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &CourierConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_dispatch_config(&config.dispatch)?;
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File {
        let Some(path) = &logging.file_path else {
            return Err(ConfigError::missing_field("logging.file_path"));
        };
        if path.file_name().is_none() {
            return Err(ConfigError::validation(format!(
                "Log file path has no file name: {}",
                path.display()
            )));
        }
    }

    if logging.format == LogFormat::Json && !cfg!(feature = "json-log") {
        return Err(ConfigError::validation(
            "JSON log format requires the json-log feature",
        ));
    }

    for target in logging.filters.keys() {
        if target.trim().is_empty() {
            return Err(ConfigError::validation("Log filter target cannot be empty"));
        }
        if target.contains(['=', ',', ' ']) {
            return Err(ConfigError::validation(format!(
                "Invalid log filter target: {target}"
            )));
        }
    }

    Ok(())
}

/// Validates dispatch settings.
fn validate_dispatch_config(dispatch: &DispatchConfig) -> ConfigResult<()> {
    if dispatch.drain_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "Drain timeout must be greater than 0",
        ));
    }
    Ok(())
}

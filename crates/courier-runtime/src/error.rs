//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use crate::logging::LoggingError;

/// Errors that can occur while launching a bot.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The bot facade failed, typically while connecting.
    #[error("Bot error: {0}")]
    Bot(#[from] courier_core::Error),

    /// The logging subscriber could not be set up.
    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

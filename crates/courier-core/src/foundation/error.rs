//! Unified error types for the Courier core.
//!
//! Two families live here:
//! - [`BackendError`] is what a gateway collaborator reports from its
//!   open/close/send operations. The core never rewrites it.
//! - [`Error`] is what the [`Bot`](crate::Bot) facade returns.
//!
//! Dispatch-path problems (malformed command patterns, a missing fallback
//! handler) are absorbed by the router and have no variant here.

use thiserror::Error;

// =============================================================================
// Backend Errors
// =============================================================================

/// Errors reported by a backend collaborator.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The session could not be established.
    #[error("connection failed: {reason}")]
    ConnectionFailed {
        /// Reason for failure.
        reason: String,
    },

    /// The session was closed by the backend or could not be closed cleanly.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// The backend refused an outbound message.
    #[error("failed to send message to '{channel}': {reason}")]
    SendRejected {
        /// Target channel or conversation.
        channel: String,
        /// Reason given by the backend.
        reason: String,
    },

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Other(String),
}

impl BackendError {
    /// Creates a connection failure.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            reason: reason.into(),
        }
    }

    /// Creates a connection-closed error.
    pub fn connection_closed(reason: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            reason: reason.into(),
        }
    }

    /// Creates a rejected-send error.
    pub fn send_rejected(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SendRejected {
            channel: channel.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Facade Errors
// =============================================================================

/// Errors returned by the bot facade.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The bot's platform tag is outside the set of supported backends.
    #[error("unknown bot type: {0}")]
    UnrecognizedBotType(String),

    /// Passed through unchanged from the backend collaborator.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Attachments cannot be derived from this message's payload.
    #[error("unsupported attachment source: {reason}")]
    UnsupportedAttachmentSource {
        /// Why the payload cannot be read.
        reason: String,
    },
}

impl Error {
    /// Creates an unsupported-attachment-source error.
    pub fn unsupported_source(reason: impl Into<String>) -> Self {
        Self::UnsupportedAttachmentSource {
            reason: reason.into(),
        }
    }

    /// Returns `true` for [`Error::UnrecognizedBotType`].
    pub fn is_unrecognized_bot_type(&self) -> bool {
        matches!(self, Self::UnrecognizedBotType(_))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for backend collaborator operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

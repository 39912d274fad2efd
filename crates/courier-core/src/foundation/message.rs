//! Canonical message model.
//!
//! Every backend event that survives self-filtering becomes one [`Message`].
//! The canonical fields cover what the router needs; everything else stays
//! reachable through [`NativePayload`], which keeps the original event so
//! attachment extraction and platform-specific handlers can recover detail
//! the canonical shape does not model.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::platform::{discord, slack};

// ============================================================================
// Bot Type
// ============================================================================

/// The platform a bot talks to.
///
/// `Other` names a platform this build has no backend for. Every operation
/// that branches on the platform rejects it with
/// [`Error::UnrecognizedBotType`](crate::Error::UnrecognizedBotType).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BotType {
    /// Discord-style gateway: attachments carry pixel dimensions.
    Discord,
    /// Slack-style socket mode: files carry a MIME type.
    Slack,
    /// A platform without a backend in this build.
    Other(String),
}

impl BotType {
    /// Returns the platform name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Discord => "discord",
            Self::Slack => "slack",
            Self::Other(name) => name,
        }
    }
}

impl FromStr for BotType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "discord" => Self::Discord,
            "slack" => Self::Slack,
            other => Self::Other(other.to_string()),
        })
    }
}

impl fmt::Display for BotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Native Payload
// ============================================================================

/// The backend event a [`Message`] was normalized from.
#[derive(Debug, Clone, Default)]
pub enum NativePayload {
    /// A Discord `MESSAGE_CREATE` event.
    Discord(Arc<discord::MessageCreate>),
    /// A Slack `message` event.
    Slack(Arc<slack::MessageEvent>),
    /// Built by application code; no backend event behind it.
    #[default]
    Synthetic,
}

impl NativePayload {
    /// Returns the platform that produced this payload.
    pub fn bot_type(&self) -> Option<BotType> {
        match self {
            Self::Discord(_) => Some(BotType::Discord),
            Self::Slack(_) => Some(BotType::Slack),
            Self::Synthetic => None,
        }
    }

    /// Returns the Discord event, if this payload came from Discord.
    pub fn as_discord(&self) -> Option<&discord::MessageCreate> {
        match self {
            Self::Discord(event) => Some(event),
            _ => None,
        }
    }

    /// Returns the Slack event, if this payload came from Slack.
    pub fn as_slack(&self) -> Option<&slack::MessageEvent> {
        match self {
            Self::Slack(event) => Some(event),
            _ => None,
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// A backend-independent inbound chat message.
///
/// Middleware and handlers receive it as `Arc<Message>` and never mutate it;
/// a middleware that wants to rewrite content builds a new message and hands
/// that to its continuation.
#[derive(Debug, Clone)]
pub struct Message {
    /// Identifier of the author.
    pub user_id: String,
    /// Identifier of the channel or conversation.
    pub channel_id: String,
    /// Text content.
    pub content: String,
    /// The backend event this message came from.
    pub payload: NativePayload,
}

impl Message {
    /// Creates a synthetic message with no backend payload.
    pub fn new(
        user_id: impl Into<String>,
        channel_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            channel_id: channel_id.into(),
            content: content.into(),
            payload: NativePayload::Synthetic,
        }
    }

    /// Attaches a backend payload.
    pub fn with_payload(mut self, payload: NativePayload) -> Self {
        self.payload = payload;
        self
    }

    /// Returns a copy with different content and the same payload.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self.clone()
        }
    }
}

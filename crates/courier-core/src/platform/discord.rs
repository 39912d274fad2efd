//! Discord-style backend: native event model, normalizer and attachment rules.
//!
//! Only the `MESSAGE_CREATE` fields the core reads are modeled; unknown JSON
//! fields are ignored on deserialization.
//!
//! ```rust,ignore
//! let event = discord::MessageCreate::from_json(raw)?;
//! if let Some(message) = discord::normalize(event, gateway.self_id().as_deref()) {
//!     bot.dispatch(message).await;
//! }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::foundation::attachment::{Attachment as NormalizedAttachment, AttachmentSource};
use crate::foundation::message::{Message, NativePayload};

/// The author of a Discord message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub username: String,
    pub bot: bool,
}

/// A file attached to a Discord message.
///
/// `width` and `height` are only present for images and videos.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    pub url: String,
    pub proxy_url: Option<String>,
    pub content_type: Option<String>,
    pub size: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Attachment {
    /// An attachment is an image when both dimensions are positive.
    pub fn is_image(&self) -> bool {
        self.width.unwrap_or(0) > 0 && self.height.unwrap_or(0) > 0
    }
}

/// A Discord `MESSAGE_CREATE` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageCreate {
    pub id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub content: String,
    pub author: User,
    pub attachments: Vec<Attachment>,
}

impl MessageCreate {
    /// Parses an event from its gateway JSON.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Turns a gateway event into a canonical message.
///
/// Returns `None` when the event was authored by the bot itself (`self_id`),
/// so its own replies never re-enter the pipeline.
pub fn normalize(event: MessageCreate, self_id: Option<&str>) -> Option<Message> {
    if self_id.is_some_and(|id| id == event.author.id) {
        trace!(message_id = %event.id, "Dropping self-authored Discord message");
        return None;
    }

    Some(Message {
        user_id: event.author.id.clone(),
        channel_id: event.channel_id.clone(),
        content: event.content.clone(),
        payload: NativePayload::Discord(Arc::new(event)),
    })
}

/// Normalizes the attachments of an event, in order.
pub fn attachments(event: &MessageCreate) -> Vec<NormalizedAttachment> {
    event
        .attachments
        .iter()
        .map(|attachment| NormalizedAttachment {
            is_image: attachment.is_image(),
            url: attachment.url.clone(),
            source: AttachmentSource::Discord(attachment.clone()),
        })
        .collect()
}

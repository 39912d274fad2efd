//! Slack-style backend: socket-mode envelopes, Events API payloads,
//! bot-message filtering, normalizer and attachment rules.
//!
//! # Event Hierarchy
//!
//! ```text
//! SocketEvent { envelope_id, kind }
//! ├── SocketEventKind::EventsApi(EventsApiEvent { inner_event })
//! │   ├── InnerEvent::Message(MessageEvent)          ← normalized
//! │   ├── InnerEvent::AppMention(AppMentionEvent)
//! │   ├── InnerEvent::MetadataPosted/Updated/Deleted
//! │   └── InnerEvent::Other
//! ├── SocketEventKind::Hello
//! ├── SocketEventKind::Disconnect
//! └── SocketEventKind::Other(type)
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::foundation::attachment::{Attachment, AttachmentSource};
use crate::foundation::message::{Message, NativePayload};

// ============================================================================
// Events API Model
// ============================================================================

/// A file shared in a Slack message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    pub id: String,
    pub name: String,
    pub title: String,
    pub mimetype: String,
    pub filetype: String,
    pub url_private: String,
    pub url_private_download: String,
    pub size: u64,
}

impl File {
    /// A file is an image when its MIME type begins with `image`.
    ///
    /// An empty or shorter MIME type never classifies as an image.
    pub fn is_image(&self) -> bool {
        self.mimetype.get(..5) == Some("image")
    }
}

/// A Slack `message` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageEvent {
    pub user: String,
    pub text: String,
    pub channel: String,
    pub channel_type: String,
    pub ts: String,
    pub bot_id: String,
    pub subtype: String,
    pub client_msg_id: String,
    pub files: Vec<File>,
}

/// A Slack `app_mention` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMentionEvent {
    pub user: String,
    pub text: String,
    pub channel: String,
    pub ts: String,
    pub bot_id: String,
}

/// A `message_metadata_*` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataEvent {
    pub user: String,
    pub channel: String,
    pub bot_id: String,
    pub event_ts: String,
}

/// The inner event of an Events API callback, keyed by its `type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InnerEvent {
    #[serde(rename = "message")]
    Message(MessageEvent),
    #[serde(rename = "app_mention")]
    AppMention(AppMentionEvent),
    #[serde(rename = "message_metadata_posted")]
    MetadataPosted(MetadataEvent),
    #[serde(rename = "message_metadata_updated")]
    MetadataUpdated(MetadataEvent),
    #[serde(rename = "message_metadata_deleted")]
    MetadataDeleted(MetadataEvent),
    #[default]
    #[serde(other)]
    Other,
}

/// An Events API callback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsApiEvent {
    pub team_id: Option<String>,
    pub api_app_id: Option<String>,
    #[serde(rename = "event")]
    pub inner_event: InnerEvent,
}

impl EventsApiEvent {
    /// Wraps an inner event in an otherwise empty callback.
    pub fn new(inner_event: InnerEvent) -> Self {
        Self {
            inner_event,
            ..Default::default()
        }
    }
}

// ============================================================================
// Socket Mode Envelope
// ============================================================================

/// What a socket-mode envelope carries.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEventKind {
    /// An Events API callback; must be acknowledged.
    EventsApi(EventsApiEvent),
    /// Connection greeting.
    Hello,
    /// The server is about to drop the connection.
    Disconnect,
    /// Any other envelope type (interactive, slash commands, ...).
    Other(String),
}

/// One socket-mode envelope as delivered by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketEvent {
    /// Identifier to acknowledge, absent on `hello`.
    pub envelope_id: Option<String>,
    pub kind: SocketEventKind,
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(default)]
    payload: Value,
}

impl SocketEvent {
    /// Wraps an Events API callback in an envelope.
    pub fn events_api(envelope_id: impl Into<String>, event: EventsApiEvent) -> Self {
        Self {
            envelope_id: Some(envelope_id.into()),
            kind: SocketEventKind::EventsApi(event),
        }
    }

    /// Parses an envelope from its socket frame.
    ///
    /// An `events_api` envelope whose payload does not deserialize is an error.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        let envelope: RawEnvelope = serde_json::from_str(raw)?;
        let kind = match envelope.kind.as_str() {
            "events_api" => SocketEventKind::EventsApi(serde_json::from_value(envelope.payload)?),
            "hello" => SocketEventKind::Hello,
            "disconnect" => SocketEventKind::Disconnect,
            other => SocketEventKind::Other(other.to_string()),
        };
        Ok(Self {
            envelope_id: envelope.envelope_id,
            kind,
        })
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Reports whether a callback was produced by a bot.
///
/// Messages from bots, `bot_message` subtypes and empty-text messages (edits,
/// joins and similar housekeeping) are all treated as bot traffic.
pub fn is_bot_message(event: &EventsApiEvent) -> bool {
    match &event.inner_event {
        InnerEvent::Message(ev) => {
            !ev.bot_id.is_empty() || ev.subtype == "bot_message" || ev.text.is_empty()
        }
        InnerEvent::AppMention(ev) => !ev.bot_id.is_empty(),
        InnerEvent::MetadataPosted(ev)
        | InnerEvent::MetadataUpdated(ev)
        | InnerEvent::MetadataDeleted(ev) => !ev.bot_id.is_empty(),
        InnerEvent::Other => false,
    }
}

/// Reports whether a callback was produced by a bot or by `self_id`.
///
/// Such events must never reach the pipeline.
pub fn is_self_authored(event: &EventsApiEvent, self_id: Option<&str>) -> bool {
    if is_bot_message(event) {
        return true;
    }
    let user = match &event.inner_event {
        InnerEvent::Message(ev) => &ev.user,
        InnerEvent::AppMention(ev) => &ev.user,
        InnerEvent::MetadataPosted(ev)
        | InnerEvent::MetadataUpdated(ev)
        | InnerEvent::MetadataDeleted(ev) => &ev.user,
        InnerEvent::Other => return false,
    };
    self_id.is_some_and(|id| id == user.as_str())
}

/// Turns an Events API callback into a canonical message.
///
/// Returns `None` for bot traffic, for events authored by `self_id` and for
/// every inner event other than `message`.
pub fn normalize(event: EventsApiEvent, self_id: Option<&str>) -> Option<Message> {
    if is_self_authored(&event, self_id) {
        trace!("Dropping bot or self-authored Slack event");
        return None;
    }

    match event.inner_event {
        InnerEvent::Message(ev) => Some(Message {
            user_id: ev.user.clone(),
            channel_id: ev.channel.clone(),
            content: ev.text.clone(),
            payload: NativePayload::Slack(Arc::new(ev)),
        }),
        _ => None,
    }
}

/// Normalizes the files of a message, in order.
pub fn attachments(event: &MessageEvent) -> Vec<Attachment> {
    event
        .files
        .iter()
        .map(|file| Attachment {
            is_image: file.is_image(),
            url: file.url_private.clone(),
            source: AttachmentSource::Slack(file.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(mimetype: &str) -> File {
        File {
            mimetype: mimetype.into(),
            url_private: "https://files.example.com/f".into(),
            ..Default::default()
        }
    }

    fn message(user: &str, text: &str) -> MessageEvent {
        MessageEvent {
            user: user.into(),
            text: text.into(),
            channel: "C456".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_image_classification() {
        assert!(file("image/png").is_image());
        assert!(file("image/jpeg").is_image());
        assert!(!file("application/pdf").is_image());
        assert!(!file("").is_image());
        assert!(!file("text").is_image());
    }

    #[test]
    fn test_attachments_use_private_url() {
        let mut ev = message("U123", "see file");
        ev.files = vec![file("image/png"), file("application/pdf")];

        let normalized = attachments(&ev);
        assert_eq!(normalized.len(), 2);
        assert!(normalized[0].is_image);
        assert!(!normalized[1].is_image);
        assert_eq!(normalized[0].url, "https://files.example.com/f");
    }

    #[test]
    fn test_is_bot_message() {
        let cases = [
            (
                InnerEvent::Message(MessageEvent {
                    bot_id: "B01".into(),
                    text: "hi".into(),
                    ..Default::default()
                }),
                true,
            ),
            (
                InnerEvent::Message(MessageEvent {
                    subtype: "bot_message".into(),
                    text: "test".into(),
                    ..Default::default()
                }),
                true,
            ),
            (InnerEvent::Message(message("U1", "")), true),
            (InnerEvent::Message(message("U1", "hello")), false),
            (
                InnerEvent::AppMention(AppMentionEvent {
                    bot_id: "B01".into(),
                    ..Default::default()
                }),
                true,
            ),
            (InnerEvent::AppMention(AppMentionEvent::default()), false),
            (
                InnerEvent::MetadataPosted(MetadataEvent {
                    bot_id: "B01".into(),
                    ..Default::default()
                }),
                true,
            ),
            (
                InnerEvent::MetadataUpdated(MetadataEvent {
                    bot_id: "B01".into(),
                    ..Default::default()
                }),
                true,
            ),
            (
                InnerEvent::MetadataDeleted(MetadataEvent {
                    bot_id: "B01".into(),
                    ..Default::default()
                }),
                true,
            ),
            (InnerEvent::MetadataDeleted(MetadataEvent::default()), false),
            (InnerEvent::Other, false),
        ];

        for (inner, expected) in cases {
            let event = EventsApiEvent::new(inner.clone());
            assert_eq!(is_bot_message(&event), expected, "{inner:?}");
        }
    }

    #[test]
    fn test_normalize_user_message() {
        let msg = normalize(
            EventsApiEvent::new(InnerEvent::Message(message("U123", "hello"))),
            Some("UBOT"),
        )
        .unwrap();
        assert_eq!(msg.user_id, "U123");
        assert_eq!(msg.channel_id, "C456");
        assert_eq!(msg.content, "hello");
        assert!(msg.payload.as_slack().is_some());
    }

    #[test]
    fn test_self_authored_by_identity() {
        let own = EventsApiEvent::new(InnerEvent::Message(message("UBOT", "hi")));
        assert!(is_self_authored(&own, Some("UBOT")));
        assert!(!is_self_authored(&own, Some("UOTHER")));
        assert!(!is_self_authored(&own, None));

        let mention = EventsApiEvent::new(InnerEvent::AppMention(AppMentionEvent {
            user: "UBOT".into(),
            ..Default::default()
        }));
        assert!(is_self_authored(&mention, Some("UBOT")));
    }

    #[test]
    fn test_normalize_drops_self_and_non_message() {
        let own = EventsApiEvent::new(InnerEvent::Message(message("UBOT", "hello")));
        assert!(normalize(own, Some("UBOT")).is_none());

        let mention = EventsApiEvent::new(InnerEvent::AppMention(AppMentionEvent {
            user: "U1".into(),
            text: "<@UBOT> hi".into(),
            ..Default::default()
        }));
        assert!(normalize(mention, Some("UBOT")).is_none());
    }

    #[test]
    fn test_socket_event_from_json() {
        let raw = r#"{
            "envelope_id": "env-1",
            "type": "events_api",
            "accepts_response_payload": false,
            "payload": {
                "type": "event_callback",
                "team_id": "T1",
                "event": {
                    "type": "message",
                    "user": "U123",
                    "text": "hello",
                    "channel": "C456",
                    "files": [{"mimetype": "image/png", "url_private": "https://f"}]
                }
            }
        }"#;
        let event = SocketEvent::from_json(raw).unwrap();
        assert_eq!(event.envelope_id.as_deref(), Some("env-1"));
        let SocketEventKind::EventsApi(api) = event.kind else {
            panic!("expected events_api envelope");
        };
        assert_eq!(api.team_id.as_deref(), Some("T1"));
        let InnerEvent::Message(msg) = api.inner_event else {
            panic!("expected message event");
        };
        assert!(msg.files[0].is_image());
    }

    #[test]
    fn test_socket_event_unknown_inner_and_envelope_types() {
        let raw = r#"{"envelope_id": "e", "type": "events_api",
                      "payload": {"event": {"type": "reaction_added", "user": "U1"}}}"#;
        let event = SocketEvent::from_json(raw).unwrap();
        assert_eq!(
            event.kind,
            SocketEventKind::EventsApi(EventsApiEvent::new(InnerEvent::Other))
        );

        let hello = SocketEvent::from_json(r#"{"type": "hello"}"#).unwrap();
        assert_eq!(hello.kind, SocketEventKind::Hello);
        assert!(hello.envelope_id.is_none());

        let slash = SocketEvent::from_json(r#"{"type": "slash_commands", "envelope_id": "x"}"#)
            .unwrap();
        assert_eq!(slash.kind, SocketEventKind::Other("slash_commands".into()));
    }

    #[test]
    fn test_socket_event_malformed_payload() {
        let raw = r#"{"envelope_id": "e", "type": "events_api", "payload": "invalid data type"}"#;
        assert!(SocketEvent::from_json(raw).is_err());
    }
}

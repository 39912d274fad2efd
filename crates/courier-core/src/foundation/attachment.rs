//! Normalized attachment references.
//!
//! Attachments are derived on demand from a message's [`NativePayload`] and
//! never cached. Each platform decides what counts as an image:
//!
//! | platform | image when                                  |
//! |----------|---------------------------------------------|
//! | discord  | width > 0 and height > 0                    |
//! | slack    | MIME type is non-empty and starts "image"   |

use crate::foundation::error::{Error, Result};
use crate::foundation::message::NativePayload;
use crate::platform::{discord, slack};

/// The platform record an [`Attachment`] was derived from.
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentSource {
    /// A Discord message attachment.
    Discord(discord::Attachment),
    /// A Slack shared file.
    Slack(slack::File),
}

/// A normalized media reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// Whether the platform metadata classifies this as an image.
    pub is_image: bool,
    /// Where the content can be fetched.
    pub url: String,
    /// The original platform record.
    pub source: AttachmentSource,
}

/// Derives the attachments of a payload, in native order.
///
/// An event without attachments yields an empty list. A synthetic payload has
/// no platform metadata to read and yields
/// [`Error::UnsupportedAttachmentSource`].
pub fn extract_attachments(payload: &NativePayload) -> Result<Vec<Attachment>> {
    match payload {
        NativePayload::Discord(event) => Ok(discord::attachments(event)),
        NativePayload::Slack(event) => Ok(slack::attachments(event)),
        NativePayload::Synthetic => Err(Error::unsupported_source(
            "synthetic message has no platform payload",
        )),
    }
}

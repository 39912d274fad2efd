//! Foundation layer - the canonical data model.
//!
//! - Message model shared by every platform
//! - Attachment extraction over native payloads
//! - Error types for the facade and its backend collaborators

pub mod attachment;
pub mod error;
pub mod message;

pub use attachment::{Attachment, AttachmentSource, extract_attachments};
pub use error::{BackendError, BackendResult, Error, Result};
pub use message::{BotType, Message, NativePayload};

//! Platform backends - native event models and their normalization rules.
//!
//! Each backend module owns:
//! - The serde model of the events its gateway delivers
//! - `normalize`, which turns a native event into a canonical [`Message`]
//!   (or drops it)
//! - `attachments`, the platform's image classification rule
//!
//! [`Message`]: crate::Message

pub mod discord;
pub mod slack;

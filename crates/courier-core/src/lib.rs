//! # Courier Core
//!
//! The dispatch core of the Courier chat-bot framework.
//!
//! Courier accepts inbound messages from heterogeneous chat backends,
//! normalizes them into one canonical [`Message`], runs them through an
//! ordered pipeline of [`Middleware`] and routes them to the first
//! [`Command`] whose pattern matches.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! - **Message Model**: [`Message`], [`NativePayload`], [`BotType`]
//! - **Attachments**: [`Attachment`] and [`extract_attachments`]
//! - **Errors**: [`Error`] and the collaborator's [`BackendError`]
//!
//! ### Framework Layer
//!
//! - **Pipeline**: [`Middleware`] steps walked by a [`Next`] cursor
//! - **Routing**: [`Router`] with first-match-wins [`Command`]s and a fallback
//! - **Tracing**: [`TraceEvent`]s delivered to an optional hook
//!
//! ### Integration Layer
//!
//! - **Gateway**: the [`Gateway`] contract each platform client implements
//! - **Bot**: the [`Bot`] facade
//!
//! ### Platforms
//!
//! - [`platform::discord`]: attachments classified by pixel dimensions
//! - [`platform::slack`]: socket-mode envelopes, files classified by MIME type
//!
//! ## Data Flow
//!
//! ```text
//! ┌─────────┐  native   ┌────────────┐ Message ┌────────────┐      ┌────────┐
//! │ Gateway │──event───▶│ normalize  │────────▶│ middleware │─...─▶│ Router │
//! └─────────┘           │ (drop self)│         └────────────┘      └────────┘
//!      ▲                └────────────┘                                 │
//!      └──────────────────── Bot::send_message ◀──────── handler ◀─────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use courier_core::prelude::*;
//! use std::sync::Arc;
//!
//! let mut bot = Bot::discord(Arc::new(my_gateway));
//!
//! bot.add_middleware(|bot: Arc<Bot>, msg: Arc<Message>, next: Next| async move {
//!     tracing::info!(user = %msg.user_id, "message");
//!     next.run(bot, msg).await;
//! });
//!
//! bot.add_command(r"^!echo (.+)", |bot: Arc<Bot>, msg: Arc<Message>| async move {
//!     let reply = msg.content.trim_start_matches("!echo ").to_string();
//!     let _ = bot.send_message(&msg.channel_id, &reply).await;
//! });
//!
//! let bot = Arc::new(bot);
//! bot.connect().await?;
//! bot.start_listening().await;
//! ```

// Architectural layers
pub mod foundation;
pub mod framework;
pub mod integration;
pub mod platform;

// Re-export foundation types
pub use foundation::{
    Attachment, AttachmentSource, BackendError, BackendResult, BotType, Error, Message,
    NativePayload, Result, extract_attachments,
};

// Re-export framework types
pub use framework::{
    BoxedCommandHandler, BoxedMiddleware, Command, CommandHandler, Middleware, Next, Pipeline,
    Resolution, Router, TraceEvent, TraceHook,
};

// Re-export integration types
pub use integration::{
    Backend, Bot, EventCallback, Gateway, SessionState, ShutdownPolicy, wait_for_shutdown,
};

pub use futures::future::BoxFuture;

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::{Attachment, BackendError, BotType, Error, Message, NativePayload};
    pub use super::framework::{Command, CommandHandler, Middleware, Next, TraceEvent};
    pub use super::integration::{Bot, EventCallback, Gateway, ShutdownPolicy};
    pub use super::platform::{discord, slack};
    pub use super::BoxFuture;
}

//! # Courier
//!
//! A multi-platform chat-bot dispatch framework for Rust.
//!
//! ## Overview
//!
//! Courier receives messages from chat platforms (Discord, Slack), turns
//! them into one canonical [`Message`](core::Message), runs them through an
//! ordered middleware chain and hands them to the first command whose regex
//! matches.
//!
//! ```text
//! ┌──────────┐     ┌───────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ Launcher │────▶│    Bot    │────▶│ middleware 1..n │────▶│ Router          │──▶ reply
//! │ (config, │     │ (gateway) │     └─────────────────┘     │ first match or  │
//! │  logging)│     └───────────┘                             │ unknown handler │
//! └──────────┘                                               └─────────────────┘
//! ```
//!
//! - **Launcher**: loads configuration, installs logging, runs until Ctrl+C
//! - **Bot**: the facade over one platform gateway
//! - **Middleware**: steps that may rewrite, observe or stop a message
//! - **Commands**: regex-triggered async handlers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut bot = Bot::slack(Arc::new(my_socket_client));
//!
//!     bot.add_command(r"^!echo (.+)", |bot: Arc<Bot>, msg: Arc<Message>| async move {
//!         let reply = msg.content.trim_start_matches("!echo ").to_string();
//!         let _ = bot.send_message(&msg.channel_id, &reply).await;
//!     });
//!
//!     Launcher::builder().build()?.launch(bot).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: read `courier.toml` (default)
//! - `yaml-config`: read `courier.yaml` / `courier.yml`
//! - `json-log`: allow `logging.format = "json"`

pub use courier_core as core;
pub use courier_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    // Runtime - main entry point
    pub use courier_runtime::{CourierConfig, Launcher, RuntimeError};

    // Bot facade and registration
    pub use courier_core::prelude::*;

    // Logging macros
    pub use courier_runtime::prelude::*;
}

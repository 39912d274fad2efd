//! Courier Runtime - Launch orchestration for Courier bots.
//!
//! This crate provides:
//! - Layered configuration (`courier.toml`, profiles, `COURIER_*` variables)
//! - Logging setup on top of `tracing-subscriber`
//! - The [`Launcher`], which connects a bot, listens until a shutdown
//!   signal, drains in-flight dispatches and disconnects
//!
//! ```ignore
//! use std::sync::Arc;
//! use courier_core::{Bot, Message};
//! use courier_runtime::Launcher;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut bot = Bot::discord(Arc::new(my_gateway));
//!     bot.add_command("^!ping$", |bot: Arc<Bot>, msg: Arc<Message>| async move {
//!         let _ = bot.send_message(&msg.channel_id, "pong").await;
//!     });
//!
//!     // Loads courier.toml, installs logging, runs until Ctrl+C
//!     Launcher::builder().build()?.launch(bot).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod launcher;
pub mod logging;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, CourierConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use launcher::{Launcher, LauncherBuilder};
pub use logging::{LoggingBuilder, LoggingError, SpanEvents};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}

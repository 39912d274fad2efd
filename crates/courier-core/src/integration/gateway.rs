//! Backend collaborator contract.
//!
//! A [`Gateway`] owns everything about talking to one chat platform: the
//! socket, authentication, heartbeats and reconnection. The core only needs
//! to open and close a session, receive native events through a callback and
//! send text to a channel.
//!
//! # Implementing a gateway
//!
//! ```rust,ignore
//! struct MyDiscordClient { /* ... */ }
//!
//! #[async_trait]
//! impl Gateway for MyDiscordClient {
//!     type Event = discord::MessageCreate;
//!
//!     fn self_id(&self) -> Option<String> {
//!         self.current_user.read().clone()
//!     }
//!
//!     async fn open(&self, on_event: EventCallback<Self::Event>) -> BackendResult<()> {
//!         // spawn the reader; call `on_event(event).await` per MESSAGE_CREATE
//!         Ok(())
//!     }
//!
//!     async fn close(&self) -> BackendResult<()> { Ok(()) }
//!
//!     async fn send_text(&self, channel: &str, text: &str) -> BackendResult<()> { Ok(()) }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::foundation::error::BackendResult;

/// Callback a gateway invokes once per inbound native event.
///
/// The returned future completes once the event has been dispatched (or
/// dropped). A gateway that wants events processed concurrently spawns one
/// task per call.
pub type EventCallback<E> = Arc<dyn Fn(E) -> BoxFuture<'static, ()> + Send + Sync>;

/// A chat platform client as seen by the core.
#[async_trait]
pub trait Gateway: Send + Sync + 'static {
    /// The native event type delivered to the callback.
    type Event: Send + 'static;

    /// The bot's own user identifier, once known.
    ///
    /// Events authored by this identifier are dropped before dispatch.
    fn self_id(&self) -> Option<String>;

    /// Establishes the session and starts delivering events to `on_event`.
    async fn open(&self, on_event: EventCallback<Self::Event>) -> BackendResult<()>;

    /// Tears down the session.
    async fn close(&self) -> BackendResult<()>;

    /// Sends `text` to `channel`.
    async fn send_text(&self, channel: &str, text: &str) -> BackendResult<()>;

    /// Acknowledges a delivered envelope.
    ///
    /// Only platforms with acknowledged delivery need to override this.
    async fn acknowledge(&self, _envelope_id: &str) -> BackendResult<()> {
        Ok(())
    }
}

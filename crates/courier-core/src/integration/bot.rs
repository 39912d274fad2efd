//! The bot facade.
//!
//! A [`Bot`] owns one backend gateway, the middleware pipeline and the
//! command router. It is the single entry point applications use:
//!
//! ```rust,ignore
//! let mut bot = Bot::slack(Arc::new(my_socket_client));
//! bot.add_middleware(log_everything);
//! bot.add_command(r"^!ping\b", |bot: Arc<Bot>, msg: Arc<Message>| async move {
//!     let _ = bot.send_message(&msg.channel_id, "pong").await;
//! });
//!
//! let bot = Arc::new(bot);
//! bot.connect().await?;
//! bot.start_listening().await;
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──connect──▶ Connecting ──▶ Connected ──disconnect──▶ Closing ──▶ Closed
//!                       │ open failed      ▲               close failed │      │
//!                       ▼                  └────────────────────────────┘      │
//!                  previous state   ◀──────────────connect─────────────────────┘
//! ```
//!
//! Registration (`add_*`, `set_*`) takes `&mut self` and therefore finishes
//! before the bot is shared. Every operation that branches on the platform
//! rejects [`Backend::Unsupported`] with [`Error::UnrecognizedBotType`].
//!
//! # Shutdown
//!
//! Dispatches started from gateway events are tracked. On shutdown the bot
//! stops accepting new events, waits for in-flight dispatches for at most
//! [`ShutdownPolicy::drain_timeout`], then disconnects.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::signal;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

use crate::foundation::attachment::{Attachment, extract_attachments};
use crate::foundation::error::{BackendError, Error, Result};
use crate::foundation::message::{BotType, Message};
use crate::framework::pipeline::{Middleware, Pipeline};
use crate::framework::router::{Command, CommandHandler};
use crate::framework::trace::TraceEvent;
use crate::integration::gateway::{EventCallback, Gateway};
use crate::platform::slack::SocketEventKind;
use crate::platform::{discord, slack};

// ============================================================================
// Backend
// ============================================================================

/// The gateway a bot talks through, keyed by platform.
#[derive(Clone)]
pub enum Backend {
    /// A Discord-style gateway delivering `MESSAGE_CREATE` events.
    Discord(Arc<dyn Gateway<Event = discord::MessageCreate>>),
    /// A Slack-style socket-mode gateway delivering envelopes.
    Slack(Arc<dyn Gateway<Event = slack::SocketEvent>>),
    /// A platform this build has no backend for.
    Unsupported(String),
}

impl Backend {
    /// Returns the platform tag.
    pub fn bot_type(&self) -> BotType {
        match self {
            Self::Discord(_) => BotType::Discord,
            Self::Slack(_) => BotType::Slack,
            Self::Unsupported(name) => BotType::Other(name.clone()),
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discord(_) => f.write_str("Backend::Discord"),
            Self::Slack(_) => f.write_str("Backend::Slack"),
            Self::Unsupported(name) => write!(f, "Backend::Unsupported({name})"),
        }
    }
}

// ============================================================================
// Session and Shutdown
// ============================================================================

/// Backend session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Never connected.
    Idle,
    /// `Gateway::open` is in progress.
    Connecting,
    /// Open; events are dispatched.
    Connected,
    /// `Gateway::close` is in progress.
    Closing,
    /// Closed by `disconnect` or shutdown.
    Closed,
}

/// How long shutdown waits for in-flight dispatches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownPolicy {
    /// Upper bound on the drain. Dispatches still running afterwards keep
    /// running but the session is closed under them.
    pub drain_timeout: Duration,
}

impl ShutdownPolicy {
    /// Default drain timeout.
    pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a policy waiting at most `drain_timeout` for in-flight dispatches.
    pub fn new(drain_timeout: Duration) -> Self {
        Self { drain_timeout }
    }
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DRAIN_TIMEOUT)
    }
}

// ============================================================================
// Bot
// ============================================================================

/// A chat bot bound to one backend.
pub struct Bot {
    backend: Backend,
    pipeline: Arc<Pipeline>,
    session: Mutex<SessionState>,
    tracker: TaskTracker,
    shutdown: ShutdownPolicy,
}

impl Bot {
    /// Creates a bot over any backend.
    pub fn from_backend(backend: Backend) -> Self {
        Self {
            backend,
            pipeline: Arc::new(Pipeline::new()),
            session: Mutex::new(SessionState::Idle),
            tracker: TaskTracker::new(),
            shutdown: ShutdownPolicy::default(),
        }
    }

    /// Creates a bot over a Discord-style gateway.
    pub fn discord<G>(gateway: Arc<G>) -> Self
    where
        G: Gateway<Event = discord::MessageCreate>,
    {
        Self::from_backend(Backend::Discord(gateway))
    }

    /// Creates a bot over a Slack-style socket-mode gateway.
    pub fn slack<G>(gateway: Arc<G>) -> Self
    where
        G: Gateway<Event = slack::SocketEvent>,
    {
        Self::from_backend(Backend::Slack(gateway))
    }

    /// Creates a bot for a platform without a backend in this build.
    ///
    /// Every platform-specific operation on it fails with
    /// [`Error::UnrecognizedBotType`].
    pub fn unsupported(platform: impl Into<String>) -> Self {
        Self::from_backend(Backend::Unsupported(platform.into()))
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    fn pipeline_mut(&mut self) -> &mut Pipeline {
        Arc::make_mut(&mut self.pipeline)
    }

    /// Registers a command. Commands are tried in registration order.
    pub fn add_handler(&mut self, command: Command) {
        self.pipeline_mut().router_mut().add(command);
    }

    /// Registers `handler` for messages whose content matches `pattern`.
    pub fn add_command<H>(&mut self, pattern: impl Into<String>, handler: H)
    where
        H: CommandHandler,
    {
        self.add_handler(Command::new(pattern, handler));
    }

    /// Appends a middleware. The first registered runs first.
    pub fn add_middleware<M>(&mut self, middleware: M)
    where
        M: Middleware,
    {
        self.pipeline_mut().push(middleware);
    }

    /// Sets the handler run when no command matches.
    pub fn set_unknown_command_handler<H>(&mut self, handler: H)
    where
        H: CommandHandler,
    {
        self.pipeline_mut().router_mut().set_unknown_handler(handler);
    }

    /// Installs a hook receiving every [`TraceEvent`].
    pub fn set_trace_hook<F>(&mut self, hook: F)
    where
        F: Fn(&TraceEvent) + Send + Sync + 'static,
    {
        self.pipeline_mut().set_trace_hook(Some(Arc::new(hook)));
    }

    /// Replaces the drain policy used by [`Bot::start_listening`].
    pub fn set_shutdown_policy(&mut self, policy: ShutdownPolicy) {
        self.shutdown = policy;
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// The platform this bot talks to.
    pub fn bot_type(&self) -> BotType {
        self.backend.bot_type()
    }

    /// The gateway this bot owns.
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Number of registered commands, malformed patterns included.
    pub fn command_count(&self) -> usize {
        self.pipeline.router().len()
    }

    /// Number of registered middleware.
    pub fn middleware_count(&self) -> usize {
        self.pipeline.middleware_count()
    }

    /// Whether a fallback for unmatched messages is set.
    pub fn has_unknown_command_handler(&self) -> bool {
        self.pipeline.router().has_unknown_handler()
    }

    /// Current state of the backend session.
    pub fn session_state(&self) -> SessionState {
        *self.session.lock()
    }

    /// The drain policy applied on shutdown.
    pub fn shutdown_policy(&self) -> &ShutdownPolicy {
        &self.shutdown
    }

    /// Number of dispatches currently running on behalf of the gateway.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Opens the backend session and starts receiving events.
    ///
    /// The callback handed to the gateway holds only a weak reference, so the
    /// gateway never keeps the bot alive. Connecting an open (or opening)
    /// session is a no-op. A bot that was shut down accepts events again once
    /// reconnected.
    pub async fn connect(self: &Arc<Self>) -> Result<()> {
        if let Backend::Unsupported(name) = &self.backend {
            return Err(Error::UnrecognizedBotType(name.clone()));
        }

        let previous = {
            let mut state = self.session.lock();
            match *state {
                SessionState::Connecting | SessionState::Connected => {
                    warn!(
                        bot_type = %self.bot_type(),
                        state = ?*state,
                        "Bot is already connected"
                    );
                    return Ok(());
                }
                SessionState::Closing => {
                    let reason = "session is still closing";
                    return Err(BackendError::connection_failed(reason).into());
                }
                previous @ (SessionState::Idle | SessionState::Closed) => {
                    *state = SessionState::Connecting;
                    previous
                }
            }
        };

        // Undo the shutdown of a previous session.
        self.tracker.reopen();

        if let Err(e) = self.open_gateway().await {
            *self.session.lock() = previous;
            if previous == SessionState::Closed {
                self.tracker.close();
            }
            return Err(e);
        }

        *self.session.lock() = SessionState::Connected;
        info!(
            bot_type = %self.bot_type(),
            commands = self.command_count(),
            middleware = self.middleware_count(),
            "Bot connected"
        );
        Ok(())
    }

    async fn open_gateway(self: &Arc<Self>) -> Result<()> {
        match &self.backend {
            Backend::Discord(gateway) => {
                let bot = Arc::downgrade(self);
                let callback: EventCallback<discord::MessageCreate> = Arc::new(move |event| {
                    let bot = bot.clone();
                    async move {
                        if let Some(bot) = bot.upgrade() {
                            bot.on_discord_event(event).await;
                        }
                    }
                    .boxed()
                });
                gateway.open(callback).await?;
            }
            Backend::Slack(gateway) => {
                let bot = Arc::downgrade(self);
                let callback: EventCallback<slack::SocketEvent> = Arc::new(move |event| {
                    let bot = bot.clone();
                    async move {
                        if let Some(bot) = bot.upgrade() {
                            bot.on_slack_event(event).await;
                        }
                    }
                    .boxed()
                });
                gateway.open(callback).await?;
            }
            Backend::Unsupported(name) => return Err(Error::UnrecognizedBotType(name.clone())),
        }
        Ok(())
    }

    /// Closes the backend session.
    ///
    /// Closing a session that was never opened, or is already closed, succeeds
    /// without touching the gateway. If the gateway fails to close, the error
    /// is returned and the session stays open, so the call can be retried.
    pub async fn disconnect(&self) -> Result<()> {
        let closed = match &self.backend {
            Backend::Discord(gateway) => {
                if !self.begin_close() {
                    return Ok(());
                }
                gateway.close().await
            }
            Backend::Slack(gateway) => {
                if !self.begin_close() {
                    return Ok(());
                }
                gateway.close().await
            }
            Backend::Unsupported(name) => return Err(Error::UnrecognizedBotType(name.clone())),
        };

        let mut state = self.session.lock();
        match closed {
            Ok(()) => {
                *state = SessionState::Closed;
                info!(bot_type = %self.backend.bot_type(), "Bot disconnected");
                Ok(())
            }
            Err(e) => {
                *state = SessionState::Connected;
                warn!(error = %e, "Gateway failed to close, session still open");
                Err(e.into())
            }
        }
    }

    /// Moves an open session to `Closing`; returns whether it was open.
    fn begin_close(&self) -> bool {
        let mut state = self.session.lock();
        if *state != SessionState::Connected {
            debug!(state = ?*state, "Session not open, nothing to close");
            return false;
        }
        *state = SessionState::Closing;
        true
    }

    /// Sends `text` to `channel`. Backend errors are returned unchanged.
    pub async fn send_message(&self, channel: &str, text: &str) -> Result<()> {
        match &self.backend {
            Backend::Discord(gateway) => gateway.send_text(channel, text).await?,
            Backend::Slack(gateway) => gateway.send_text(channel, text).await?,
            Backend::Unsupported(name) => return Err(Error::UnrecognizedBotType(name.clone())),
        }
        trace!(channel, "Message sent");
        Ok(())
    }

    /// Derives the attachments of `message` from its native payload.
    ///
    /// Fails with [`Error::UnsupportedAttachmentSource`] when the payload
    /// belongs to another platform or is synthetic.
    pub fn get_attachments(&self, message: &Message) -> Result<Vec<Attachment>> {
        let expected = match &self.backend {
            Backend::Discord(_) => BotType::Discord,
            Backend::Slack(_) => BotType::Slack,
            Backend::Unsupported(name) => return Err(Error::UnrecognizedBotType(name.clone())),
        };

        match message.payload.bot_type() {
            Some(found) if found != expected => Err(Error::unsupported_source(format!(
                "{found} payload on a {expected} bot"
            ))),
            _ => extract_attachments(&message.payload),
        }
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Runs `message` through the middleware pipeline and the router.
    pub async fn dispatch(self: &Arc<Self>, message: Message) {
        Arc::clone(&self.pipeline)
            .run(Arc::clone(self), Arc::new(message))
            .await;
    }

    /// Dispatches on a tracked future, unless shutdown has begun.
    async fn dispatch_tracked(self: &Arc<Self>, message: Message) {
        if self.tracker.is_closed() {
            debug!("Shutting down, event not dispatched");
            return;
        }
        self.tracker.track_future(self.dispatch(message)).await;
    }

    async fn on_discord_event(self: &Arc<Self>, event: discord::MessageCreate) {
        let Backend::Discord(gateway) = &self.backend else {
            return;
        };
        let self_id = gateway.self_id();

        match discord::normalize(event, self_id.as_deref()) {
            Some(message) => self.dispatch_tracked(message).await,
            None => self.pipeline.emit(TraceEvent::SelfAuthoredDropped),
        }
    }

    async fn on_slack_event(self: &Arc<Self>, event: slack::SocketEvent) {
        let Backend::Slack(gateway) = &self.backend else {
            return;
        };
        let payload = match event.kind {
            SocketEventKind::EventsApi(payload) => payload,
            other => {
                trace!(kind = ?other, "Ignoring socket-mode envelope");
                return;
            }
        };

        if let Some(envelope_id) = &event.envelope_id
            && let Err(e) = gateway.acknowledge(envelope_id).await
        {
            warn!(envelope_id = %envelope_id, error = %e, "Failed to acknowledge envelope");
        }

        let self_id = gateway.self_id();
        if slack::is_self_authored(&payload, self_id.as_deref()) {
            self.pipeline.emit(TraceEvent::SelfAuthoredDropped);
            return;
        }
        if let Some(message) = slack::normalize(payload, self_id.as_deref()) {
            self.dispatch_tracked(message).await;
        }
    }

    // ------------------------------------------------------------------------
    // Listening
    // ------------------------------------------------------------------------

    /// Blocks until SIGINT or SIGTERM, then drains and disconnects.
    ///
    /// A failed disconnect is logged, not returned.
    pub async fn start_listening(&self) {
        info!("Listening for events, press Ctrl+C to stop");
        self.start_listening_until(wait_for_shutdown()).await;
    }

    /// Like [`Bot::start_listening`] with a caller-supplied shutdown signal.
    pub async fn start_listening_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        shutdown.await;
        self.drain().await;

        if let Err(e) = self.disconnect().await {
            error!(error = %e, "Failed to disconnect during shutdown");
        }
    }

    /// Stops accepting events and waits for in-flight dispatches.
    async fn drain(&self) {
        self.tracker.close();

        let pending = self.tracker.len();
        if pending > 0 {
            debug!(pending, "Waiting for in-flight dispatches");
        }

        let timeout = self.shutdown.drain_timeout;
        if tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                pending = self.tracker.len(),
                timeout_ms = timeout.as_millis() as u64,
                "Drain timeout elapsed with dispatches still running"
            );
        }
    }
}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("backend", &self.backend)
            .field("pipeline", &self.pipeline)
            .field("session", &*self.session.lock())
            .field("shutdown", &self.shutdown)
            .finish()
    }
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal as unix_signal};

        match unix_signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::foundation::error::{BackendError, BackendResult};
    use crate::foundation::message::NativePayload;
    use crate::framework::pipeline::Next;

    #[derive(Default)]
    struct NullDiscord {
        closes: AtomicUsize,
    }

    #[async_trait]
    impl Gateway for NullDiscord {
        type Event = discord::MessageCreate;

        fn self_id(&self) -> Option<String> {
            None
        }

        async fn open(&self, _on_event: EventCallback<Self::Event>) -> BackendResult<()> {
            Ok(())
        }

        async fn close(&self) -> BackendResult<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn send_text(&self, channel: &str, _text: &str) -> BackendResult<()> {
            Err(BackendError::send_rejected(channel, "channel_not_found"))
        }
    }

    #[test]
    fn test_registration_counts() {
        let mut bot = Bot::unsupported("irc");
        assert_eq!(bot.bot_type(), BotType::Other("irc".into()));
        assert_eq!(bot.command_count(), 0);
        assert!(!bot.has_unknown_command_handler());

        bot.add_command("a", |_b: Arc<Bot>, _m: Arc<Message>| async {});
        bot.add_command("b", |_b: Arc<Bot>, _m: Arc<Message>| async {});
        bot.add_middleware(|b: Arc<Bot>, m: Arc<Message>, n: Next| async move {
            n.run(b, m).await
        });
        bot.set_unknown_command_handler(|_b: Arc<Bot>, _m: Arc<Message>| async {});

        assert_eq!(bot.command_count(), 2);
        assert_eq!(bot.middleware_count(), 1);
        assert!(bot.has_unknown_command_handler());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let gateway = Arc::new(NullDiscord::default());
        let bot = Arc::new(Bot::discord(Arc::clone(&gateway)));

        bot.disconnect().await.unwrap();
        assert_eq!(gateway.closes.load(Ordering::SeqCst), 0);
        assert_eq!(bot.session_state(), SessionState::Idle);

        bot.connect().await.unwrap();
        assert_eq!(bot.session_state(), SessionState::Connected);

        bot.disconnect().await.unwrap();
        bot.disconnect().await.unwrap();
        assert_eq!(gateway.closes.load(Ordering::SeqCst), 1);
        assert_eq!(bot.session_state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_send_error_passes_through() {
        let bot = Bot::discord(Arc::new(NullDiscord::default()));
        let err = bot.send_message("C1", "hi").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Backend(BackendError::SendRejected { ref channel, .. }) if channel == "C1"
        ));
    }

    #[test]
    fn test_attachments_from_other_platform() {
        let bot = Bot::discord(Arc::new(NullDiscord::default()));
        let message = Message::new("U1", "C1", "hi").with_payload(NativePayload::Slack(
            Arc::new(slack::MessageEvent::default()),
        ));
        assert!(matches!(
            bot.get_attachments(&message),
            Err(Error::UnsupportedAttachmentSource { .. })
        ));
    }

    #[tokio::test]
    async fn test_listen_until_drains_and_disconnects() {
        let gateway = Arc::new(NullDiscord::default());
        let mut bot = Bot::discord(Arc::clone(&gateway));
        bot.set_shutdown_policy(ShutdownPolicy::new(Duration::from_millis(50)));
        let bot = Arc::new(bot);

        bot.connect().await.unwrap();
        bot.start_listening_until(async {}).await;

        assert_eq!(gateway.closes.load(Ordering::SeqCst), 1);
        assert_eq!(bot.session_state(), SessionState::Closed);
    }
}

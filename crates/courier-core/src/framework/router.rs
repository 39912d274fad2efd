//! Command router.
//!
//! The router is a flat, ordered list of [`Command`]s plus an optional
//! unknown-command handler. Routing a message scans the commands in
//! registration order and runs the first one whose pattern matches the
//! content (search semantics, so `ping` matches `"say ping"` unless the
//! pattern anchors itself). When nothing matches, the unknown-command handler
//! runs if one is set; otherwise the message is dropped.
//!
//! ```rust,ignore
//! let mut router = Router::new();
//! router.add(Command::new(r"^!ping\b", |bot: Arc<Bot>, msg: Arc<Message>| async move {
//!     let _ = bot.send_message(&msg.channel_id, "pong").await;
//! }));
//! router.set_unknown_handler(|_bot, _msg| async {});
//! ```
//!
//! A pattern that fails to compile is reported once at registration and then
//! behaves as a command that never matches; scanning always continues past it.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use regex::Regex;
use tracing::{debug, trace, warn};

use crate::foundation::message::Message;
use crate::framework::trace::{TraceEvent, TraceHook};
use crate::integration::bot::Bot;

// ============================================================================
// Handlers
// ============================================================================

/// Something that runs when a command (or the unknown-command path) fires.
///
/// Implemented for every `Fn(Arc<Bot>, Arc<Message>) -> impl Future<Output = ()>`.
pub trait CommandHandler: Send + Sync + 'static {
    /// Runs the handler for `message`.
    fn call(&self, bot: Arc<Bot>, message: Arc<Message>) -> BoxFuture<'static, ()>;
}

impl<F, Fut> CommandHandler for F
where
    F: Fn(Arc<Bot>, Arc<Message>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, bot: Arc<Bot>, message: Arc<Message>) -> BoxFuture<'static, ()> {
        (self)(bot, message).boxed()
    }
}

/// A shared, type-erased command handler.
pub type BoxedCommandHandler = Arc<dyn CommandHandler>;

// ============================================================================
// Command
// ============================================================================

/// A routing entry: a regular expression over message content and its handler.
#[derive(Clone)]
pub struct Command {
    pattern: String,
    regex: Result<Regex, regex::Error>,
    handler: BoxedCommandHandler,
}

impl Command {
    /// Creates a command, compiling `pattern` once.
    pub fn new<H>(pattern: impl Into<String>, handler: H) -> Self
    where
        H: CommandHandler,
    {
        Self::from_boxed(pattern, Arc::new(handler))
    }

    /// Creates a command from an already shared handler.
    pub fn from_boxed(pattern: impl Into<String>, handler: BoxedCommandHandler) -> Self {
        let pattern = pattern.into();
        let regex = Regex::new(&pattern);
        if let Err(e) = &regex {
            warn!(pattern = %pattern, error = %e, "Malformed command pattern, it will never match");
        }
        Self {
            pattern,
            regex,
            handler,
        }
    }

    /// The pattern source as registered.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The compile error, if the pattern is malformed.
    pub fn pattern_error(&self) -> Option<&regex::Error> {
        self.regex.as_ref().err()
    }

    /// Returns `true` if the pattern compiled and finds a match in `content`.
    pub fn matches(&self, content: &str) -> bool {
        self.regex.as_ref().is_ok_and(|re| re.is_match(content))
    }

    /// The handler run when this command is selected.
    pub fn handler(&self) -> &BoxedCommandHandler {
        &self.handler
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("pattern", &self.pattern)
            .field("valid", &self.regex.is_ok())
            .finish()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Outcome of scanning the command list for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The command at this index (registration order) matched first.
    Command(usize),
    /// Nothing matched; the unknown-command handler is set.
    Fallback,
    /// Nothing matched and no unknown-command handler is set.
    Unhandled,
}

/// Ordered command list with an optional unknown-command handler.
#[derive(Clone, Default)]
pub struct Router {
    commands: Vec<Command>,
    unknown: Option<BoxedCommandHandler>,
}

impl Router {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command. Commands are tried in the order they are added.
    pub fn add(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Sets the handler run when no command matches, replacing any previous one.
    pub fn set_unknown_handler<H>(&mut self, handler: H)
    where
        H: CommandHandler,
    {
        self.unknown = Some(Arc::new(handler));
    }

    /// Returns the registered commands, in order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Returns the number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Returns `true` if an unknown-command handler is set.
    pub fn has_unknown_handler(&self) -> bool {
        self.unknown.is_some()
    }

    /// Scans the commands for `content` without running anything.
    pub fn resolve(&self, content: &str) -> Resolution {
        for (index, command) in self.commands.iter().enumerate() {
            if command.matches(content) {
                return Resolution::Command(index);
            }
            trace!(index, pattern = %command.pattern, "Command did not match");
        }

        if self.unknown.is_some() {
            Resolution::Fallback
        } else {
            Resolution::Unhandled
        }
    }

    /// Resolves `message` and runs the selected handler, if any.
    ///
    /// At most one handler runs per call.
    pub async fn route(
        &self,
        bot: Arc<Bot>,
        message: Arc<Message>,
        hook: Option<&TraceHook>,
    ) -> Resolution {
        let resolution = self.resolve(&message.content);
        let emit = |event: TraceEvent| {
            if let Some(hook) = hook {
                hook(&event);
            }
        };

        match resolution {
            Resolution::Command(index) => {
                let command = &self.commands[index];
                debug!(index, pattern = %command.pattern, "Command matched");
                emit(TraceEvent::CommandMatched {
                    index,
                    pattern: command.pattern.clone(),
                });
                command.handler.call(bot, message).await;
            }
            Resolution::Fallback => {
                debug!("No command matched, running unknown-command handler");
                emit(TraceEvent::FallbackInvoked);
                if let Some(handler) = &self.unknown {
                    handler.call(bot, message).await;
                }
            }
            Resolution::Unhandled => {
                debug!("No command matched");
                emit(TraceEvent::Unhandled);
            }
        }

        resolution
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("commands", &self.commands)
            .field("has_unknown_handler", &self.unknown.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;

    fn noop() -> impl CommandHandler {
        |_bot: Arc<Bot>, _msg: Arc<Message>| async {}
    }

    fn recording(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> impl CommandHandler {
        let log = Arc::clone(log);
        move |_bot: Arc<Bot>, _msg: Arc<Message>| {
            let log = Arc::clone(&log);
            async move { log.lock().push(name) }
        }
    }

    #[test]
    fn test_resolve_first_match_wins() {
        let mut router = Router::new();
        router.add(Command::new("^hello$", noop()));
        router.add(Command::new("hello", noop()));
        router.add(Command::new("h", noop()));

        assert_eq!(router.resolve("hello"), Resolution::Command(0));
        assert_eq!(router.resolve("oh hello there"), Resolution::Command(1));
        assert_eq!(router.resolve("hi"), Resolution::Command(2));
        assert_eq!(router.resolve("xyz"), Resolution::Unhandled);
    }

    #[test]
    fn test_search_semantics() {
        let cmd = Command::new("ping", noop());
        assert!(cmd.matches("say ping please"));
        assert!(!Command::new("^ping$", noop()).matches("say ping"));
    }

    #[test]
    fn test_malformed_pattern_never_matches() {
        let cmd = Command::new("(", noop());
        assert!(cmd.pattern_error().is_some());
        assert!(!cmd.matches("("));
        assert!(!cmd.matches(""));

        let mut router = Router::new();
        router.add(cmd);
        router.add(Command::new(".*", noop()));
        assert_eq!(router.resolve("anything"), Resolution::Command(1));
    }

    #[test]
    fn test_fallback_only_when_set() {
        let mut router = Router::new();
        router.add(Command::new("^a$", noop()));
        assert_eq!(router.resolve("b"), Resolution::Unhandled);

        router.set_unknown_handler(noop());
        assert!(router.has_unknown_handler());
        assert_eq!(router.resolve("b"), Resolution::Fallback);
        assert_eq!(router.resolve("a"), Resolution::Command(0));
    }

    #[tokio::test]
    async fn test_route_runs_exactly_one_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = Router::new();
        router.add(Command::new("^x", recording(&log, "first")));
        router.add(Command::new("x", recording(&log, "second")));
        router.set_unknown_handler(recording(&log, "unknown"));

        let bot = Arc::new(Bot::unsupported("test"));
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let hook: TraceHook = Arc::new(move |_event: &TraceEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let outcome = router
            .route(
                Arc::clone(&bot),
                Arc::new(Message::new("u", "c", "xx")),
                Some(&hook),
            )
            .await;
        assert_eq!(outcome, Resolution::Command(0));

        let outcome = router
            .route(bot, Arc::new(Message::new("u", "c", "none")), None)
            .await;
        assert_eq!(outcome, Resolution::Fallback);

        assert_eq!(*log.lock(), ["first", "unknown"]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}

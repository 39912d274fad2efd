//! Middleware pipeline.
//!
//! A [`Pipeline`] is an ordered list of [`Middleware`] followed by the
//! [`Router`]. It is traversed with a [`Next`] cursor: each middleware gets
//! the cursor pointing at its successor and decides whether, when, how often
//! and with which message to call it.
//!
//! ```text
//! dispatch ──▶ mw[0] ──next──▶ mw[1] ──next──▶ ... ──next──▶ Router
//!                 │                │
//!                 └─ returns without calling next: nothing downstream runs
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! bot.add_middleware(|bot: Arc<Bot>, msg: Arc<Message>, next: Next| async move {
//!     if msg.content.is_empty() {
//!         return; // short-circuit
//!     }
//!     next.run(bot, msg).await;
//! });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{Instrument, debug_span, trace};

use crate::foundation::message::Message;
use crate::framework::router::Router;
use crate::framework::trace::{TraceEvent, TraceHook};
use crate::integration::bot::Bot;

// ============================================================================
// Middleware
// ============================================================================

/// A cross-cutting step run before routing.
///
/// Implemented for every
/// `Fn(Arc<Bot>, Arc<Message>, Next) -> impl Future<Output = ()>`.
pub trait Middleware: Send + Sync + 'static {
    /// Processes `message`. Calling `next.run` continues the pipeline; not
    /// calling it stops the message here.
    fn handle(&self, bot: Arc<Bot>, message: Arc<Message>, next: Next) -> BoxFuture<'static, ()>;
}

impl<F, Fut> Middleware for F
where
    F: Fn(Arc<Bot>, Arc<Message>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn handle(&self, bot: Arc<Bot>, message: Arc<Message>, next: Next) -> BoxFuture<'static, ()> {
        (self)(bot, message, next).boxed()
    }
}

/// A shared, type-erased middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

// ============================================================================
// Pipeline
// ============================================================================

/// Middleware list, router and trace hook of a bot.
///
/// The bot holds it behind an `Arc` and clones on write, so a dispatch keeps
/// the snapshot it started with.
#[derive(Clone, Default)]
pub struct Pipeline {
    middleware: Vec<BoxedMiddleware>,
    router: Router,
    trace: Option<TraceHook>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware. Middleware runs in the order it is added.
    pub fn push<M>(&mut self, middleware: M)
    where
        M: Middleware,
    {
        self.middleware.push(Arc::new(middleware));
    }

    /// Number of registered middleware.
    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }

    /// The router run after the last middleware.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Mutable access to the router, for registration.
    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    /// Installs or clears the trace hook.
    pub fn set_trace_hook(&mut self, hook: Option<TraceHook>) {
        self.trace = hook;
    }

    /// Sends `event` to the trace hook, if one is installed.
    pub fn emit(&self, event: TraceEvent) {
        if let Some(hook) = &self.trace {
            hook(&event);
        }
    }

    /// Runs one message through the whole pipeline.
    pub async fn run(self: Arc<Self>, bot: Arc<Bot>, message: Arc<Message>) {
        let span = debug_span!(
            "dispatch",
            user = %message.user_id,
            channel = %message.channel_id,
        );

        async move {
            self.emit(TraceEvent::DispatchStarted {
                content: message.content.clone(),
            });
            Next::new(Arc::clone(&self)).run(bot, message).await;
            self.emit(TraceEvent::DispatchFinished);
        }
        .instrument(span)
        .await
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("middleware_count", &self.middleware.len())
            .field("router", &self.router)
            .field("has_trace_hook", &self.trace.is_some())
            .finish()
    }
}

// ============================================================================
// Next
// ============================================================================

/// Continuation handed to a middleware: the rest of the pipeline.
///
/// Cloning is cheap. Calling [`Next::run`] more than once re-runs everything
/// downstream each time.
#[derive(Clone)]
pub struct Next {
    pipeline: Arc<Pipeline>,
    cursor: usize,
}

impl Next {
    /// A cursor at the first middleware of `pipeline`.
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            cursor: 0,
        }
    }

    /// Number of middleware still ahead of the router.
    pub fn remaining(&self) -> usize {
        self.pipeline.middleware.len().saturating_sub(self.cursor)
    }

    /// Runs the rest of the pipeline with `message`.
    pub fn run(&self, bot: Arc<Bot>, message: Arc<Message>) -> BoxFuture<'static, ()> {
        let pipeline = Arc::clone(&self.pipeline);
        let cursor = self.cursor;

        async move {
            match pipeline.middleware.get(cursor).cloned() {
                Some(middleware) => {
                    trace!(index = cursor, "Entering middleware");
                    pipeline.emit(TraceEvent::MiddlewareEntered { index: cursor });
                    let next = Next {
                        pipeline: Arc::clone(&pipeline),
                        cursor: cursor + 1,
                    };
                    middleware.handle(bot, message, next).await;
                }
                None => {
                    pipeline
                        .router
                        .route(bot, message, pipeline.trace.as_ref())
                        .await;
                }
            }
        }
        .boxed()
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("cursor", &self.cursor)
            .field("remaining", &self.remaining())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::framework::router::Command;

    type Log = Arc<Mutex<Vec<String>>>;

    fn logging(log: &Log, name: &'static str, forward: bool) -> impl Middleware {
        let log = Arc::clone(log);
        move |bot: Arc<Bot>, msg: Arc<Message>, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(name.to_string());
                if forward {
                    next.run(bot, msg).await;
                }
            }
        }
    }

    fn pipeline_with_command(log: &Log) -> Pipeline {
        let log = Arc::clone(log);
        let mut pipeline = Pipeline::new();
        pipeline.router_mut().add(Command::new(
            ".*",
            move |_bot: Arc<Bot>, msg: Arc<Message>| {
                let log = Arc::clone(&log);
                async move { log.lock().push(format!("handler:{}", msg.content)) }
            },
        ));
        pipeline
    }

    async fn run(pipeline: Pipeline, content: &str) {
        Arc::new(pipeline)
            .run(
                Arc::new(Bot::unsupported("test")),
                Arc::new(Message::new("u", "c", content)),
            )
            .await;
    }

    #[tokio::test]
    async fn test_registration_order() {
        let log: Log = Arc::default();
        let mut pipeline = pipeline_with_command(&log);
        pipeline.push(logging(&log, "a", true));
        pipeline.push(logging(&log, "b", true));
        pipeline.push(logging(&log, "c", true));

        run(pipeline, "hi").await;
        assert_eq!(*log.lock(), ["a", "b", "c", "handler:hi"]);
    }

    #[tokio::test]
    async fn test_short_circuit_stops_downstream() {
        let log: Log = Arc::default();
        let mut pipeline = pipeline_with_command(&log);
        pipeline.push(logging(&log, "a", true));
        pipeline.push(logging(&log, "gate", false));
        pipeline.push(logging(&log, "c", true));

        run(pipeline, "hi").await;
        assert_eq!(*log.lock(), ["a", "gate"]);
    }

    #[tokio::test]
    async fn test_rewritten_message_reaches_router() {
        let log: Log = Arc::default();
        let mut pipeline = pipeline_with_command(&log);
        pipeline.push(|bot: Arc<Bot>, msg: Arc<Message>, next: Next| async move {
            let upper = msg.content.to_uppercase();
            next.run(bot, Arc::new(msg.with_content(upper))).await;
        });

        run(pipeline, "hi").await;
        assert_eq!(*log.lock(), ["handler:HI"]);
    }

    #[tokio::test]
    async fn test_next_may_run_twice() {
        let log: Log = Arc::default();
        let mut pipeline = pipeline_with_command(&log);
        pipeline.push(|bot: Arc<Bot>, msg: Arc<Message>, next: Next| async move {
            next.run(Arc::clone(&bot), Arc::clone(&msg)).await;
            next.run(bot, msg).await;
        });

        run(pipeline, "retry").await;
        assert_eq!(*log.lock(), ["handler:retry", "handler:retry"]);
    }

    #[tokio::test]
    async fn test_trace_events_in_order() {
        let log: Log = Arc::default();
        let events: Arc<Mutex<Vec<TraceEvent>>> = Arc::default();
        let recorder = Arc::clone(&events);

        let mut pipeline = pipeline_with_command(&log);
        pipeline.push(logging(&log, "a", true));
        pipeline.set_trace_hook(Some(Arc::new(move |event: &TraceEvent| {
            recorder.lock().push(event.clone());
        })));

        run(pipeline, "hi").await;
        assert_eq!(
            *events.lock(),
            [
                TraceEvent::DispatchStarted {
                    content: "hi".into()
                },
                TraceEvent::MiddlewareEntered { index: 0 },
                TraceEvent::CommandMatched {
                    index: 0,
                    pattern: ".*".into()
                },
                TraceEvent::DispatchFinished,
            ]
        );
    }

    #[test]
    fn test_next_remaining() {
        let log: Log = Arc::default();
        let mut pipeline = Pipeline::new();
        pipeline.push(logging(&log, "a", true));
        pipeline.push(logging(&log, "b", true));

        let next = Next::new(Arc::new(pipeline));
        assert_eq!(next.remaining(), 2);
    }
}

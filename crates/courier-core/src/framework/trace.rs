//! Dispatch trace hook.
//!
//! Every dispatch decision is also emitted as a `tracing` event; the hook is
//! for code that wants to observe decisions programmatically (assertions in
//! tests, counters, audit logs) without installing a subscriber.

use std::fmt;
use std::sync::Arc;

/// One observable step of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A backend event was authored by the bot itself and never dispatched.
    SelfAuthoredDropped,
    /// A message entered the pipeline.
    DispatchStarted {
        /// Content of the message as received.
        content: String,
    },
    /// The middleware at `index` (registration order) was entered.
    MiddlewareEntered {
        index: usize,
    },
    /// The router selected the command at `index`.
    CommandMatched {
        index: usize,
        pattern: String,
    },
    /// No command matched and the unknown-command handler ran.
    FallbackInvoked,
    /// No command matched and no unknown-command handler is set.
    Unhandled,
    /// The dispatch returned to the caller.
    DispatchFinished,
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfAuthoredDropped => f.write_str("self-authored message dropped"),
            Self::DispatchStarted { content } => write!(f, "dispatch started: {content:?}"),
            Self::MiddlewareEntered { index } => write!(f, "middleware #{index} entered"),
            Self::CommandMatched { index, pattern } => {
                write!(f, "command #{index} matched ({pattern})")
            }
            Self::FallbackInvoked => f.write_str("unknown-command handler invoked"),
            Self::Unhandled => f.write_str("no command matched"),
            Self::DispatchFinished => f.write_str("dispatch finished"),
        }
    }
}

/// Callback receiving every [`TraceEvent`] of every dispatch.
///
/// Called synchronously on the dispatching task; keep it cheap.
pub type TraceHook = Arc<dyn Fn(&TraceEvent) + Send + Sync>;

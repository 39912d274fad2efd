//! Framework layer - the dispatch pipeline.
//!
//! - Middleware trait and the [`Next`] cursor that walks the pipeline
//! - Command router with first-match-wins scanning and a fallback handler
//! - Trace hook observing every dispatch decision

pub mod pipeline;
pub mod router;
pub mod trace;

pub use pipeline::{BoxedMiddleware, Middleware, Next, Pipeline};
pub use router::{BoxedCommandHandler, Command, CommandHandler, Resolution, Router};
pub use trace::{TraceEvent, TraceHook};

//! Integration layer - the outside world.
//!
//! - Gateway contract implemented by each platform client
//! - Bot facade: lifecycle, outbound sends and the dispatch entry point

pub mod bot;
pub mod gateway;

pub use bot::{Backend, Bot, SessionState, ShutdownPolicy, wait_for_shutdown};
pub use gateway::{EventCallback, Gateway};

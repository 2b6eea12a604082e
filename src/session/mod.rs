//! Session and stickiness
//!
//! Per-request write tracking and the scopes that steer routing decisions.
//! Within one session, a write is always followed by reads that observe at
//! least that write; across sessions there is no ordering guarantee.

mod session;
mod stickiness;

pub use session::Session;
pub use stickiness::{StickinessStrategy, DEFAULT_STICKY_WINDOW_SECS};

//! Talk-mode session orchestration
//!
//! One active voice session at a time, owned by a single task that
//! arbitrates the turn state machine. All pipeline completions come
//! back to the owner tagged with the turn epoch they belong to, so a
//! result from an interrupted turn can never steer a later one.

pub mod events;
pub mod manager;
mod metrics;
pub mod session;

pub use events::TalkEvent;
pub use manager::TalkMode;
pub use session::{TalkBackends, TalkSession};

//! Leaf types of the engine.
//!
//! - Monotonic timestamps, deadline comparison and clocks
//! - State descriptors (label + timeout)
//! - Bounded transition history
//!
//! Nothing here knows about definitions, instances or host contexts.

mod clock;
mod history;
mod state;

pub use clock::{compare, Clock, ManualClock, MonotonicClock, TimeStatus, Timestamp};
pub use history::{StateHistory, TransitionCause, TransitionRecord, DEFAULT_HISTORY_CAPACITY};
pub use state::StateDesc;

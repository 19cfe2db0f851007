//! Tablefsm: a poll-driven, table-driven state machine engine
//!
//! A machine is described once by a [`Definition`]: its states, each with an
//! optional timeout, and a transition table holding two entries per state,
//! one taken on a normal poll and one taken once the state's timeout has
//! elapsed. Any number of [`Instance`]s can be attached to a definition. Each
//! instance lives inside a host context and is advanced one step at a time by
//! [`drive`].
//!
//! # Core Concepts
//!
//! - **Definition**: immutable, shared description of states and transitions
//! - **Instance**: per-machine cursor (current/previous state, deadline, name)
//! - **Driver**: one step per call; selects exactly one entry, commits at most
//!   one transition, then runs that entry's output handler
//! - **Timeouts**: evaluated lazily against a monotonic clock on every poll
//!
//! The engine never blocks, spawns or schedules. The host decides how often
//! to poll, and that cadence bounds timeout precision.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tablefsm::core::ManualClock;
//! use tablefsm::definition::{DefinitionBuilder, Next};
//! use tablefsm::instance::{FsmContext, Instance};
//! use tablefsm::{drive, state_enum, StepResult};
//!
//! state_enum! {
//!     enum Phase {
//!         Idle => 0,
//!         Active => 5_000,
//!     }
//! }
//!
//! struct Light {
//!     fsm: Instance<Light>,
//!     flashes: u32,
//! }
//!
//! impl FsmContext for Light {
//!     fn fsm(&self) -> &Instance<Self> { &self.fsm }
//!     fn fsm_mut(&mut self) -> &mut Instance<Self> { &mut self.fsm }
//! }
//!
//! let definition = Arc::new(
//!     DefinitionBuilder::<Light>::new("light")
//!         .states(Phase::descriptors())
//!         .on_normal(Phase::Idle, Next::to(Phase::Active), |_: &mut Light| Ok(()))
//!         .on_timeout(Phase::Idle, Next::to(Phase::Idle), |_: &mut Light| Ok(()))
//!         .on_normal(Phase::Active, Next::to(Phase::Active), |l: &mut Light| {
//!             l.flashes += 1;
//!             Ok(())
//!         })
//!         .on_timeout(Phase::Active, Next::to(Phase::Idle), |_: &mut Light| Ok(()))
//!         .build()
//!         .unwrap(),
//! );
//!
//! let clock = ManualClock::new();
//! let fsm = Instance::attach_with_clock(definition, "porch", Phase::Idle, clock.clone()).unwrap();
//! let mut light = Light { fsm, flashes: 0 };
//!
//! // Idle never times out: the normal entry moves to Active.
//! drive(&mut light).unwrap();
//! assert_eq!(light.fsm.current(), Phase::Active.index());
//!
//! // Six seconds later the Active timeout fires.
//! clock.advance_millis(6_000);
//! let step = drive(&mut light).unwrap();
//! assert!(step.timed_out());
//! assert!(matches!(step, StepResult::Transitioned { to: 0, .. }));
//! ```

pub mod config;
pub mod core;
pub mod definition;
pub mod driver;
pub mod error;
pub mod instance;

// Re-export commonly used types
pub use config::{DefinitionConfig, HandlerRegistry};
pub use definition::{Definition, DefinitionBuilder, Next, Outcome, TableEntry};
pub use driver::{drive, StepResult};
pub use error::{FsmError, HandlerError};
pub use instance::{FsmContext, Instance};

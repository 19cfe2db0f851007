//! Instances (entities): the mutable cursor of one running machine.
//!
//! An instance lives inside its host context. The host implements
//! [`FsmContext`] so the driver can reach the instance from the context and
//! hand the context to output handlers. The instance holds its definition
//! through an `Arc`, so the definition outlives every instance attached to it.

use crate::core::{
    compare, Clock, MonotonicClock, StateHistory, TimeStatus, Timestamp, TransitionCause,
    TransitionRecord,
};
use crate::definition::Definition;
use crate::error::FsmError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Longest composed instance name, in characters. Longer names are cut.
pub const INSTANCE_NAME_MAX: usize = 39;

/// Host context that embeds an instance of its own machine.
///
/// # Example
///
/// ```rust
/// use tablefsm::instance::{FsmContext, Instance};
///
/// struct Game {
///     fsm: Instance<Game>,
///     score: u32,
/// }
///
/// impl FsmContext for Game {
///     fn fsm(&self) -> &Instance<Self> {
///         &self.fsm
///     }
///
///     fn fsm_mut(&mut self) -> &mut Instance<Self> {
///         &mut self.fsm
///     }
/// }
/// ```
pub trait FsmContext: Sized {
    fn fsm(&self) -> &Instance<Self>;
    fn fsm_mut(&mut self) -> &mut Instance<Self>;
}

/// Mutable runtime state of one machine.
pub struct Instance<C> {
    definition: Arc<Definition<C>>,
    clock: Arc<dyn Clock>,
    id: Uuid,
    name: String,
    current: usize,
    previous: usize,
    timeout_ms: u32,
    created_at: Timestamp,
    entered_at: Timestamp,
    deadline: Option<Timestamp>,
    /// The current state was entered while the clock read zero; its deadline
    /// is armed from the next valid reading.
    deadline_pending: bool,
    attached_at: DateTime<Utc>,
    run_count: u64,
    terminated: bool,
    history: StateHistory,
}

impl<C> Instance<C> {
    /// Attach a new instance to `definition` in `initial_state`.
    ///
    /// Fails with [`FsmError::InvalidState`] if `initial_state` is not a row
    /// of the definition.
    pub fn attach(
        definition: Arc<Definition<C>>,
        instance_name: &str,
        initial_state: impl Into<usize>,
    ) -> Result<Self, FsmError> {
        Self::attach_with_clock(definition, instance_name, initial_state, MonotonicClock)
    }

    /// Attach reading time from `clock`.
    pub fn attach_with_clock(
        definition: Arc<Definition<C>>,
        instance_name: &str,
        initial_state: impl Into<usize>,
        clock: impl Clock + 'static,
    ) -> Result<Self, FsmError> {
        let initial = initial_state.into();
        let num_states = definition.num_states();
        if initial >= num_states {
            warn!(
                definition = definition.name(),
                state = initial,
                num_states,
                "Invalid initial FSM state"
            );
            return Err(FsmError::InvalidState {
                state: initial,
                num_states,
            });
        }

        let clock: Arc<dyn Clock> = Arc::new(clock);
        let now = clock.now();
        let timeout_ms = definition.timeout_ms(initial);
        let name = compose_name(definition.name(), instance_name);
        let (deadline, deadline_pending) = arm_deadline(now, timeout_ms);

        let instance = Self {
            id: Uuid::new_v4(),
            name,
            current: initial,
            previous: initial,
            timeout_ms,
            created_at: now,
            entered_at: now,
            deadline,
            deadline_pending,
            attached_at: Utc::now(),
            run_count: 0,
            terminated: false,
            history: StateHistory::new(),
            clock,
            definition,
        };
        info!(
            instance = %instance.name,
            id = %instance.id,
            state = instance.current_label(),
            timeout_ms,
            "FSM instance attached"
        );
        Ok(instance)
    }

    /// Replace the history buffer with one of `capacity` records.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history = StateHistory::with_capacity(capacity);
        self
    }

    /// Move to `new_state` outside the table, typically from a handler.
    ///
    /// Fails with [`FsmError::InvalidState`] when `new_state` is not a row of
    /// the definition, including `new_state == num_states`, or when the
    /// instance has already terminated.
    pub fn force_state(&mut self, new_state: impl Into<usize>) -> Result<(), FsmError> {
        let new_state = new_state.into();
        let num_states = self.definition.num_states();
        if new_state >= num_states || self.terminated {
            warn!(
                instance = %self.name,
                state = new_state,
                num_states,
                terminated = self.terminated,
                "Rejected forced FSM state"
            );
            return Err(FsmError::InvalidState {
                state: new_state,
                num_states,
            });
        }
        self.commit(new_state, TransitionCause::Forced);
        Ok(())
    }

    /// Ask the driver to end this machine.
    ///
    /// The current driver step, or the next one, reports
    /// [`FsmError::MaxStatesReached`].
    pub fn terminate(&mut self) {
        if !self.terminated {
            info!(
                instance = %self.name,
                state = self.current_label(),
                "FSM instance terminating"
            );
        }
        self.terminated = true;
    }

    /// `(current, previous)` state rows.
    pub fn read_state(&self) -> (usize, usize) {
        (self.current, self.previous)
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn previous(&self) -> usize {
        self.previous
    }

    pub fn current_label(&self) -> &str {
        self.definition.label(self.current)
    }

    pub fn definition(&self) -> &Arc<Definition<C>> {
        &self.definition
    }

    /// Composed `"<definition>-<instance>"` name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Driver steps completed so far.
    pub fn run_count(&self) -> u64 {
        self.run_count
    }

    /// Timeout of the current state; zero means none.
    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// When the current state expires, `None` for states that never do and
    /// while the deadline is pending.
    pub fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }

    /// True while the current state waits for a valid clock reading to arm
    /// its deadline.
    pub fn is_deadline_pending(&self) -> bool {
        self.deadline_pending
    }

    /// Clock reading taken at attach time.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Clock reading taken when the current state was entered.
    pub fn entered_at(&self) -> Timestamp {
        self.entered_at
    }

    pub fn attached_at(&self) -> DateTime<Utc> {
        self.attached_at
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    /// Current reading of this instance's clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Timeout status of the current state.
    ///
    /// States without a timeout never expire. A zero clock reading means no
    /// time source is available and is treated as not expired. A deadline
    /// left pending by such a reading is armed here from the first valid one.
    pub fn check_timer(&mut self) -> TimeStatus {
        if self.deadline.is_none() && !self.deadline_pending {
            return TimeStatus::NotExpired;
        }
        let now = self.clock.now();
        if now.is_unavailable() {
            warn!(
                instance = %self.name,
                "Monotonic time unavailable, FSM timeout not evaluated"
            );
            return TimeStatus::NotExpired;
        }
        if self.deadline_pending {
            self.entered_at = now;
            self.deadline = deadline_after(now, self.timeout_ms);
            self.deadline_pending = false;
            info!(
                instance = %self.name,
                state = self.current_label(),
                timeout_ms = self.timeout_ms,
                "FSM deadline armed after clock recovered"
            );
        }
        match self.deadline {
            Some(deadline) => compare(now, deadline),
            None => TimeStatus::NotExpired,
        }
    }

    /// Diagnostic view of this instance.
    pub fn snapshot(&self) -> InstanceSnapshot {
        InstanceSnapshot {
            id: self.id,
            name: self.name.clone(),
            definition: self.definition.name().to_string(),
            current: self.current_label().to_string(),
            previous: self.definition.label(self.previous).to_string(),
            timeout_ms: self.timeout_ms,
            deadline: self.deadline,
            run_count: self.run_count,
            terminated: self.terminated,
            attached_at: self.attached_at,
            recent: self.history.records().cloned().collect(),
        }
    }

    pub(crate) fn commit(&mut self, next: usize, cause: TransitionCause) {
        let now = self.clock.now();
        self.previous = self.current;
        self.current = next;
        self.timeout_ms = self.definition.timeout_ms(next);
        self.entered_at = now;
        (self.deadline, self.deadline_pending) = arm_deadline(now, self.timeout_ms);
        self.history.record(TransitionRecord {
            from: self.previous,
            to: self.current,
            cause,
            run: self.run_count,
            at: Utc::now(),
        });
        info!(
            instance = %self.name,
            from = self.definition.label(self.previous),
            to = self.definition.label(self.current),
            timeout_ms = self.timeout_ms,
            cause = cause.as_str(),
            "FSM state transition"
        );
    }

    pub(crate) fn record_run(&mut self) {
        self.run_count += 1;
    }

    pub(crate) fn termination(&self) -> FsmError {
        FsmError::MaxStatesReached {
            instance: self.name.clone(),
            num_states: self.definition.num_states(),
        }
    }
}

impl<C> fmt::Debug for Instance<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("current", &self.current)
            .field("previous", &self.previous)
            .field("timeout_ms", &self.timeout_ms)
            .field("deadline", &self.deadline)
            .field("deadline_pending", &self.deadline_pending)
            .field("run_count", &self.run_count)
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}

/// Serializable diagnostics view of an instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub id: Uuid,
    pub name: String,
    pub definition: String,
    pub current: String,
    pub previous: String,
    pub timeout_ms: u32,
    pub deadline: Option<Timestamp>,
    pub run_count: u64,
    pub terminated: bool,
    pub attached_at: DateTime<Utc>,
    pub recent: Vec<TransitionRecord>,
}

fn compose_name(definition: &str, instance: &str) -> String {
    format!("{definition}-{instance}")
        .chars()
        .take(INSTANCE_NAME_MAX)
        .collect()
}

fn deadline_after(start: Timestamp, timeout_ms: u32) -> Option<Timestamp> {
    (timeout_ms > 0).then(|| start.add_millis(u64::from(timeout_ms)))
}

/// Deadline for a state entered at `start`, and whether arming must wait
/// for a valid reading because `start` is the zero sentinel.
fn arm_deadline(start: Timestamp, timeout_ms: u32) -> (Option<Timestamp>, bool) {
    if timeout_ms > 0 && start.is_unavailable() {
        return (None, true);
    }
    (deadline_after(start, timeout_ms), false)
}

//! The driver: advances one instance by exactly one step per call.
//!
//! The engine is poll-driven. The host calls [`drive`] at whatever cadence
//! it likes; timeouts are only noticed on those calls, so timeout precision
//! equals the poll interval. Each call takes exactly one of the current
//! state's two entries, commits at most one transition, then runs that
//! entry's output handler with the host context.

use crate::core::TransitionCause;
use crate::definition::{Definition, Next, Outcome};
use crate::error::FsmError;
use crate::instance::FsmContext;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// What a successful driver step did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepResult {
    /// The table moved the instance from `from` to `to`.
    Transitioned {
        from: usize,
        to: usize,
        outcome: Outcome,
    },
    /// The table left the instance in `state`; the handler decided.
    Reentered { state: usize, outcome: Outcome },
}

impl StepResult {
    /// Column taken in this step.
    pub fn outcome(&self) -> Outcome {
        match self {
            StepResult::Transitioned { outcome, .. } | StepResult::Reentered { outcome, .. } => {
                *outcome
            }
        }
    }

    pub fn timed_out(&self) -> bool {
        self.outcome() == Outcome::TimedOut
    }
}

/// Run one step of the machine embedded in `context`.
///
/// Returns [`FsmError::MaxStatesReached`] once the machine has ended, either
/// through a [`Next::Terminate`] entry or a handler calling
/// [`Instance::terminate`](crate::instance::Instance::terminate). The host
/// should stop polling at that point. Handler failures are logged and do not
/// affect the result.
///
/// # Panics
///
/// Panics when the selected entry has no output handler. That is a defect in
/// the transition table itself, not a runtime condition.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use tablefsm::definition::{DefinitionBuilder, Next};
/// use tablefsm::driver::drive;
/// use tablefsm::instance::{FsmContext, Instance};
///
/// struct Counter { fsm: Instance<Counter>, ticks: u32 }
///
/// impl FsmContext for Counter {
///     fn fsm(&self) -> &Instance<Self> { &self.fsm }
///     fn fsm_mut(&mut self) -> &mut Instance<Self> { &mut self.fsm }
/// }
///
/// let definition = Arc::new(
///     DefinitionBuilder::<Counter>::new("counter")
///         .state("Counting", 0)
///         .on_normal(0usize, Next::HandlerManaged, |c: &mut Counter| {
///             c.ticks += 1;
///             if c.ticks == 3 {
///                 c.fsm_mut().terminate();
///             }
///             Ok(())
///         })
///         .on_timeout(0usize, Next::Terminate, |_: &mut Counter| Ok(()))
///         .build()
///         .unwrap(),
/// );
///
/// let mut counter = Counter { fsm: definition.attach("demo", 0usize).unwrap(), ticks: 0 };
/// while drive(&mut counter).is_ok() {}
/// assert_eq!(counter.ticks, 3);
/// ```
pub fn drive<C: FsmContext>(context: &mut C) -> Result<StepResult, FsmError> {
    let instance = context.fsm_mut();
    if instance.is_terminated() {
        return Err(instance.termination());
    }

    let definition = Arc::clone(instance.definition());
    let state = instance.current();
    let outcome = if instance.check_timer().is_due() {
        Outcome::TimedOut
    } else {
        Outcome::Normal
    };
    let Some(entry) = definition.entry(state, outcome) else {
        error!(
            instance = instance.name(),
            state,
            num_states = definition.num_states(),
            "FSM state outside the transition table"
        );
        return Err(instance.termination());
    };

    let step = match entry.next() {
        Next::To(target) => {
            let cause = match outcome {
                Outcome::Normal => TransitionCause::Normal,
                Outcome::TimedOut => TransitionCause::TimedOut,
            };
            instance.commit(target, cause);
            StepResult::Transitioned {
                from: state,
                to: target,
                outcome,
            }
        }
        Next::HandlerManaged => {
            debug!(
                instance = instance.name(),
                state = definition.label(state),
                outcome = %outcome,
                "FSM state re-entered, handler decides next state"
            );
            StepResult::Reentered { state, outcome }
        }
        Next::Terminate => {
            instance.terminate();
            StepResult::Reentered { state, outcome }
        }
    };

    let Some(output) = entry.output() else {
        missing_output_handler(&definition, state, outcome);
    };
    if let Err(err) = definition.invoker().invoke(output, context) {
        let instance = context.fsm();
        warn!(
            instance = instance.name(),
            state = definition.label(state),
            outcome = %outcome,
            error = %err,
            "FSM output handler failed"
        );
    }

    let instance = context.fsm_mut();
    instance.record_run();
    if instance.is_terminated() {
        return Err(instance.termination());
    }
    Ok(step)
}

#[cold]
fn missing_output_handler<C>(definition: &Definition<C>, state: usize, outcome: Outcome) -> ! {
    let err = definition.missing_handler(state, outcome);
    error!(
        definition = definition.name(),
        state = definition.label(state),
        outcome = %outcome,
        "{err}"
    );
    panic!("{err}");
}

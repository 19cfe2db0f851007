//! Property-based tests for timestamps, instances and the driver.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

use proptest::prelude::*;
use std::sync::Arc;
use tablefsm::core::{compare, Clock, ManualClock, TimeStatus, Timestamp};
use tablefsm::definition::{Definition, DefinitionBuilder, HandlerResult, Next, Outcome};
use tablefsm::{drive, FsmContext, FsmError, Instance, StepResult};

struct Host {
    fsm: Instance<Host>,
}

impl FsmContext for Host {
    fn fsm(&self) -> &Instance<Self> {
        &self.fsm
    }

    fn fsm_mut(&mut self) -> &mut Instance<Self> {
        &mut self.fsm
    }
}

fn noop(_: &mut Host) -> HandlerResult {
    Ok(())
}

/// A ring of states where each normal entry moves to the next row and each
/// timeout entry moves back to row zero.
fn ring(timeouts: &[u32]) -> Arc<Definition<Host>> {
    let count = timeouts.len();
    let mut builder = DefinitionBuilder::new("ring");
    for (row, timeout) in timeouts.iter().enumerate() {
        builder = builder.state(format!("S{row}"), *timeout);
    }
    for row in 0..count {
        builder = builder
            .on_normal(row, Next::To((row + 1) % count), noop)
            .on_timeout(row, Next::To(0), noop);
    }
    Arc::new(builder.build().unwrap())
}

prop_compose! {
    fn arbitrary_timestamp()(secs in 1u64..1_000_000, micros in 0u32..1_000_000) -> Timestamp {
        Timestamp::new(secs, micros)
    }
}

prop_compose! {
    fn arbitrary_ring()(timeouts in prop::collection::vec(0u32..20_000, 1..8))
        (initial in 0..timeouts.len(), timeouts in Just(timeouts)) -> (Vec<u32>, usize) {
        (timeouts, initial)
    }
}

proptest! {
    #[test]
    fn add_millis_matches_microsecond_arithmetic(
        ts in arbitrary_timestamp(),
        ms in 0u64..10_000_000,
    ) {
        let advanced = ts.add_millis(ms);
        prop_assert_eq!(advanced.as_micros(), ts.as_micros() + ms * 1_000);
        prop_assert!(advanced.micros() < 1_000_000);
    }

    #[test]
    fn compare_agrees_with_ordering(
        now in arbitrary_timestamp(),
        deadline in arbitrary_timestamp(),
    ) {
        let expected = match now.cmp(&deadline) {
            std::cmp::Ordering::Less => TimeStatus::NotExpired,
            std::cmp::Ordering::Equal => TimeStatus::Equal,
            std::cmp::Ordering::Greater => TimeStatus::Expired,
        };
        prop_assert_eq!(compare(now, deadline), expected);
    }

    #[test]
    fn attach_starts_with_current_equal_to_previous((timeouts, initial) in arbitrary_ring()) {
        let clock = ManualClock::new();
        let instance =
            Instance::attach_with_clock(ring(&timeouts), "P", initial, clock.clone()).unwrap();

        prop_assert_eq!(instance.read_state(), (initial, initial));
        prop_assert_eq!(instance.read_state(), instance.read_state());
        prop_assert_eq!(instance.created_at(), clock.now());
        let expected = match timeouts[initial] {
            0 => None,
            t => Some(clock.now().add_millis(u64::from(t))),
        };
        prop_assert_eq!(instance.deadline(), expected);
    }

    #[test]
    fn timeout_entry_selected_only_once_deadline_reached(
        timeout in 1u32..20_000,
        elapsed in 0u64..40_000,
    ) {
        let clock = ManualClock::new();
        let fsm =
            Instance::attach_with_clock(ring(&[0, timeout]), "P", 1usize, clock.clone()).unwrap();
        let mut host = Host { fsm };

        clock.advance_millis(elapsed);
        let step = drive(&mut host).unwrap();

        let expected = if elapsed < u64::from(timeout) {
            Outcome::Normal
        } else {
            Outcome::TimedOut
        };
        prop_assert_eq!(step.outcome(), expected);
        prop_assert_eq!(host.fsm.current(), 0);
        prop_assert_eq!(host.fsm.previous(), 1);
    }

    #[test]
    fn zero_timeout_state_never_times_out(polls in prop::collection::vec(0u64..1_000_000, 1..20)) {
        let clock = ManualClock::new();
        let fsm = Instance::attach_with_clock(ring(&[0]), "P", 0usize, clock.clone()).unwrap();
        let mut host = Host { fsm };

        for gap in polls {
            clock.advance_millis(gap);
            let step = drive(&mut host).unwrap();
            let expected = StepResult::Transitioned { from: 0, to: 0, outcome: Outcome::Normal };
            prop_assert_eq!(step, expected);
            prop_assert_eq!(host.fsm.deadline(), None);
        }
    }

    #[test]
    fn commits_record_previous_state(
        (timeouts, initial) in arbitrary_ring(),
        steps in 1usize..20,
    ) {
        let clock = ManualClock::new();
        let fsm =
            Instance::attach_with_clock(ring(&timeouts), "P", initial, clock.clone()).unwrap();
        let mut host = Host { fsm };

        for _ in 0..steps {
            let before = host.fsm.current();
            match drive(&mut host).unwrap() {
                StepResult::Transitioned { from, to, .. } => {
                    prop_assert_eq!(from, before);
                    prop_assert_eq!(host.fsm.read_state(), (to, before));
                }
                other => prop_assert!(false, "unexpected step {:?}", other),
            }
        }
        prop_assert_eq!(host.fsm.run_count(), steps as u64);
        prop_assert_eq!(host.fsm.history().len(), steps);
    }

    #[test]
    fn force_state_accepts_exactly_the_rows(
        (timeouts, initial) in arbitrary_ring(),
        target in 0usize..16,
    ) {
        let count = timeouts.len();
        let mut instance = Instance::attach(ring(&timeouts), "P", initial).unwrap();

        let result = instance.force_state(target);

        if target < count {
            prop_assert!(result.is_ok());
            prop_assert_eq!(instance.read_state(), (target, initial));
        } else {
            let rejected = matches!(
                result,
                Err(FsmError::InvalidState { state, num_states })
                    if state == target && num_states == count
            );
            prop_assert!(rejected);
            prop_assert_eq!(instance.read_state(), (initial, initial));
        }
    }
}

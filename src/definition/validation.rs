//! Definition checks using `Validation`.
//!
//! Every check runs and every problem is reported, so a broken table is
//! fixed in one pass instead of one error at a time.

use super::table::{Next, Outcome, TableEntry};
use crate::core::StateDesc;
use std::collections::HashSet;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// One problem found in a definition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigIssue {
    #[error("definition name is empty")]
    EmptyName,

    #[error("definition has no states")]
    NoStates,

    #[error("transition matrix has {actual} entries, expected {expected}")]
    MatrixSize { expected: usize, actual: usize },

    #[error("state {state} has an empty label")]
    EmptyLabel { state: usize },

    #[error("state label '{label}' is used more than once")]
    DuplicateLabel { label: String },

    #[error("state {state} {outcome} entry targets {target}, machine has {num_states} states")]
    TargetOutOfRange {
        state: usize,
        outcome: Outcome,
        target: usize,
        num_states: usize,
    },

    #[error("entry given for state {state}, machine has {num_states} states")]
    RowOutOfRange { state: usize, num_states: usize },

    #[error("unknown state label '{label}'")]
    UnknownState { label: String },

    #[error("unknown output handler '{name}'")]
    UnknownHandler { name: String },
}

type Check = Validation<(), NonEmptyVec<ConfigIssue>>;

fn check(ok: bool, issue: impl FnOnce() -> ConfigIssue) -> Check {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(issue())
    }
}

/// Validate the parts of a definition, accumulating ALL issues.
pub(crate) fn validate<C>(
    name: &str,
    states: &[StateDesc],
    matrix: &[TableEntry<C>],
) -> Result<(), Vec<ConfigIssue>> {
    let num_states = states.len();
    let mut checks: Vec<Check> = vec![
        check(!name.trim().is_empty(), || ConfigIssue::EmptyName),
        check(num_states > 0, || ConfigIssue::NoStates),
        check(matrix.len() == num_states * Outcome::COUNT, || {
            ConfigIssue::MatrixSize {
                expected: num_states * Outcome::COUNT,
                actual: matrix.len(),
            }
        }),
    ];

    let mut seen = HashSet::new();
    for (index, desc) in states.iter().enumerate() {
        checks.push(check(!desc.label().is_empty(), || ConfigIssue::EmptyLabel {
            state: index,
        }));
        if !desc.label().is_empty() {
            checks.push(check(seen.insert(desc.label()), || {
                ConfigIssue::DuplicateLabel {
                    label: desc.label().to_string(),
                }
            }));
        }
    }

    for (index, entry) in matrix.iter().enumerate() {
        if let Next::To(target) = entry.next() {
            checks.push(check(target < num_states, || {
                ConfigIssue::TargetOutOfRange {
                    state: index / Outcome::COUNT,
                    outcome: Outcome::from_column(index % Outcome::COUNT),
                    target,
                    num_states,
                }
            }));
        }
    }

    match Validation::all_vec(checks).map(|_| ()) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(issues) => Err(issues.iter().cloned().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::table::TableEntry;

    fn entry(next: Next) -> TableEntry<()> {
        TableEntry::new(|_: &mut ()| Ok(()), next)
    }

    fn two_states() -> Vec<StateDesc> {
        vec![StateDesc::new("Idle", 0), StateDesc::new("Active", 5_000)]
    }

    #[test]
    fn valid_definition_passes() {
        let matrix = vec![
            entry(Next::To(1)),
            entry(Next::To(0)),
            entry(Next::HandlerManaged),
            entry(Next::Terminate),
        ];
        assert_eq!(validate("G-FSM", &two_states(), &matrix), Ok(()));
    }

    #[test]
    fn validation_accumulates_all_issues() {
        let states = vec![
            StateDesc::new("Idle", 0),
            StateDesc::new("", 0),
            StateDesc::new("Idle", 10),
        ];
        let matrix = vec![entry(Next::To(7))];

        let issues = validate("  ", &states, &matrix).unwrap_err();

        assert!(issues.contains(&ConfigIssue::EmptyName));
        assert!(issues.contains(&ConfigIssue::MatrixSize {
            expected: 6,
            actual: 1
        }));
        assert!(issues.contains(&ConfigIssue::EmptyLabel { state: 1 }));
        assert!(issues.contains(&ConfigIssue::DuplicateLabel {
            label: "Idle".to_string()
        }));
        assert!(issues.contains(&ConfigIssue::TargetOutOfRange {
            state: 0,
            outcome: Outcome::Normal,
            target: 7,
            num_states: 3,
        }));
        assert_eq!(issues.len(), 5);
    }

    #[test]
    fn empty_states_are_rejected() {
        let issues = validate::<()>("G-FSM", &[], &[]).unwrap_err();
        assert_eq!(issues, vec![ConfigIssue::NoStates]);
    }

    #[test]
    fn target_equal_to_state_count_is_out_of_range() {
        let matrix = vec![
            entry(Next::To(2)),
            entry(Next::To(0)),
            entry(Next::To(1)),
            entry(Next::To(1)),
        ];
        let issues = validate("G-FSM", &two_states(), &matrix).unwrap_err();
        assert_eq!(
            issues,
            vec![ConfigIssue::TargetOutOfRange {
                state: 0,
                outcome: Outcome::Normal,
                target: 2,
                num_states: 2,
            }]
        );
    }

    #[test]
    fn unbound_entries_pass_validation() {
        let matrix = vec![
            TableEntry::unbound(Next::To(1)),
            entry(Next::To(0)),
            entry(Next::To(0)),
            entry(Next::To(0)),
        ];
        assert!(validate("G-FSM", &two_states(), &matrix).is_ok());
    }
}

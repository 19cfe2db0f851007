//! Engine error types.

use crate::definition::{ConfigIssue, Outcome};
use thiserror::Error;

/// Errors produced by definitions, instances and the driver.
#[derive(Debug, Error)]
pub enum FsmError {
    /// The definition is malformed. Fatal: do not start the machine.
    #[error("Invalid FSM configuration: {}", join_issues(.issues))]
    InvalidConfig { issues: Vec<ConfigIssue> },

    /// A state index outside the definition's rows was requested.
    #[error("Invalid state {state}, machine has {num_states} states")]
    InvalidState { state: usize, num_states: usize },

    /// A reachable table entry has no output handler.
    ///
    /// The driver panics with this message when it selects such an entry.
    #[error("No output handler bound for FSM '{definition}' state '{state}' ({outcome})")]
    OutputHandlerMissing {
        definition: String,
        state: String,
        outcome: Outcome,
    },

    /// The instance has left its valid states. The host should stop polling.
    #[error("FSM {instance} reached the end of its {num_states} states")]
    MaxStatesReached { instance: String, num_states: usize },

    /// A configuration document could not be read.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FsmError {
    /// True for the normal end-of-machine signal.
    pub fn is_termination(&self) -> bool {
        matches!(self, FsmError::MaxStatesReached { .. })
    }

    /// Configuration issues carried by `InvalidConfig`, empty otherwise.
    pub fn issues(&self) -> &[ConfigIssue] {
        match self {
            FsmError::InvalidConfig { issues } => issues,
            _ => &[],
        }
    }
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure reported by an output handler.
///
/// The driver logs it and carries on; it never becomes an [`FsmError`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Output handler failed: {0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

//! Definitions (control points): the immutable description of a machine.
//!
//! A definition owns the state descriptors, the flattened transition matrix
//! (`num_states` rows of [`Outcome::COUNT`] entries) and the output invoker.
//! It is shared read-only between every instance attached to it; all
//! mutable state lives in the [`Instance`](crate::instance::Instance).

mod builder;
mod macros;
mod table;
mod validation;

pub use builder::DefinitionBuilder;
pub use table::{
    DirectInvoker, HandlerResult, Next, Outcome, OutputFn, OutputInvoker, TableEntry,
};
pub use validation::ConfigIssue;

use crate::core::StateDesc;
use crate::error::FsmError;
use crate::instance::Instance;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Immutable, shareable state machine description.
pub struct Definition<C> {
    name: String,
    states: Vec<StateDesc>,
    matrix: Vec<TableEntry<C>>,
    invoker: Arc<dyn OutputInvoker<C>>,
}

impl<C> Definition<C> {
    /// Build a definition from its parts.
    ///
    /// Fails with [`FsmError::InvalidConfig`] listing every problem found:
    /// empty name, no states, a matrix that is not `states.len() * 2` long,
    /// empty or duplicate labels, or a `Next::To` outside the states.
    /// Entries without a handler are accepted and logged; selecting one at
    /// runtime is fatal.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use tablefsm::core::StateDesc;
    /// use tablefsm::definition::{Definition, DirectInvoker, Next, TableEntry};
    ///
    /// let definition: Definition<u32> = Definition::build(
    ///     "counter",
    ///     vec![StateDesc::never_expires("Counting")],
    ///     vec![
    ///         TableEntry::new(|n: &mut u32| { *n += 1; Ok(()) }, Next::To(0)),
    ///         TableEntry::new(|_: &mut u32| Ok(()), Next::Terminate),
    ///     ],
    ///     Arc::new(DirectInvoker),
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(definition.num_states(), 1);
    /// ```
    pub fn build(
        name: impl Into<String>,
        states: Vec<StateDesc>,
        matrix: Vec<TableEntry<C>>,
        invoker: Arc<dyn OutputInvoker<C>>,
    ) -> Result<Self, FsmError> {
        let name = name.into();
        validation::validate(&name, &states, &matrix)
            .map_err(|issues| FsmError::InvalidConfig { issues })?;

        let definition = Self {
            name,
            states,
            matrix,
            invoker,
        };
        for (state, outcome) in definition.unbound_entries() {
            warn!(
                definition = %definition.name,
                state = definition.label(state),
                outcome = %outcome,
                "FSM table entry has no output handler"
            );
        }
        Ok(definition)
    }

    /// Build with the [`DirectInvoker`].
    pub fn with_direct_invoker(
        name: impl Into<String>,
        states: Vec<StateDesc>,
        matrix: Vec<TableEntry<C>>,
    ) -> Result<Self, FsmError> {
        Self::build(name, states, matrix, Arc::new(DirectInvoker))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn states(&self) -> &[StateDesc] {
        &self.states
    }

    pub fn state(&self, state: usize) -> Option<&StateDesc> {
        self.states.get(state)
    }

    /// Label of `state`, or `"<invalid>"` when out of range.
    pub fn label(&self, state: usize) -> &str {
        self.states.get(state).map_or("<invalid>", StateDesc::label)
    }

    /// Configured timeout of `state`; zero when out of range.
    pub fn timeout_ms(&self, state: usize) -> u32 {
        self.states.get(state).map_or(0, StateDesc::timeout_ms)
    }

    /// Row index of the state with this label.
    pub fn state_index(&self, label: &str) -> Option<usize> {
        self.states.iter().position(|s| s.label() == label)
    }

    pub fn entry(&self, state: usize, outcome: Outcome) -> Option<&TableEntry<C>> {
        if state >= self.states.len() {
            return None;
        }
        self.matrix.get(state * Outcome::COUNT + outcome.column())
    }

    /// Entries with no output handler, in row order.
    pub fn unbound_entries(&self) -> Vec<(usize, Outcome)> {
        self.matrix
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.is_bound())
            .map(|(index, _)| {
                (
                    index / Outcome::COUNT,
                    Outcome::from_column(index % Outcome::COUNT),
                )
            })
            .collect()
    }

    /// Strict startup check: fail on the first entry without a handler.
    pub fn require_bound_handlers(&self) -> Result<(), FsmError> {
        match self.unbound_entries().first() {
            Some(&(state, outcome)) => Err(self.missing_handler(state, outcome)),
            None => Ok(()),
        }
    }

    pub fn invoker(&self) -> &dyn OutputInvoker<C> {
        self.invoker.as_ref()
    }

    pub(crate) fn missing_handler(&self, state: usize, outcome: Outcome) -> FsmError {
        FsmError::OutputHandlerMissing {
            definition: self.name.clone(),
            state: self.label(state).to_string(),
            outcome,
        }
    }

    /// Attach a new instance using the monotonic clock.
    pub fn attach(
        self: &Arc<Self>,
        instance_name: &str,
        initial_state: impl Into<usize>,
    ) -> Result<Instance<C>, FsmError> {
        Instance::attach(Arc::clone(self), instance_name, initial_state)
    }
}

impl<C> fmt::Debug for Definition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name)
            .field("states", &self.states)
            .field("matrix", &self.matrix)
            .finish_non_exhaustive()
    }
}

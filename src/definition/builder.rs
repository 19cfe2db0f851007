//! Fluent construction of definitions.

use super::table::{
    DirectInvoker, HandlerResult, Next, Outcome, OutputFn, OutputInvoker, TableEntry,
};
use super::validation::ConfigIssue;
use super::Definition;
use crate::core::StateDesc;
use crate::error::FsmError;
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for definitions with a fluent API.
///
/// Cells that are never given an entry are left unbound: the definition
/// builds, and selecting such a cell at runtime is fatal.
///
/// # Example
///
/// ```rust
/// use tablefsm::definition::{DefinitionBuilder, Next};
///
/// struct Lamp { on: bool }
///
/// let definition = DefinitionBuilder::<Lamp>::new("lamp")
///     .state("Off", 0)
///     .state("On", 1_000)
///     .on_normal(0usize, Next::To(1), |lamp: &mut Lamp| { lamp.on = true; Ok(()) })
///     .on_timeout(0usize, Next::To(0), |_: &mut Lamp| Ok(()))
///     .on_normal(1usize, Next::HandlerManaged, |_: &mut Lamp| Ok(()))
///     .on_timeout(1usize, Next::To(0), |lamp: &mut Lamp| { lamp.on = false; Ok(()) })
///     .build()
///     .unwrap();
///
/// assert_eq!(definition.num_states(), 2);
/// ```
pub struct DefinitionBuilder<C> {
    name: String,
    states: Vec<StateDesc>,
    entries: HashMap<(usize, Outcome), TableEntry<C>>,
    invoker: Option<Arc<dyn OutputInvoker<C>>>,
    issues: Vec<ConfigIssue>,
}

impl<C> DefinitionBuilder<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: Vec::new(),
            entries: HashMap::new(),
            invoker: None,
            issues: Vec::new(),
        }
    }

    /// Append a state row.
    pub fn state(mut self, label: impl Into<String>, timeout_ms: u32) -> Self {
        self.states.push(StateDesc::new(label, timeout_ms));
        self
    }

    /// Append several state rows at once.
    pub fn states(mut self, states: impl IntoIterator<Item = StateDesc>) -> Self {
        self.states.extend(states);
        self
    }

    /// Set one cell. A later call for the same cell replaces it.
    pub fn entry(
        mut self,
        state: impl Into<usize>,
        outcome: Outcome,
        entry: TableEntry<C>,
    ) -> Self {
        self.entries.insert((state.into(), outcome), entry);
        self
    }

    pub fn on_normal<F>(self, state: impl Into<usize>, next: Next, output: F) -> Self
    where
        F: Fn(&mut C) -> HandlerResult + Send + Sync + 'static,
    {
        self.entry(state, Outcome::Normal, TableEntry::new(output, next))
    }

    pub fn on_timeout<F>(self, state: impl Into<usize>, next: Next, output: F) -> Self
    where
        F: Fn(&mut C) -> HandlerResult + Send + Sync + 'static,
    {
        self.entry(state, Outcome::TimedOut, TableEntry::new(output, next))
    }

    /// Set a cell from an already shared handler.
    pub fn shared(
        self,
        state: impl Into<usize>,
        outcome: Outcome,
        next: Next,
        output: Option<OutputFn<C>>,
    ) -> Self {
        self.entry(state, outcome, TableEntry::from_shared(output, next))
    }

    /// Replace the default [`DirectInvoker`].
    pub fn invoker(mut self, invoker: Arc<dyn OutputInvoker<C>>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    /// Record a problem found while assembling the table elsewhere.
    pub(crate) fn reject(mut self, issue: ConfigIssue) -> Self {
        self.issues.push(issue);
        self
    }

    /// Build the definition, reporting builder and definition issues together.
    pub fn build(self) -> Result<Definition<C>, FsmError> {
        let num_states = self.states.len();
        let mut issues = self.issues;
        let mut entries = self.entries;

        let mut stray: Vec<usize> = entries
            .keys()
            .map(|&(state, _)| state)
            .filter(|&state| state >= num_states)
            .collect();
        stray.sort_unstable();
        stray.dedup();
        issues.extend(
            stray
                .into_iter()
                .map(|state| ConfigIssue::RowOutOfRange { state, num_states }),
        );

        let mut matrix = Vec::with_capacity(num_states * Outcome::COUNT);
        for state in 0..num_states {
            for outcome in [Outcome::Normal, Outcome::TimedOut] {
                let entry = entries
                    .remove(&(state, outcome))
                    .unwrap_or_else(|| TableEntry::unbound(Next::HandlerManaged));
                matrix.push(entry);
            }
        }

        let invoker = self
            .invoker
            .unwrap_or_else(|| Arc::new(DirectInvoker) as Arc<dyn OutputInvoker<C>>);

        match Definition::build(self.name, self.states, matrix, invoker) {
            Ok(definition) if issues.is_empty() => Ok(definition),
            Ok(_) => Err(FsmError::InvalidConfig { issues }),
            Err(FsmError::InvalidConfig { issues: more }) => {
                issues.extend(more);
                Err(FsmError::InvalidConfig { issues })
            }
            Err(other) => Err(other),
        }
    }
}

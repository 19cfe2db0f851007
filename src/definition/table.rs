//! Transition table entries and the output invocation seam.

use crate::error::HandlerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Value returned by an output handler.
pub type HandlerResult = Result<(), HandlerError>;

/// Host-supplied output handler.
///
/// Invoked synchronously inside a driver step with the host context. A
/// handler must not drive its own instance again.
pub type OutputFn<C> = Arc<dyn Fn(&mut C) -> HandlerResult + Send + Sync>;

/// Outcome class selecting the column of a state's row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// The state's deadline has not been reached.
    Normal,
    /// The state's deadline has been reached or passed.
    TimedOut,
}

impl Outcome {
    /// Entries per state row.
    pub const COUNT: usize = 2;

    pub(crate) fn column(self) -> usize {
        match self {
            Outcome::Normal => 0,
            Outcome::TimedOut => 1,
        }
    }

    pub(crate) fn from_column(column: usize) -> Self {
        if column == 0 {
            Outcome::Normal
        } else {
            Outcome::TimedOut
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Normal => "normal",
            Outcome::TimedOut => "timeout",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an entry sends the instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Next {
    /// The driver commits a transition to this row before calling the handler.
    To(usize),
    /// The driver leaves the state alone; the handler may call `force_state`.
    HandlerManaged,
    /// The driver ends the machine; the step reports `MaxStatesReached`.
    Terminate,
}

impl Next {
    pub fn to(state: impl Into<usize>) -> Self {
        Next::To(state.into())
    }
}

/// One transition cell: an output handler and the next state.
pub struct TableEntry<C> {
    output: Option<OutputFn<C>>,
    next: Next,
}

impl<C> TableEntry<C> {
    pub fn new<F>(output: F, next: Next) -> Self
    where
        F: Fn(&mut C) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            output: Some(Arc::new(output)),
            next,
        }
    }

    /// Entry sharing an already boxed handler, or none at all.
    pub fn from_shared(output: Option<OutputFn<C>>, next: Next) -> Self {
        Self { output, next }
    }

    /// Entry with no handler. Selecting it at runtime is fatal.
    pub fn unbound(next: Next) -> Self {
        Self { output: None, next }
    }

    pub fn next(&self) -> Next {
        self.next
    }

    pub fn output(&self) -> Option<&OutputFn<C>> {
        self.output.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.output.is_some()
    }
}

impl<C> Clone for TableEntry<C> {
    fn clone(&self) -> Self {
        Self {
            output: self.output.clone(),
            next: self.next,
        }
    }
}

impl<C> fmt::Debug for TableEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableEntry")
            .field("bound", &self.is_bound())
            .field("next", &self.next)
            .finish()
    }
}

/// Calls output handlers on behalf of the engine.
///
/// Stored once per definition. Wrap it to add host-wide behaviour around
/// every handler call, such as timing or result rewriting.
pub trait OutputInvoker<C>: Send + Sync {
    fn invoke(&self, output: &OutputFn<C>, context: &mut C) -> HandlerResult;
}

/// Invoker that calls the handler and returns its result unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectInvoker;

impl<C> OutputInvoker<C> for DirectInvoker {
    fn invoke(&self, output: &OutputFn<C>, context: &mut C) -> HandlerResult {
        output(context)
    }
}

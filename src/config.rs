//! Definitions described as data.
//!
//! A [`DefinitionConfig`] names states, timeouts and, for every state, the
//! handler and next state of its normal and timeout entries. Handlers are
//! referred to by name and resolved against a [`HandlerRegistry`] when the
//! configuration is bound, so the same document can be reused by any host
//! that registers the right names.
//!
//! ```json
//! {
//!   "name": "G-FSM",
//!   "states": [
//!     { "label": "Idle", "timeout_ms": 0,
//!       "normal":  { "handler": "arm",  "next": { "state": "Active" } },
//!       "timeout": { "handler": "arm",  "next": { "state": "Idle" } } },
//!     { "label": "Active", "timeout_ms": 5000,
//!       "normal":  { "handler": "poll", "next": "handler" },
//!       "timeout": { "handler": "quit", "next": "terminate" } }
//!   ]
//! }
//! ```

use crate::definition::{
    ConfigIssue, Definition, DefinitionBuilder, HandlerResult, Next, Outcome, OutputFn,
    OutputInvoker,
};
use crate::error::FsmError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Serializable description of a definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefinitionConfig {
    pub name: String,
    pub states: Vec<StateConfig>,
}

/// One state row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateConfig {
    pub label: String,
    /// Zero, the default, never expires.
    #[serde(default)]
    pub timeout_ms: u32,
    pub normal: EntryConfig,
    pub timeout: EntryConfig,
}

/// One table entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryConfig {
    /// Registered handler name. Leaving it out produces an unbound entry.
    #[serde(default)]
    pub handler: Option<String>,
    pub next: NextConfig,
}

/// Next state of an entry, by label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextConfig {
    State(String),
    Handler,
    Terminate,
}

impl DefinitionConfig {
    pub fn from_json(json: &str) -> Result<Self, FsmError> {
        serde_json::from_str(json).map_err(|e| FsmError::Config(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, FsmError> {
        serde_json::to_string_pretty(self).map_err(|e| FsmError::Config(e.to_string()))
    }

    /// Resolve labels and handler names into a definition.
    ///
    /// Unknown labels and handlers are reported as configuration issues
    /// together with the usual definition checks.
    pub fn bind<C>(&self, registry: &HandlerRegistry<C>) -> Result<Definition<C>, FsmError> {
        self.builder(registry).build()
    }

    pub fn bind_with_invoker<C>(
        &self,
        registry: &HandlerRegistry<C>,
        invoker: Arc<dyn OutputInvoker<C>>,
    ) -> Result<Definition<C>, FsmError> {
        self.builder(registry).invoker(invoker).build()
    }

    fn builder<C>(&self, registry: &HandlerRegistry<C>) -> DefinitionBuilder<C> {
        let labels: HashMap<&str, usize> = self
            .states
            .iter()
            .enumerate()
            .map(|(index, state)| (state.label.as_str(), index))
            .collect();

        let mut builder = DefinitionBuilder::new(self.name.clone());
        for state in &self.states {
            builder = builder.state(state.label.clone(), state.timeout_ms);
        }

        for (index, state) in self.states.iter().enumerate() {
            for (outcome, entry) in [
                (Outcome::Normal, &state.normal),
                (Outcome::TimedOut, &state.timeout),
            ] {
                let next = match &entry.next {
                    NextConfig::State(label) => match labels.get(label.as_str()) {
                        Some(&target) => Next::To(target),
                        None => {
                            builder = builder.reject(ConfigIssue::UnknownState {
                                label: label.clone(),
                            });
                            continue;
                        }
                    },
                    NextConfig::Handler => Next::HandlerManaged,
                    NextConfig::Terminate => Next::Terminate,
                };
                let output = match &entry.handler {
                    Some(name) => match registry.get(name) {
                        Some(output) => Some(Arc::clone(output)),
                        None => {
                            builder = builder.reject(ConfigIssue::UnknownHandler {
                                name: name.clone(),
                            });
                            continue;
                        }
                    },
                    None => None,
                };
                builder = builder.shared(index, outcome, next, output);
            }
        }
        builder
    }
}

/// Output handlers addressable by name.
pub struct HandlerRegistry<C> {
    handlers: HashMap<String, OutputFn<C>>,
}

impl<C> HandlerRegistry<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register `output` under `name`, replacing any earlier handler.
    pub fn register<F>(mut self, name: impl Into<String>, output: F) -> Self
    where
        F: Fn(&mut C) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(name, output);
        self
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, output: F)
    where
        F: Fn(&mut C) -> HandlerResult + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(output));
    }

    pub fn get(&self, name: &str) -> Option<&OutputFn<C>> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<C> Default for HandlerRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for HandlerRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::TableEntry;

    const GAME: &str = r#"{
        "name": "G-FSM",
        "states": [
            { "label": "Init",
              "normal":  { "handler": "generate", "next": { "state": "Input" } },
              "timeout": { "handler": "expired",  "next": "terminate" } },
            { "label": "Input", "timeout_ms": 10000,
              "normal":  { "handler": "collect",  "next": "handler" },
              "timeout": { "handler": "expired",  "next": "terminate" } }
        ]
    }"#;

    fn registry() -> HandlerRegistry<Vec<&'static str>> {
        HandlerRegistry::new()
            .register("generate", |log: &mut Vec<&'static str>| {
                log.push("generate");
                Ok(())
            })
            .register("collect", |log: &mut Vec<&'static str>| {
                log.push("collect");
                Ok(())
            })
            .register("expired", |log: &mut Vec<&'static str>| {
                log.push("expired");
                Ok(())
            })
    }

    #[test]
    fn parses_and_binds_definition() {
        let config = DefinitionConfig::from_json(GAME).unwrap();
        assert_eq!(config.states[0].timeout_ms, 0);
        assert_eq!(config.states[1].normal.next, NextConfig::Handler);

        let definition = config.bind(&registry()).unwrap();
        assert_eq!(definition.name(), "G-FSM");
        assert_eq!(definition.timeout_ms(1), 10_000);
        assert_eq!(
            definition.entry(0, Outcome::Normal).map(TableEntry::next),
            Some(Next::To(1))
        );
        assert_eq!(
            definition.entry(1, Outcome::Normal).map(TableEntry::next),
            Some(Next::HandlerManaged)
        );
        assert_eq!(
            definition.entry(1, Outcome::TimedOut).map(TableEntry::next),
            Some(Next::Terminate)
        );

        let mut log = Vec::new();
        let entry = definition.entry(0, Outcome::Normal).unwrap();
        definition
            .invoker()
            .invoke(entry.output().unwrap(), &mut log)
            .unwrap();
        assert_eq!(log, vec!["generate"]);
    }

    #[test]
    fn unknown_names_are_reported_together() {
        let mut config = DefinitionConfig::from_json(GAME).unwrap();
        config.states[0].normal.next = NextConfig::State("Nowhere".to_string());
        config.states[1].normal.handler = Some("missing".to_string());

        let err = config.bind(&registry()).unwrap_err();
        let issues = err.issues();
        assert!(issues.contains(&ConfigIssue::UnknownState {
            label: "Nowhere".to_string()
        }));
        assert!(issues.contains(&ConfigIssue::UnknownHandler {
            name: "missing".to_string()
        }));
    }

    #[test]
    fn omitted_handler_yields_unbound_entry() {
        let mut config = DefinitionConfig::from_json(GAME).unwrap();
        config.states[1].timeout.handler = None;

        let definition = config.bind(&registry()).unwrap();
        assert_eq!(definition.unbound_entries(), vec![(1, Outcome::TimedOut)]);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = DefinitionConfig::from_json("{\"name\": 3}").unwrap_err();
        assert!(matches!(err, FsmError::Config(_)));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let json = r#"{ "name": "x", "states": [], "extra": true }"#;
        assert!(DefinitionConfig::from_json(json).is_err());
    }

    #[test]
    fn config_serializes_correctly() {
        let config = DefinitionConfig::from_json(GAME).unwrap();
        let json = config.to_json().unwrap();
        assert_eq!(DefinitionConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn registry_lookup() {
        let registry = registry();
        assert_eq!(registry.len(), 3);
        assert!(registry.contains("collect"));
        assert!(registry.get("nope").is_none());
        assert!(!registry.is_empty());
    }
}

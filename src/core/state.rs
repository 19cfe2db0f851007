//! State descriptors.
//!
//! A descriptor pairs the label used in logs with the state's timeout.
//! Descriptors are immutable once a definition is built.

use serde::{Deserialize, Serialize};

/// Label and timeout of one state.
///
/// A timeout of zero means the state never expires.
///
/// # Example
///
/// ```rust
/// use tablefsm::core::StateDesc;
///
/// let idle = StateDesc::never_expires("Idle");
/// let active = StateDesc::new("Active", 5_000);
///
/// assert!(!idle.has_timeout());
/// assert_eq!(active.timeout_ms(), 5_000);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateDesc {
    label: String,
    timeout_ms: u32,
}

impl StateDesc {
    pub fn new(label: impl Into<String>, timeout_ms: u32) -> Self {
        Self {
            label: label.into(),
            timeout_ms,
        }
    }

    pub fn never_expires(label: impl Into<String>) -> Self {
        Self::new(label, 0)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Whether this state can time out at all.
    pub fn has_timeout(&self) -> bool {
        self.timeout_ms > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_never_expires() {
        let desc = StateDesc::new("Init", 0);
        assert!(!desc.has_timeout());
        assert_eq!(desc, StateDesc::never_expires("Init"));
    }

    #[test]
    fn accessors_return_values() {
        let desc = StateDesc::new("Input", 10_000);
        assert_eq!(desc.label(), "Input");
        assert_eq!(desc.timeout_ms(), 10_000);
        assert!(desc.has_timeout());
    }

    #[test]
    fn descriptor_serializes_correctly() {
        let desc = StateDesc::new("Active", 250);
        let json = serde_json::to_string(&desc).unwrap();
        let back: StateDesc = serde_json::from_str(&json).unwrap();
        assert_eq!(desc, back);
    }
}

//! Macros for declaring host state enums.

/// Declare a state enum whose variants map onto definition rows.
///
/// Each variant names a state and its timeout in milliseconds (`0` never
/// expires). Rows follow declaration order. The macro generates `ALL`,
/// `label`, `timeout_ms`, `index`, `from_index`, `descriptors` and
/// `From<Enum> for usize`, so variants can be passed anywhere the engine
/// accepts `impl Into<usize>`.
///
/// # Example
///
/// ```
/// use tablefsm::state_enum;
///
/// state_enum! {
///     pub enum Phase {
///         Idle => 0,
///         Active => 5_000,
///     }
/// }
///
/// assert_eq!(Phase::Active.index(), 1);
/// assert_eq!(Phase::from_index(0), Some(Phase::Idle));
/// assert_eq!(Phase::descriptors()[1].timeout_ms(), 5_000);
/// assert_eq!(usize::from(Phase::Idle), 0);
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $timeout:expr
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $name {
            /// Every state, in row order.
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            pub fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            pub fn timeout_ms(self) -> u32 {
                match self {
                    $(Self::$variant => $timeout),*
                }
            }

            pub fn index(self) -> usize {
                self as usize
            }

            pub fn from_index(index: usize) -> Option<Self> {
                Self::ALL.get(index).copied()
            }

            pub fn descriptors() -> Vec<$crate::core::StateDesc> {
                Self::ALL
                    .iter()
                    .map(|state| $crate::core::StateDesc::new(state.label(), state.timeout_ms()))
                    .collect()
            }
        }

        impl From<$name> for usize {
            fn from(state: $name) -> usize {
                state as usize
            }
        }
    };
}

#[cfg(test)]
mod tests {
    crate::state_enum! {
        enum Main {
            Init => 0,
            Start => 0,
            Input => 10_000,
            Quit => 0,
        }
    }

    #[test]
    fn indices_follow_declaration_order() {
        assert_eq!(Main::Init.index(), 0);
        assert_eq!(Main::Quit.index(), 3);
        assert_eq!(Main::ALL.len(), 4);
        assert_eq!(Main::from_index(2), Some(Main::Input));
        assert_eq!(Main::from_index(4), None);
    }

    #[test]
    fn descriptors_carry_labels_and_timeouts() {
        let descriptors = Main::descriptors();
        assert_eq!(descriptors.len(), 4);
        assert_eq!(descriptors[2].label(), "Input");
        assert_eq!(descriptors[2].timeout_ms(), 10_000);
        assert!(!descriptors[0].has_timeout());
    }

    #[test]
    fn converts_into_row_index() {
        let row: usize = Main::Start.into();
        assert_eq!(row, 1);
    }
}

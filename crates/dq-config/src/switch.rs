//! Typed process switches
//!
//! The downstream executables read switches as strings. Three encodings
//! exist in practice:
//!
//! | Encoding  | Enabled  | Disabled |
//! |-----------|----------|----------|
//! | `Boolean` | `"true"` | `"false"`|
//! | `Counter` | `"1"`    | `"-1"`   |
//! | `Binary`  | `"1"`    | `"0"`    |

use std::fmt;

/// State of a process switch, independent of how it is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Switch {
    /// Sub-stage runs
    Enabled,
    /// Sub-stage is skipped
    Disabled,
}

impl Switch {
    /// Map a boolean onto a switch
    #[inline]
    #[must_use]
    pub const fn from_bool(enabled: bool) -> Self {
        if enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }

    /// Check if switch is enabled
    #[inline]
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => write!(f, "enabled"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

/// String encoding of a switch inside the configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// `"true"` / `"false"`
    #[default]
    Boolean,
    /// `"1"` / `"-1"`
    Counter,
    /// `"1"` / `"0"`
    Binary,
}

impl Encoding {
    /// Sentinel written for the given switch state
    #[must_use]
    pub const fn sentinel(self, switch: Switch) -> &'static str {
        match (self, switch) {
            (Self::Boolean, Switch::Enabled) => "true",
            (Self::Boolean, Switch::Disabled) => "false",
            (Self::Counter | Self::Binary, Switch::Enabled) => "1",
            (Self::Counter, Switch::Disabled) => "-1",
            (Self::Binary, Switch::Disabled) => "0",
        }
    }

    /// Decode a raw document value
    ///
    /// Returns `None` for values that are not a sentinel of this encoding.
    /// Counters treat `"0"` as disabled as well.
    #[must_use]
    pub fn decode(self, raw: &str) -> Option<Switch> {
        match (self, raw.trim()) {
            (Self::Boolean, "true") => Some(Switch::Enabled),
            (Self::Boolean, "false") => Some(Switch::Disabled),
            (Self::Counter | Self::Binary, "1") => Some(Switch::Enabled),
            (Self::Counter, "-1" | "0") => Some(Switch::Disabled),
            (Self::Binary, "0") => Some(Switch::Disabled),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_sentinels() {
        assert_eq!(Encoding::Boolean.sentinel(Switch::Enabled), "true");
        assert_eq!(Encoding::Boolean.sentinel(Switch::Disabled), "false");
        assert_eq!(Encoding::Boolean.decode("true"), Some(Switch::Enabled));
        assert_eq!(Encoding::Boolean.decode("false"), Some(Switch::Disabled));
        assert_eq!(Encoding::Boolean.decode("1"), None);
    }

    #[test]
    fn counter_sentinels() {
        assert_eq!(Encoding::Counter.sentinel(Switch::Enabled), "1");
        assert_eq!(Encoding::Counter.sentinel(Switch::Disabled), "-1");
        assert_eq!(Encoding::Counter.decode("0"), Some(Switch::Disabled));
        assert_eq!(Encoding::Counter.decode("true"), None);
    }

    #[test]
    fn binary_sentinels() {
        assert_eq!(Encoding::Binary.sentinel(Switch::Disabled), "0");
        assert_eq!(Encoding::Binary.decode("-1"), None);
    }

    #[test]
    fn switch_from_bool() {
        assert!(Switch::from_bool(true).is_enabled());
        assert!(!Switch::from_bool(false).is_enabled());
    }
}

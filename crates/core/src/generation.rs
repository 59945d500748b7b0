//! Identity epochs.

use serde::{Deserialize, Serialize};

/// Monotonic counter distinguishing identity epochs.
///
/// Every identity transition (initial check, sign-in, sign-out) moves to the
/// next generation. Asynchronous results are tagged with the generation they
/// were issued under and are only applied while that generation is current.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    /// The generation in effect at process start, before any identity event.
    pub const fn initial() -> Self {
        Self(0)
    }

    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The generation that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Whether a result tagged with `self` may still be applied while
    /// `current` is the active generation.
    pub fn is_current(self, current: Generation) -> bool {
        self == current
    }
}

impl core::fmt::Display for Generation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

//! Trace timestamps.
//!
//! The producer decides whether ticks are logical or wall clock. Replay only
//! orders and buckets by them, it never interprets them.

use serde::{Deserialize, Serialize};

/// Timestamp of a trace message; non-unique across messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Timestamp zero
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Create from raw value
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get raw value
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Ticks elapsed since an earlier timestamp, zero if it is not earlier
    #[must_use]
    pub const fn saturating_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_ordering() {
        assert!(Timestamp::from_raw(1) < Timestamp::from_raw(2));
        assert_eq!(Timestamp::default(), Timestamp::zero());
    }

    #[test]
    fn test_saturating_since() {
        let early = Timestamp::from_raw(10);
        let late = Timestamp::from_raw(25);
        assert_eq!(late.saturating_since(early), 15);
        assert_eq!(early.saturating_since(late), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Timestamp::from(42).to_string(), "42");
    }
}

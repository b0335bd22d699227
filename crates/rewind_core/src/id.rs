//! Identifiers found in trace lines.
//!
//! GUIDs are the runtime's own numeric identifiers, printed in hex.
//! Kind codes select which capabilities compose an entity.

use serde::{Deserialize, Serialize};

/// Globally unique identifier of a traced runtime object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Guid(u64);

impl Guid {
    /// Create from a raw value
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Parse from hex digits without the `0x` prefix
    #[must_use]
    pub fn from_hex(digits: &str) -> Option<Self> {
        u64::from_str_radix(digits, 16).ok().map(Self)
    }

    /// Get raw value
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<u64> for Guid {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Entity kind code as printed in the trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KindCode(u32);

impl KindCode {
    /// Allocator
    pub const ALLOCATOR: Self = Self(1);
    /// Data block
    pub const DATA_BLOCK: Self = Self(2);
    /// Task
    pub const TASK: Self = Self(3);
    /// Event
    pub const EVENT: Self = Self(4);
    /// Worker
    pub const WORKER: Self = Self(6);

    /// All kinds with a well-known label
    pub const WELL_KNOWN: [Self; 5] = [
        Self::ALLOCATOR,
        Self::DATA_BLOCK,
        Self::TASK,
        Self::EVENT,
        Self::WORKER,
    ];

    /// Create from a raw code
    #[must_use]
    pub const fn new(code: u32) -> Self {
        Self(code)
    }

    /// Get raw code
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Conventional label for the code, if it has one
    #[must_use]
    pub const fn well_known_label(&self) -> Option<&'static str> {
        match self.0 {
            1 => Some("allocator"),
            2 => Some("data-block"),
            3 => Some("task"),
            4 => Some("event"),
            6 => Some("worker"),
            _ => None,
        }
    }
}

impl std::fmt::Display for KindCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for KindCode {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

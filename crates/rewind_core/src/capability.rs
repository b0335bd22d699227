//! Base operations a capability can contribute to an entity kind.

use serde::{Deserialize, Serialize};

/// One of the three aggregating operations every entity dispatches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseOperation {
    /// Decide whether a message kind is of interest
    RespondsTo,
    /// Accumulate state from a delivered message
    Notify,
    /// Report accumulated state
    Dump,
}

impl BaseOperation {
    /// All base operations in dispatch order
    pub const ALL: [Self; 3] = [Self::RespondsTo, Self::Notify, Self::Dump];

    /// Symbol name of the operation
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RespondsTo => "responds_to",
            Self::Notify => "notify",
            Self::Dump => "dump",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Self::RespondsTo => 0b001,
            Self::Notify => 0b010,
            Self::Dump => 0b100,
        }
    }
}

impl std::fmt::Display for BaseOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Symbols no capability may export: the base operations and the fields
/// every entity already owns
pub const RESERVED_SYMBOLS: [&str; 7] = [
    "responds_to",
    "notify",
    "dump",
    "guid",
    "kind",
    "history",
    "responders",
];

/// Set of base operations a capability defines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OperationSet(u8);

impl OperationSet {
    /// No operations
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// All three operations
    #[must_use]
    pub const fn all() -> Self {
        Self(0b111)
    }

    /// Build from a list of operations
    #[must_use]
    pub fn of(operations: &[BaseOperation]) -> Self {
        operations
            .iter()
            .fold(Self::empty(), |set, op| set.with(*op))
    }

    /// Add an operation
    #[must_use]
    pub const fn with(self, operation: BaseOperation) -> Self {
        Self(self.0 | operation.bit())
    }

    /// Check membership
    #[must_use]
    pub const fn contains(&self, operation: BaseOperation) -> bool {
        self.0 & operation.bit() != 0
    }

    /// Check if empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate in dispatch order
    pub fn iter(&self) -> impl Iterator<Item = BaseOperation> + '_ {
        BaseOperation::ALL
            .into_iter()
            .filter(move |op| self.contains(*op))
    }
}

/// Whether a symbol name collides with a base operation or entity field
#[must_use]
pub fn is_reserved(symbol: &str) -> bool {
    RESERVED_SYMBOLS.contains(&symbol)
}

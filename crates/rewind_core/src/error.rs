//! Core error types for REWIND.
//!
//! Any error raised while reading or routing trace lines aborts the replay.
//! Dropped messages are not errors and never appear here.

use crate::id::{Guid, KindCode};

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Two capabilities attached to one kind export the same symbol,
    /// or the kind has nothing attached at all
    #[error("Composition conflict for kind {kind}: {symbol}")]
    CompositionConflict {
        /// Entity kind being composed
        kind: String,
        /// Offending symbol
        symbol: String,
    },

    /// A registry entry names a capability the catalog does not know
    #[error("Unknown capability '{capability}' for kind {kind}")]
    UnknownCapability {
        /// Entity kind being composed
        kind: String,
        /// Capability name that failed to resolve
        capability: String,
    },

    /// A trace line references a kind code with no registry entry
    #[error("Unknown entity kind {code} for guid {guid}")]
    UnknownEntityKind {
        /// Kind code found in the trace
        code: KindCode,
        /// Guid that was being resolved
        guid: Guid,
    },

    /// Neither `type` nor `type.subtype` has a message class
    #[error("Unregistered message kind: {kind}")]
    UnregisteredMessageKind {
        /// The `type[.subtype]` string that failed to resolve
        kind: String,
    },

    /// A trace line does not match the grammar
    #[error("Malformed trace line {line_number}: '{line}'")]
    MalformedTraceLine {
        /// One-based line number in the trace
        line_number: usize,
        /// Raw line text
        line: String,
    },

    /// Registration attempted after replay started
    #[error("Registry '{registry}' is frozen; replay has already started")]
    RegistryFrozen {
        /// Which registry rejected the change
        registry: String,
    },

    /// `read_trace` called without an open trace
    #[error("No trace file is open")]
    TraceNotOpen,

    /// Configuration could not be parsed or applied
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong
        reason: String,
    },

    /// I/O failure on a trace or output file
    #[error("I/O error on {path}: {reason}")]
    Io {
        /// Path (or stream name) involved
        path: String,
        /// Underlying error text
        reason: String,
    },
}

impl CoreError {
    /// Wrap an I/O error with the path it happened on
    #[must_use]
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig {
            reason: err.to_string(),
        }
    }
}

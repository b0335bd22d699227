//! REWIND Core Types
//!
//! This crate contains pure types and logic with no I/O.
//! Everything a trace line or a registry table can name lives here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod capability;
pub mod error;
pub mod id;
pub mod options;
pub mod time;

// Re-exports
pub use capability::{is_reserved, BaseOperation, OperationSet, RESERVED_SYMBOLS};
pub use error::{CoreError, CoreResult};
pub use id::{Guid, KindCode};
pub use options::DumpOptions;
pub use time::Timestamp;

//! REWIND Replay Engine
//!
//! Reconstructs the entities of a traced run from its log.
//! Entity kinds are composed from capabilities; every trace line is routed
//! to its destination entity in file order.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builtin;
pub mod capability;
pub mod compose;
pub mod config;
pub mod driver;
pub mod entity;
pub mod registry;
pub mod stats;

pub use builtin::{KindFilter, Lifespan, MessageCounter, MessageLog, Span, LIMIT_OPTION};
pub use capability::{Capability, CapabilityCatalog};
pub use compose::{ComposedKind, MergedSymbol, EMPTY_COMPOSITION};
pub use config::{FilterEntry, KindEntry, MessageEntry, ReplayConfig};
pub use driver::Driver;
pub use entity::Entity;
pub use registry::EntityTypeRegistry;
pub use stats::{Delivery, DriverState, ReplayStats, ReplaySummary};

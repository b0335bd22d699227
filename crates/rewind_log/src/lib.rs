//! REWIND Trace Log
//!
//! Line-oriented trace grammar and the typed messages it produces.
//! Parsing is strict: a line either matches the grammar or the replay stops.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classifier;
pub mod grammar;
pub mod message;
pub mod stream;

pub use classifier::{GenericMessage, MessageClass, MessageClassifier, NamedClass};
pub use grammar::TraceLine;
pub use message::{EntityRef, Message, MessageKind};
pub use stream::TraceLines;

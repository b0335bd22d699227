//! Typed trace messages.
//!
//! A message is immutable once built and is delivered exactly once.

use crate::classifier::MessageClass;
use rewind_core::{Guid, KindCode, Timestamp};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::sync::Arc;

/// Dotted `type[.subtype]` message kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageKind(String);

impl MessageKind {
    /// Kind for a plain message type
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    /// Kind for `type.subtype`
    #[must_use]
    pub fn with_subtype(type_code: &str, subtype: &str) -> Self {
        Self(format!("{type_code}.{subtype}"))
    }

    /// The `type` part
    #[must_use]
    pub fn type_code(&self) -> &str {
        self.0.split_once('.').map_or(self.0.as_str(), |(t, _)| t)
    }

    /// The `subtype` part, if the kind has one
    #[must_use]
    pub fn subtype(&self) -> Option<&str> {
        self.0.split_once('.').map(|(_, s)| s)
    }

    /// Get as string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for MessageKind {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for MessageKind {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageKind {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Non-owning reference to an entity: its guid and the kind code it was
/// announced with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity guid
    pub guid: Guid,
    /// Kind code from the trace
    pub kind: KindCode,
}

impl EntityRef {
    /// Create a new entity reference
    #[must_use]
    pub const fn new(guid: Guid, kind: KindCode) -> Self {
        Self { guid, kind }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.guid, self.kind)
    }
}

/// One parsed trace line, classified and addressed
#[derive(Debug, Clone)]
pub struct Message {
    timestamp: Timestamp,
    kind: MessageKind,
    source: EntityRef,
    destination: EntityRef,
    subtype: Option<String>,
    payload: String,
    class: Arc<dyn MessageClass>,
}

impl Message {
    /// Create a new message
    #[must_use]
    pub fn new(
        timestamp: Timestamp,
        kind: MessageKind,
        source: EntityRef,
        destination: EntityRef,
        class: Arc<dyn MessageClass>,
    ) -> Self {
        Self {
            timestamp,
            kind,
            source,
            destination,
            subtype: None,
            payload: String::new(),
            class,
        }
    }

    /// Attach the subtype token as it appeared in the trace
    #[must_use]
    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    /// Attach the opaque payload
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Timestamp
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Resolved message kind (`type` or `type.subtype`)
    #[must_use]
    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    /// Source entity
    #[must_use]
    pub fn source(&self) -> EntityRef {
        self.source
    }

    /// Destination entity
    #[must_use]
    pub fn destination(&self) -> EntityRef {
        self.destination
    }

    /// Subtype token from the trace, even when the kind fell back to `type`
    #[must_use]
    pub fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref()
    }

    /// Unparsed remainder of the line
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Message class this line was classified as
    #[must_use]
    pub fn class(&self) -> &Arc<dyn MessageClass> {
        &self.class
    }

    /// Human-readable rendering, delegated to the message class
    #[must_use]
    pub fn describe(&self) -> String {
        self.class.describe(self)
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::GenericMessage;

    fn endpoints() -> (EntityRef, EntityRef) {
        (
            EntityRef::new(Guid::new(1), KindCode::TASK),
            EntityRef::new(Guid::new(2), KindCode::EVENT),
        )
    }

    #[test]
    fn test_message_kind_parts() {
        let kind = MessageKind::with_subtype("5", "foo");
        assert_eq!(kind.as_str(), "5.foo");
        assert_eq!(kind.type_code(), "5");
        assert_eq!(kind.subtype(), Some("foo"));

        let plain = MessageKind::new("5");
        assert_eq!(plain.type_code(), "5");
        assert_eq!(plain.subtype(), None);
    }

    #[test]
    fn test_message_accessors() {
        let (src, dest) = endpoints();
        let msg = Message::new(
            Timestamp::from_raw(10),
            MessageKind::new("3"),
            src,
            dest,
            Arc::new(GenericMessage),
        )
        .with_subtype("hello")
        .with_payload("a b c");

        assert_eq!(msg.timestamp(), Timestamp::from_raw(10));
        assert_eq!(msg.kind().as_str(), "3");
        assert_eq!(msg.source().guid, Guid::new(1));
        assert_eq!(msg.destination().kind, KindCode::EVENT);
        assert_eq!(msg.subtype(), Some("hello"));
        assert_eq!(msg.payload(), "a b c");
        assert_eq!(msg.class().name(), "generic");
    }

    #[test]
    fn test_message_display() {
        let (src, dest) = endpoints();
        let msg = Message::new(
            Timestamp::from_raw(7),
            MessageKind::new("3"),
            src,
            dest,
            Arc::new(GenericMessage),
        );
        let text = msg.to_string();
        assert!(text.contains("0x1(3)"));
        assert!(text.contains("0x2(4)"));
        assert!(text.contains("ts=7"));
    }

    #[test]
    fn test_entity_ref_display() {
        let r = EntityRef::new(Guid::new(0xab), KindCode::WORKER);
        assert_eq!(r.to_string(), "0xab(6)");
    }
}

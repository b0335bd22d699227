//! Built-in capabilities.

use crate::capability::Capability;
use crate::entity::Entity;
use indexmap::IndexMap;
use rewind_core::{BaseOperation, DumpOptions, Guid, OperationSet, Timestamp};
use rewind_log::{Message, MessageKind};
use serde_json::Value;
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Dump option limiting how many messages `message-log` prints per entity
pub const LIMIT_OPTION: &str = "limit";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Writes the messages of an entity in timestamp order, then delivery order
pub(crate) fn write_messages(
    entity: &Entity,
    limit: Option<usize>,
    out: &mut dyn Write,
) -> io::Result<()> {
    writeln!(out, "--- Messages dump for {} ---", entity)?;
    let limit = limit.unwrap_or(usize::MAX);
    for message in entity.messages().take(limit) {
        writeln!(out, "\t{}", message)?;
    }
    let total = entity.message_count();
    if total > limit {
        writeln!(out, "\t... {} more", total - limit)?;
    }
    Ok(())
}

/// Responds to every kind and dumps the full history
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageLog;

impl Capability for MessageLog {
    fn name(&self) -> &str {
        "message-log"
    }

    fn operations(&self) -> OperationSet {
        OperationSet::of(&[BaseOperation::RespondsTo, BaseOperation::Dump])
    }

    fn responds_to(&self, _entity: &Entity, _kind: &MessageKind) -> bool {
        true
    }

    fn dump(&self, entity: &Entity, options: &DumpOptions, out: &mut dyn Write) -> io::Result<()> {
        let limit = options.get(LIMIT_OPTION).and_then(|v| v.parse().ok());
        write_messages(entity, limit, out)
    }
}

/// Counts delivered messages per entity and kind
#[derive(Debug, Default)]
pub struct MessageCounter {
    counts: Mutex<HashMap<Guid, IndexMap<MessageKind, u64>>>,
}

impl MessageCounter {
    /// Create a counter with no observations
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total messages counted for an entity
    #[must_use]
    pub fn count(&self, guid: Guid) -> u64 {
        lock(&self.counts)
            .get(&guid)
            .map_or(0, |kinds| kinds.values().sum())
    }

    /// Messages of one kind counted for an entity
    #[must_use]
    pub fn count_of(&self, guid: Guid, kind: &str) -> u64 {
        lock(&self.counts)
            .get(&guid)
            .and_then(|kinds| kinds.get(kind).copied())
            .unwrap_or(0)
    }
}

impl Capability for MessageCounter {
    fn name(&self) -> &str {
        "message-counter"
    }

    fn symbols(&self) -> IndexMap<String, Value> {
        let mut symbols = IndexMap::new();
        symbols.insert("message-counter.scope".to_string(), Value::from("per-kind"));
        symbols
    }

    fn responds_to(&self, _entity: &Entity, _kind: &MessageKind) -> bool {
        true
    }

    fn notify(&self, entity: &Entity, message: &Message) {
        let mut counts = lock(&self.counts);
        *counts
            .entry(entity.guid())
            .or_default()
            .entry(message.kind().clone())
            .or_insert(0) += 1;
    }

    fn dump(&self, entity: &Entity, _options: &DumpOptions, out: &mut dyn Write) -> io::Result<()> {
        let counts = lock(&self.counts);
        writeln!(out, "--- Message counts for {} ---", entity)?;
        let Some(kinds) = counts.get(&entity.guid()) else {
            return writeln!(out, "\t(none)");
        };
        for (kind, count) in kinds {
            writeln!(out, "\t{}: {}", kind, count)?;
        }
        writeln!(out, "\ttotal: {}", kinds.values().sum::<u64>())
    }
}

/// Earliest and latest timestamp seen for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Smallest timestamp delivered
    pub earliest: Timestamp,
    /// Largest timestamp delivered
    pub latest: Timestamp,
}

impl Span {
    /// Ticks between earliest and latest
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.latest.saturating_since(self.earliest)
    }
}

/// Tracks the timestamp span over which each entity received messages
///
/// Uses min/max rather than first/last since trace files are replayed in
/// file order, which need not be timestamp order.
#[derive(Debug, Default)]
pub struct Lifespan {
    spans: Mutex<HashMap<Guid, Span>>,
}

impl Lifespan {
    /// Create with no observations
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Span recorded for an entity
    #[must_use]
    pub fn span(&self, guid: Guid) -> Option<Span> {
        lock(&self.spans).get(&guid).copied()
    }
}

impl Capability for Lifespan {
    fn name(&self) -> &str {
        "lifespan"
    }

    fn responds_to(&self, _entity: &Entity, _kind: &MessageKind) -> bool {
        true
    }

    fn notify(&self, entity: &Entity, message: &Message) {
        let ts = message.timestamp();
        lock(&self.spans)
            .entry(entity.guid())
            .and_modify(|span| {
                span.earliest = span.earliest.min(ts);
                span.latest = span.latest.max(ts);
            })
            .or_insert(Span {
                earliest: ts,
                latest: ts,
            });
    }

    fn dump(&self, entity: &Entity, _options: &DumpOptions, out: &mut dyn Write) -> io::Result<()> {
        match self.span(entity.guid()) {
            Some(span) => writeln!(
                out,
                "--- Lifespan of {}: {}..{} ({} ticks) ---",
                entity,
                span.earliest,
                span.latest,
                span.ticks()
            ),
            None => writeln!(out, "--- Lifespan of {}: no messages ---", entity),
        }
    }
}

/// Responds only to message kinds matching its patterns
///
/// A pattern `"3"` matches kind `3` and every `3.<subtype>`; a pattern
/// `"3.foo"` matches only `3.foo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindFilter {
    name: String,
    patterns: Vec<String>,
}

impl KindFilter {
    /// Create a named filter
    #[must_use]
    pub fn new(name: impl Into<String>, patterns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            patterns,
        }
    }

    /// Whether a kind matches any pattern
    #[must_use]
    pub fn matches(&self, kind: &MessageKind) -> bool {
        self.patterns.iter().any(|pattern| {
            if pattern.contains('.') {
                pattern == kind.as_str()
            } else {
                pattern == kind.type_code()
            }
        })
    }
}

impl Capability for KindFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn operations(&self) -> OperationSet {
        OperationSet::empty().with(BaseOperation::RespondsTo)
    }

    fn symbols(&self) -> IndexMap<String, Value> {
        let mut symbols = IndexMap::new();
        symbols.insert(format!("{}.kinds", self.name), Value::from(self.patterns.clone()));
        symbols
    }

    fn responds_to(&self, _entity: &Entity, kind: &MessageKind) -> bool {
        self.matches(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::ComposedKind;
    use rewind_core::KindCode;
    use rewind_log::{EntityRef, GenericMessage};
    use std::sync::Arc;

    fn entity_with(capabilities: Vec<Arc<dyn Capability>>) -> Entity {
        let kind = ComposedKind::compose(KindCode::EVENT, "event", capabilities).unwrap();
        Entity::new(Guid::new(2), Arc::new(kind))
    }

    fn message(ts: u64, kind: &str) -> Message {
        Message::new(
            Timestamp::from_raw(ts),
            MessageKind::new(kind),
            EntityRef::new(Guid::new(1), KindCode::TASK),
            EntityRef::new(Guid::new(2), KindCode::EVENT),
            Arc::new(GenericMessage),
        )
    }

    fn deliver(entity: &mut Entity, msg: Message) {
        assert!(entity.responds_to(msg.kind()));
        entity.notify(msg);
    }

    #[test]
    fn test_counter_counts_per_kind() {
        let counter = Arc::new(MessageCounter::new());
        let mut entity = entity_with(vec![counter.clone() as Arc<dyn Capability>]);
        deliver(&mut entity, message(1, "3"));
        deliver(&mut entity, message(2, "3"));
        deliver(&mut entity, message(3, "4.sat"));

        assert_eq!(counter.count(Guid::new(2)), 3);
        assert_eq!(counter.count_of(Guid::new(2), "3"), 2);
        assert_eq!(counter.count_of(Guid::new(2), "4.sat"), 1);
        assert_eq!(counter.count(Guid::new(99)), 0);
    }

    #[test]
    fn test_counter_dump() {
        let counter = Arc::new(MessageCounter::new());
        let mut entity = entity_with(vec![counter.clone() as Arc<dyn Capability>]);
        deliver(&mut entity, message(1, "3"));

        let mut out = Vec::new();
        entity.dump(&DumpOptions::new(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("3: 1"));
        assert!(text.contains("total: 1"));
    }

    #[test]
    fn test_lifespan_uses_min_max() {
        let lifespan = Arc::new(Lifespan::new());
        let mut entity = entity_with(vec![lifespan.clone() as Arc<dyn Capability>]);
        deliver(&mut entity, message(20, "3"));
        deliver(&mut entity, message(5, "3"));
        deliver(&mut entity, message(12, "3"));

        let span = lifespan.span(Guid::new(2)).unwrap();
        assert_eq!(span.earliest, Timestamp::from_raw(5));
        assert_eq!(span.latest, Timestamp::from_raw(20));
        assert_eq!(span.ticks(), 15);
    }

    #[test]
    fn test_message_log_limit() {
        let mut entity = entity_with(vec![Arc::new(MessageLog) as Arc<dyn Capability>]);
        for ts in 0..5 {
            deliver(&mut entity, message(ts, "3"));
        }

        let mut out = Vec::new();
        let options = DumpOptions::new().with(LIMIT_OPTION, "2");
        entity.dump(&options, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("\tgeneric")).count(), 2);
        assert!(text.contains("... 3 more"));
    }

    #[test]
    fn test_kind_filter_patterns() {
        let filter = KindFilter::new("tasks", vec!["3".to_string(), "4.sat".to_string()]);
        assert!(filter.matches(&MessageKind::new("3")));
        assert!(filter.matches(&MessageKind::new("3.anything")));
        assert!(filter.matches(&MessageKind::new("4.sat")));
        assert!(!filter.matches(&MessageKind::new("4")));
        assert!(!filter.matches(&MessageKind::new("4.other")));
        assert!(!filter.matches(&MessageKind::new("30")));
    }

    #[test]
    fn test_kind_filter_only_responds() {
        let filter = KindFilter::new("tasks", vec!["3".to_string()]);
        assert_eq!(
            filter.operations(),
            OperationSet::empty().with(BaseOperation::RespondsTo)
        );
        assert!(filter.symbols().contains_key("tasks.kinds"));
    }
}

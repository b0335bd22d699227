//! Simulated runtime entities.
//!
//! An entity keeps every message delivered to it, bucketed by timestamp.
//! Within a bucket messages stay in delivery order, which is trace file order.

use crate::builtin::write_messages;
use crate::capability::Capability;
use crate::compose::ComposedKind;
use rewind_core::{BaseOperation, DumpOptions, Guid, Timestamp};
use rewind_log::{Message, MessageKind};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{debug, trace};

/// A runtime object reconstructed from the trace
#[derive(Debug)]
pub struct Entity {
    guid: Guid,
    kind: Arc<ComposedKind>,
    history: BTreeMap<Timestamp, Vec<Message>>,
    responders: HashMap<MessageKind, Vec<Arc<dyn Capability>>>,
    message_count: usize,
}

impl Entity {
    /// Create an entity of a composed kind
    #[must_use]
    pub fn new(guid: Guid, kind: Arc<ComposedKind>) -> Self {
        Self {
            guid,
            kind,
            history: BTreeMap::new(),
            responders: HashMap::new(),
            message_count: 0,
        }
    }

    /// Entity guid
    #[must_use]
    pub fn guid(&self) -> Guid {
        self.guid
    }

    /// Composed kind this entity was created with
    #[must_use]
    pub fn kind(&self) -> &Arc<ComposedKind> {
        &self.kind
    }

    /// Messages bucketed by timestamp
    #[must_use]
    pub fn history(&self) -> &BTreeMap<Timestamp, Vec<Message>> {
        &self.history
    }

    /// Messages delivered at one timestamp, in delivery order
    #[must_use]
    pub fn messages_at(&self, timestamp: Timestamp) -> &[Message] {
        self.history.get(&timestamp).map_or(&[], Vec::as_slice)
    }

    /// All messages in timestamp order, then delivery order
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.history.values().flatten()
    }

    /// Number of messages in history
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.message_count
    }

    /// Symbol merged into this entity's kind
    #[must_use]
    pub fn symbol(&self, name: &str) -> Option<&Value> {
        self.kind.symbol(name).map(|s| &s.value)
    }

    /// Names of the cached responders for a kind, if resolved yet
    #[must_use]
    pub fn cached_responders(&self, kind: &str) -> Option<Vec<&str>> {
        self.responders
            .get(kind)
            .map(|caps| caps.iter().map(|c| c.name()).collect())
    }

    /// Whether at least one capability responds to `kind`
    ///
    /// The first call for a kind asks every `responds_to` contributor and
    /// caches those that answered yes; later calls use the cache only.
    pub fn responds_to(&mut self, kind: &MessageKind) -> bool {
        if let Some(cached) = self.responders.get(kind) {
            trace!(entity = %self, kind = %kind, responders = cached.len(), "cached responders");
            return !cached.is_empty();
        }

        let this: &Entity = self;
        let responders: Vec<Arc<dyn Capability>> = this
            .kind
            .contributors(BaseOperation::RespondsTo)
            .iter()
            .filter(|capability| capability.responds_to(this, kind))
            .cloned()
            .collect();
        debug!(entity = %this, kind = %kind, responders = responders.len(), "built responder cache");

        let responds = !responders.is_empty();
        self.responders.insert(kind.clone(), responders);
        responds
    }

    /// Append a message to history and let capabilities observe it
    ///
    /// Cached responders for the message's kind are notified if the kind
    /// has been resolved; otherwise every `notify` contributor is.
    pub fn notify(&mut self, message: Message) {
        let timestamp = message.timestamp();
        let kind = message.kind().clone();
        let bucket = self.history.entry(timestamp).or_default();
        bucket.push(message);
        let index = bucket.len() - 1;
        self.message_count += 1;

        let this: &Entity = self;
        let message = &this.history[&timestamp][index];
        trace!(entity = %this, ts = %timestamp, kind = %kind, "appended message");

        match this.responders.get(&kind) {
            Some(cached) => {
                for capability in cached {
                    if capability.operations().contains(BaseOperation::Notify) {
                        capability.notify(this, message);
                    }
                }
            }
            None => {
                for capability in this.kind.contributors(BaseOperation::Notify) {
                    capability.notify(this, message);
                }
            }
        }
    }

    /// Report on this entity
    ///
    /// Each `dump` contributor runs in attachment order with the same
    /// options; without contributors every message is printed.
    ///
    /// # Errors
    ///
    /// Returns error if writing to `out` fails
    pub fn dump(&self, options: &DumpOptions, out: &mut dyn Write) -> io::Result<()> {
        let contributors = self.kind.contributors(BaseOperation::Dump);
        if contributors.is_empty() {
            return write_messages(self, None, out);
        }
        for capability in contributors {
            capability.dump(self, options, out)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity(kind={}, guid={})", self.kind.label(), self.guid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_core::{KindCode, OperationSet};
    use rewind_log::{EntityRef, GenericMessage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts every call made into it
    #[derive(Default)]
    struct Tally {
        name: &'static str,
        answer: bool,
        ops: Option<OperationSet>,
        responds_calls: AtomicUsize,
        notify_calls: AtomicUsize,
        dump_calls: AtomicUsize,
    }

    impl Tally {
        fn new(name: &'static str, answer: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                answer,
                ..Default::default()
            })
        }

        fn with_ops(name: &'static str, answer: bool, ops: OperationSet) -> Arc<Self> {
            Arc::new(Self {
                name,
                answer,
                ops: Some(ops),
                ..Default::default()
            })
        }

        fn responds(&self) -> usize {
            self.responds_calls.load(Ordering::SeqCst)
        }

        fn notified(&self) -> usize {
            self.notify_calls.load(Ordering::SeqCst)
        }
    }

    impl Capability for Tally {
        fn name(&self) -> &str {
            self.name
        }

        fn operations(&self) -> OperationSet {
            self.ops.unwrap_or_else(OperationSet::all)
        }

        fn responds_to(&self, _entity: &Entity, _kind: &MessageKind) -> bool {
            self.responds_calls.fetch_add(1, Ordering::SeqCst);
            self.answer
        }

        fn notify(&self, _entity: &Entity, _message: &Message) {
            self.notify_calls.fetch_add(1, Ordering::SeqCst);
        }

        fn dump(&self, _entity: &Entity, _options: &DumpOptions, out: &mut dyn Write) -> io::Result<()> {
            self.dump_calls.fetch_add(1, Ordering::SeqCst);
            writeln!(out, "tally {}", self.name)
        }
    }

    fn shared(tally: &Arc<Tally>) -> Arc<dyn Capability> {
        Arc::clone(tally) as Arc<dyn Capability>
    }

    fn entity(capabilities: Vec<Arc<dyn Capability>>) -> Entity {
        let kind = ComposedKind::compose(KindCode::EVENT, "event", capabilities).unwrap();
        Entity::new(Guid::new(2), Arc::new(kind))
    }

    fn message(ts: u64, kind: &str, payload: &str) -> Message {
        Message::new(
            Timestamp::from_raw(ts),
            MessageKind::new(kind),
            EntityRef::new(Guid::new(1), KindCode::TASK),
            EntityRef::new(Guid::new(2), KindCode::EVENT),
            Arc::new(GenericMessage),
        )
        .with_payload(payload)
    }

    #[test]
    fn test_responds_to_is_cached() {
        let yes = Tally::new("yes", true);
        let no = Tally::new("no", false);
        let mut e = entity(vec![shared(&yes), shared(&no)]);
        let kind = MessageKind::new("3");

        assert!(e.responds_to(&kind));
        assert_eq!((yes.responds(), no.responds()), (1, 1));

        assert!(e.responds_to(&kind));
        assert_eq!((yes.responds(), no.responds()), (1, 1));
        assert_eq!(e.cached_responders("3"), Some(vec!["yes"]));
    }

    #[test]
    fn test_cache_is_per_kind() {
        let yes = Tally::new("yes", true);
        let mut e = entity(vec![shared(&yes)]);

        e.responds_to(&MessageKind::new("3"));
        e.responds_to(&MessageKind::new("4"));
        e.responds_to(&MessageKind::new("3"));
        assert_eq!(yes.responds(), 2);
    }

    #[test]
    fn test_no_responders_cached_as_empty() {
        let no = Tally::new("no", false);
        let mut e = entity(vec![shared(&no)]);
        let kind = MessageKind::new("3");

        assert!(!e.responds_to(&kind));
        assert!(!e.responds_to(&kind));
        assert_eq!(no.responds(), 1);
        assert_eq!(e.cached_responders("3"), Some(vec![]));
    }

    #[test]
    fn test_notify_uses_cached_responders() {
        let yes = Tally::new("yes", true);
        let no = Tally::new("no", false);
        let mut e = entity(vec![shared(&yes), shared(&no)]);
        let msg = message(10, "3", "");

        assert!(e.responds_to(msg.kind()));
        e.notify(msg);
        assert_eq!(yes.notified(), 1);
        assert_eq!(no.notified(), 0);
    }

    #[test]
    fn test_notify_without_cache_calls_every_contributor() {
        let yes = Tally::new("yes", true);
        let no = Tally::new("no", false);
        let mut e = entity(vec![shared(&yes), shared(&no)]);

        e.notify(message(10, "3", ""));
        assert_eq!(yes.notified(), 1);
        assert_eq!(no.notified(), 1);
        assert_eq!(e.message_count(), 1);
        // The fallback path does not populate the cache
        assert_eq!(e.cached_responders("3"), None);
        assert_eq!(yes.responds(), 0);
    }

    #[test]
    fn test_notify_skips_responders_without_notify() {
        let filter = Tally::with_ops(
            "filter",
            true,
            OperationSet::empty().with(BaseOperation::RespondsTo),
        );
        let mut e = entity(vec![shared(&filter)]);
        let msg = message(1, "3", "");

        assert!(e.responds_to(msg.kind()));
        e.notify(msg);
        assert_eq!(filter.notified(), 0);
        assert_eq!(e.message_count(), 1);
    }

    #[test]
    fn test_history_keeps_delivery_order_within_bucket() {
        let mut e = entity(vec![shared(&Tally::new("yes", true))]);
        for (ts, payload) in [(5, "a"), (3, "b"), (5, "c"), (3, "d"), (4, "e")] {
            let msg = message(ts, "3", payload);
            assert!(e.responds_to(msg.kind()));
            e.notify(msg);
        }

        let at = |ts| -> Vec<String> {
            e.messages_at(Timestamp::from_raw(ts))
                .iter()
                .map(|m| m.payload().to_string())
                .collect()
        };
        assert_eq!(at(5), vec!["a", "c"]);
        assert_eq!(at(3), vec!["b", "d"]);
        assert!(e.messages_at(Timestamp::from_raw(9)).is_empty());

        let all: Vec<_> = e.messages().map(|m| m.payload()).collect();
        assert_eq!(all, vec!["b", "d", "e", "a", "c"]);
    }

    #[test]
    fn test_dump_calls_contributors_in_order() {
        let a = Tally::new("a", true);
        let b = Tally::new("b", true);
        let e = entity(vec![shared(&a), shared(&b)]);

        let mut out = Vec::new();
        e.dump(&DumpOptions::new(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "tally a\ntally b\n");
    }

    #[test]
    fn test_default_dump_without_contributors() {
        let only_responds = Tally::with_ops(
            "r",
            true,
            OperationSet::empty().with(BaseOperation::RespondsTo),
        );
        let mut e = entity(vec![shared(&only_responds)]);
        for (ts, payload) in [(2, "x"), (1, "y")] {
            let msg = message(ts, "3", payload);
            e.responds_to(msg.kind());
            e.notify(msg);
        }

        let mut first = Vec::new();
        e.dump(&DumpOptions::new(), &mut first).unwrap();
        let text = String::from_utf8(first.clone()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "--- Messages dump for Entity(kind=event, guid=0x2) ---");
        assert!(lines[1].contains("ts=1"));
        assert!(lines[2].contains("ts=2"));

        // Idempotent
        let mut second = Vec::new();
        e.dump(&DumpOptions::new(), &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_symbol_lookup() {
        let counter: Arc<dyn Capability> = Arc::new(crate::builtin::MessageCounter::new());
        let e = entity(vec![counter]);
        assert_eq!(e.symbol("message-counter.scope"), Some(&Value::from("per-kind")));
        assert_eq!(e.symbol("missing"), None);
    }
}

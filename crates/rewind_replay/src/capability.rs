//! Capabilities: pluggable analysis behaviour attached to entity kinds.
//!
//! A capability is shared by every entity of every kind it is attached to.
//! It holds no per-entity fields; anything it accumulates lives in its own
//! store keyed by entity guid.

use crate::entity::Entity;
use indexmap::IndexMap;
use rewind_core::{DumpOptions, OperationSet};
use rewind_log::{Message, MessageKind};
use serde_json::Value;
use std::io::{self, Write};
use std::sync::Arc;

/// Analysis behaviour composable into an entity kind
pub trait Capability: Send + Sync {
    /// Unique catalog name
    fn name(&self) -> &str;

    /// Base operations this capability contributes
    ///
    /// Only the declared operations are dispatched to it.
    fn operations(&self) -> OperationSet {
        OperationSet::all()
    }

    /// Extra symbols merged into the kind's namespace
    fn symbols(&self) -> IndexMap<String, Value> {
        IndexMap::new()
    }

    /// Whether this capability wants messages of `kind` sent to `entity`
    fn responds_to(&self, entity: &Entity, kind: &MessageKind) -> bool {
        let _ = (entity, kind);
        false
    }

    /// Observe a message already appended to `entity`'s history
    fn notify(&self, entity: &Entity, message: &Message) {
        let _ = (entity, message);
    }

    /// Report what this capability knows about `entity`
    ///
    /// # Errors
    ///
    /// Returns error if writing to `out` fails
    fn dump(&self, entity: &Entity, options: &DumpOptions, out: &mut dyn Write) -> io::Result<()> {
        let _ = (entity, options, out);
        Ok(())
    }
}

impl std::fmt::Debug for dyn Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name())
            .finish()
    }
}

/// Capabilities available to registry entries, by name
#[derive(Debug, Default, Clone)]
pub struct CapabilityCatalog {
    entries: IndexMap<String, Arc<dyn Capability>>,
}

impl CapabilityCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-loaded with the built-in capabilities
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.insert(Arc::new(crate::builtin::MessageLog));
        catalog.insert(Arc::new(crate::builtin::MessageCounter::new()));
        catalog.insert(Arc::new(crate::builtin::Lifespan::new()));
        catalog
    }

    /// Add a capability under its own name, replacing any previous entry
    pub fn insert(&mut self, capability: Arc<dyn Capability>) {
        self.entries
            .insert(capability.name().to_string(), capability);
    }

    /// Look up a capability by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.entries.get(name).cloned()
    }

    /// Names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of capabilities
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

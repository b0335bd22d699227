//! Entity type registry.
//!
//! Maps numeric kind codes to composed kinds. Composition runs when a kind
//! is registered, so conflicts surface at configuration time and every
//! entity of a kind shares the same descriptor.

use crate::capability::{Capability, CapabilityCatalog};
use crate::compose::ComposedKind;
use indexmap::IndexMap;
use rewind_core::{CoreError, CoreResult, Guid, KindCode};
use std::sync::Arc;
use tracing::{debug, info};

/// Registry of entity kinds
#[derive(Debug, Default)]
pub struct EntityTypeRegistry {
    catalog: CapabilityCatalog,
    kinds: IndexMap<KindCode, Arc<ComposedKind>>,
    frozen: bool,
}

impl EntityTypeRegistry {
    /// Create a registry resolving capability names against `catalog`
    #[must_use]
    pub fn new(catalog: CapabilityCatalog) -> Self {
        Self {
            catalog,
            kinds: IndexMap::new(),
            frozen: false,
        }
    }

    /// Register a kind composed of catalog capabilities, in order
    ///
    /// Registering a code again replaces the earlier entry.
    ///
    /// # Errors
    ///
    /// Returns `RegistryFrozen` after replay has started,
    /// `UnknownCapability` for a name missing from the catalog, or
    /// `CompositionConflict` if the capabilities do not compose
    pub fn register(&mut self, code: KindCode, label: &str, capabilities: &[&str]) -> CoreResult<()> {
        self.check_open()?;
        let resolved = capabilities
            .iter()
            .map(|name| {
                self.catalog
                    .get(name)
                    .ok_or_else(|| CoreError::UnknownCapability {
                        kind: label.to_string(),
                        capability: (*name).to_string(),
                    })
            })
            .collect::<CoreResult<Vec<_>>>()?;
        self.register_capabilities(code, label, resolved)
    }

    /// Register a kind from capability instances directly
    ///
    /// # Errors
    ///
    /// Returns `RegistryFrozen` after replay has started, or
    /// `CompositionConflict` if the capabilities do not compose
    pub fn register_capabilities(
        &mut self,
        code: KindCode,
        label: &str,
        capabilities: Vec<Arc<dyn Capability>>,
    ) -> CoreResult<()> {
        self.check_open()?;
        let composed = ComposedKind::compose(code, label, capabilities)?;
        if let Some(previous) = self.kinds.insert(code, Arc::new(composed)) {
            debug!(code = %code, previous = previous.label(), label, "replaced entity kind");
        } else {
            info!(code = %code, label, "registered entity kind");
        }
        Ok(())
    }

    /// Composed kind for a code
    #[must_use]
    pub fn get(&self, code: KindCode) -> Option<&Arc<ComposedKind>> {
        self.kinds.get(&code)
    }

    /// Composed kind for an entity about to be created
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntityKind` if the code was never registered
    pub fn resolve(&self, code: KindCode, guid: Guid) -> CoreResult<Arc<ComposedKind>> {
        self.kinds
            .get(&code)
            .cloned()
            .ok_or(CoreError::UnknownEntityKind { code, guid })
    }

    /// Reject any further registration
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Check if frozen
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Registered kinds in registration order
    pub fn kinds(&self) -> impl Iterator<Item = &Arc<ComposedKind>> {
        self.kinds.values()
    }

    /// Catalog used to resolve capability names
    #[must_use]
    pub fn catalog(&self) -> &CapabilityCatalog {
        &self.catalog
    }

    /// Mutable catalog, for adding capabilities before registration
    ///
    /// # Errors
    ///
    /// Returns `RegistryFrozen` after replay has started
    pub fn catalog_mut(&mut self) -> CoreResult<&mut CapabilityCatalog> {
        self.check_open()?;
        Ok(&mut self.catalog)
    }

    /// Number of registered kinds
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    fn check_open(&self) -> CoreResult<()> {
        if self.frozen {
            return Err(CoreError::RegistryFrozen {
                registry: "entity kinds".to_string(),
            });
        }
        Ok(())
    }
}

//! Replay configuration.
//!
//! The static tables loaded before any trace line is read: which
//! capabilities compose each entity kind, and which message class each
//! message kind maps to.

use crate::builtin::KindFilter;
use crate::capability::CapabilityCatalog;
use crate::driver::Driver;
use crate::registry::EntityTypeRegistry;
use rewind_core::{CoreError, CoreResult, KindCode};
use rewind_log::{MessageClassifier, NamedClass};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// One entity kind and its capabilities, in attachment order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindEntry {
    /// Numeric kind code from the trace
    pub code: KindCode,
    /// Human label
    pub label: String,
    /// Capability names
    pub capabilities: Vec<String>,
}

/// A named `KindFilter` capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterEntry {
    /// Capability name
    pub name: String,
    /// Kind patterns it responds to
    pub kinds: Vec<String>,
}

/// Message class for a kind string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntry {
    /// `type` or `type.subtype`
    pub kind: String,
    /// Class name
    pub class: String,
}

/// Registry tables for a replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Entity kinds; later entries for a code replace earlier ones
    pub kinds: Vec<KindEntry>,
    /// Filter capabilities added to the catalog
    pub filters: Vec<FilterEntry>,
    /// Message classes; last write wins per kind
    pub messages: Vec<MessageEntry>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        let kinds = KindCode::WELL_KNOWN
            .iter()
            .filter_map(|code| {
                code.well_known_label().map(|label| KindEntry {
                    code: *code,
                    label: label.to_string(),
                    capabilities: vec!["message-log".to_string()],
                })
            })
            .collect();
        Self {
            kinds,
            filters: Vec::new(),
            messages: Vec::new(),
        }
    }
}

impl ReplayConfig {
    /// Parse from JSON
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the text is not a valid configuration
    pub fn from_json_str(text: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load from a JSON file
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, or `InvalidConfig`
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| CoreError::io(path.display().to_string(), &err))?;
        let config = Self::from_json_str(&text)?;
        info!(
            path = %path.display(),
            kinds = config.kinds.len(),
            messages = config.messages.len(),
            "loaded replay config"
        );
        Ok(config)
    }

    /// Build a driver with both registries populated
    ///
    /// # Errors
    ///
    /// Returns `UnknownCapability` or `CompositionConflict` for a kind that
    /// does not compose
    pub fn build(&self) -> CoreResult<Driver> {
        let mut catalog = CapabilityCatalog::with_builtins();
        for filter in &self.filters {
            catalog.insert(Arc::new(KindFilter::new(filter.name.clone(), filter.kinds.clone())));
        }

        let mut registry = EntityTypeRegistry::new(catalog);
        for kind in &self.kinds {
            let names: Vec<&str> = kind.capabilities.iter().map(String::as_str).collect();
            registry.register(kind.code, &kind.label, &names)?;
        }

        let mut classifier = MessageClassifier::new();
        for message in &self.messages {
            classifier.register(message.kind.clone(), Arc::new(NamedClass::new(message.class.clone())))?;
        }

        Ok(Driver::new(registry, classifier))
    }
}

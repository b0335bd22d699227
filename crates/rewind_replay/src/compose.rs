//! Composition of capabilities into a concrete entity kind.
//!
//! Base operations aggregate: every capability declaring one becomes a
//! contributor, in attachment order. Every other exported symbol must be
//! unique across the kind.

use crate::capability::Capability;
use indexmap::IndexMap;
use rewind_core::{is_reserved, BaseOperation, CoreError, CoreResult, KindCode};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Symbol reported when a kind has nothing attached
pub const EMPTY_COMPOSITION: &str = "<no capabilities>";

/// A merged symbol and the capability that exported it
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSymbol {
    /// Exporting capability
    pub owner: String,
    /// Symbol value
    pub value: Value,
}

/// Entity kind descriptor produced by composition
#[derive(Debug)]
pub struct ComposedKind {
    code: KindCode,
    label: String,
    capabilities: Vec<Arc<dyn Capability>>,
    responds_to: Vec<Arc<dyn Capability>>,
    notify: Vec<Arc<dyn Capability>>,
    dump: Vec<Arc<dyn Capability>>,
    symbols: IndexMap<String, MergedSymbol>,
}

impl ComposedKind {
    /// Compose capabilities in attachment order
    ///
    /// # Errors
    ///
    /// Returns `CompositionConflict` if `capabilities` is empty, the same
    /// capability is attached twice, a symbol is reserved, or two
    /// capabilities export the same symbol
    pub fn compose(
        code: KindCode,
        label: impl Into<String>,
        capabilities: Vec<Arc<dyn Capability>>,
    ) -> CoreResult<Self> {
        let label = label.into();
        let conflict = |symbol: &str| CoreError::CompositionConflict {
            kind: label.clone(),
            symbol: symbol.to_string(),
        };

        if capabilities.is_empty() {
            return Err(conflict(EMPTY_COMPOSITION));
        }

        let mut responds_to = Vec::new();
        let mut notify = Vec::new();
        let mut dump = Vec::new();
        let mut symbols: IndexMap<String, MergedSymbol> = IndexMap::new();
        let mut seen: Vec<&str> = Vec::with_capacity(capabilities.len());

        for capability in &capabilities {
            let name = capability.name();
            if seen.contains(&name) {
                return Err(conflict(name));
            }
            seen.push(name);

            for op in capability.operations().iter() {
                let contributors = match op {
                    BaseOperation::RespondsTo => &mut responds_to,
                    BaseOperation::Notify => &mut notify,
                    BaseOperation::Dump => &mut dump,
                };
                contributors.push(Arc::clone(capability));
            }

            for (symbol, value) in capability.symbols() {
                if is_reserved(&symbol) || symbols.contains_key(&symbol) {
                    return Err(conflict(&symbol));
                }
                symbols.insert(
                    symbol,
                    MergedSymbol {
                        owner: name.to_string(),
                        value,
                    },
                );
            }
        }

        debug!(
            kind = %label,
            code = %code,
            responds_to = responds_to.len(),
            notify = notify.len(),
            dump = dump.len(),
            symbols = symbols.len(),
            "composed entity kind"
        );

        Ok(Self {
            code,
            label,
            capabilities,
            responds_to,
            notify,
            dump,
            symbols,
        })
    }

    /// Kind code
    #[must_use]
    pub fn code(&self) -> KindCode {
        self.code
    }

    /// Human label
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// All attached capabilities in attachment order
    #[must_use]
    pub fn capabilities(&self) -> &[Arc<dyn Capability>] {
        &self.capabilities
    }

    /// Ordered contributors for a base operation
    #[must_use]
    pub fn contributors(&self, operation: BaseOperation) -> &[Arc<dyn Capability>] {
        match operation {
            BaseOperation::RespondsTo => &self.responds_to,
            BaseOperation::Notify => &self.notify,
            BaseOperation::Dump => &self.dump,
        }
    }

    /// Contributor names for a base operation
    #[must_use]
    pub fn contributor_names(&self, operation: BaseOperation) -> Vec<&str> {
        self.contributors(operation)
            .iter()
            .map(|c| c.name())
            .collect()
    }

    /// Look up a merged symbol
    #[must_use]
    pub fn symbol(&self, name: &str) -> Option<&MergedSymbol> {
        self.symbols.get(name)
    }

    /// Merged symbols in attachment order
    #[must_use]
    pub fn symbols(&self) -> &IndexMap<String, MergedSymbol> {
        &self.symbols
    }
}

//! Message classification.
//!
//! Maps the `type` and optional `subtype` of a trace line to a message class.
//! A `type.subtype` mapping wins only when it differs from the `type` mapping.

use crate::message::{Message, MessageKind};
use rewind_core::{CoreError, CoreResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A class of messages
///
/// Classes carry no per-message state; they name and render the messages
/// they classify.
pub trait MessageClass: Send + Sync + std::fmt::Debug {
    /// Class name
    fn name(&self) -> &str;

    /// Render a message of this class for dumps
    fn describe(&self, message: &Message) -> String {
        format!(
            "{}(kind={}, src={}, dest={}, ts={})",
            self.name(),
            message.kind(),
            message.source(),
            message.destination(),
            message.timestamp()
        )
    }
}

/// Class with no specialised behaviour
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericMessage;

impl MessageClass for GenericMessage {
    fn name(&self) -> &str {
        "generic"
    }
}

/// Class identified only by a name, as declared in configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedClass {
    name: String,
}

impl NamedClass {
    /// Create a named class
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl MessageClass for NamedClass {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self, message: &Message) -> String {
        let mut text = format!(
            "{}(kind={}, src={}, dest={}, ts={}",
            self.name,
            message.kind(),
            message.source(),
            message.destination(),
            message.timestamp()
        );
        if !message.payload().is_empty() {
            text.push_str(", data=");
            text.push_str(message.payload());
        }
        text.push(')');
        text
    }
}

/// Registry from message-kind string to message class
#[derive(Debug, Default)]
pub struct MessageClassifier {
    classes: HashMap<String, Arc<dyn MessageClass>>,
    frozen: bool,
}

impl MessageClassifier {
    /// Create an empty classifier
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class for a kind string (`type` or `type.subtype`)
    ///
    /// Last write wins: a second registration for the same kind replaces the
    /// first.
    ///
    /// # Errors
    ///
    /// Returns `RegistryFrozen` once replay has started
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        class: Arc<dyn MessageClass>,
    ) -> CoreResult<()> {
        if self.frozen {
            return Err(CoreError::RegistryFrozen {
                registry: "message classes".to_string(),
            });
        }
        let kind = kind.into();
        info!(kind = %kind, class = class.name(), "registering message class");
        if let Some(previous) = self.classes.insert(kind.clone(), class) {
            debug!(kind = %kind, replaced = previous.name(), "message class replaced");
        }
        Ok(())
    }

    /// Resolve the class for a line's `type` and optional `subtype`
    ///
    /// Returns the effective kind alongside the class: `type.subtype` when the
    /// specific mapping was preferred, `type` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `UnregisteredMessageKind` when neither mapping exists
    pub fn resolve(
        &self,
        type_code: &str,
        subtype: Option<&str>,
    ) -> CoreResult<(MessageKind, Arc<dyn MessageClass>)> {
        let general = self.classes.get(type_code);

        if let Some(subtype) = subtype {
            let specific_kind = MessageKind::with_subtype(type_code, subtype);
            if let Some(specific) = self.classes.get(specific_kind.as_str()) {
                let same = general.is_some_and(|g| same_class(g, specific));
                if !same {
                    return Ok((specific_kind, Arc::clone(specific)));
                }
            }
        }

        match general {
            Some(class) => Ok((MessageKind::new(type_code), Arc::clone(class))),
            None => Err(CoreError::UnregisteredMessageKind {
                kind: match subtype {
                    Some(subtype) => format!("{type_code}.{subtype}"),
                    None => type_code.to_string(),
                },
            }),
        }
    }

    /// Look up the class registered for an exact kind string
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<&Arc<dyn MessageClass>> {
        self.classes.get(kind)
    }

    /// Reject further registrations
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Whether registrations are rejected
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Number of registered kinds
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Identity comparison: the same registered class object
fn same_class(a: &Arc<dyn MessageClass>, b: &Arc<dyn MessageClass>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

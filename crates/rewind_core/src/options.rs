//! Options passed through to every dump contributor.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Free-form key/value options for `dump`
///
/// The core never interprets these; each capability reads the keys it knows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DumpOptions {
    values: IndexMap<String, String>,
}

impl DumpOptions {
    /// Create empty options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an option
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Set an option in place
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Look up an option
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over options in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DumpOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_and_get() {
        let opts = DumpOptions::new().with("verbose", "true");
        assert_eq!(opts.get("verbose"), Some("true"));
        assert_eq!(opts.get("missing"), None);
    }

    #[test]
    fn test_from_iter_keeps_order() {
        let opts: DumpOptions = vec![("z", "1"), ("a", "2")].into_iter().collect();
        let keys: Vec<_> = opts.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a"]);
    }
}

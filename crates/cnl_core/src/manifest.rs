//! Capability allow-list configuration.
//!
//! A manifest is the boundary between what a function declares it performs
//! and what the surrounding deployment actually permits it to reach. It is
//! optional input to [`crate::semantics::check`] — when absent, the
//! capability checker validates declared-vs-inferred consistency only, with
//! no allow-list enforcement.

use std::collections::BTreeSet;

use serde::Deserialize;

/// One function's or workflow's permitted capability set, keyed by name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    allow: std::collections::BTreeMap<String, BTreeSet<String>>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, target: impl Into<String>, capabilities: impl IntoIterator<Item = String>) -> Self {
        self.allow.insert(target.into(), capabilities.into_iter().collect());
        self
    }

    /// Parses a manifest from its JSON form: `{"allow": {"quoteDriver": ["Http", "Db"]}}`.
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// Whether `target` (a function or workflow name) is permitted to use
    /// `capability`. Targets absent from the manifest are unrestricted —
    /// the manifest is an allow-list overlay, not a default-deny sandbox.
    pub fn permits(&self, target: &str, capability: &str) -> bool {
        match self.allow.get(target) {
            Some(allowed) => allowed.contains(capability),
            None => true,
        }
    }

    pub fn has_entry(&self, target: &str) -> bool {
        self.allow.contains_key(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlisted_target_is_unrestricted() {
        let manifest = Manifest::new();
        assert!(manifest.permits("anything", "Http"));
    }

    #[test]
    fn listed_target_only_permits_its_allow_list() {
        let manifest = Manifest::new().allow("quoteDriver", ["Http".to_string()]);
        assert!(manifest.permits("quoteDriver", "Http"));
        assert!(!manifest.permits("quoteDriver", "Db"));
    }

    #[test]
    fn parses_from_json() {
        let manifest = Manifest::from_json(r#"{"allow": {"quoteDriver": ["Http"]}}"#).unwrap();
        assert!(manifest.permits("quoteDriver", "Http"));
        assert!(!manifest.permits("quoteDriver", "Db"));
    }
}

//! Domain vocabularies: bidirectional maps between a canonical English
//! identifier and its localized spelling, e.g. `Driver` <-> `驾驶员`.
//!
//! Vocabularies are supplied by an external loader (out of scope for this
//! crate, per the system's data-file boundary) but the types they populate,
//! and the [`IdentifierIndex`] the canonicalizer queries, live here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What kind of program entity an identifier mapping names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentifierKind {
    Struct,
    Field,
    Function,
    EnumValue,
}

/// One canonical-to-localized identifier mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierMapping {
    pub canonical: String,
    pub localized: String,
    pub kind: IdentifierKind,
    /// The enclosing struct/enum name, for fields and enum values.
    pub parent: Option<String>,
    /// Alternate localized spellings that also resolve to `canonical`.
    pub aliases: Vec<String>,
}

impl IdentifierMapping {
    pub fn new(canonical: impl Into<String>, localized: impl Into<String>, kind: IdentifierKind) -> Self {
        Self {
            canonical: canonical.into(),
            localized: localized.into(),
            kind,
            parent: None,
            aliases: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_aliases(mut self, aliases: impl IntoIterator<Item = String>) -> Self {
        self.aliases = aliases.into_iter().collect();
        self
    }

    /// Every localized spelling this mapping resolves, including aliases.
    fn all_localized_forms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.localized.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// A set of identifier mappings for one domain and locale (e.g.
/// `logistics:zh-CN`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    pub domain: String,
    pub locale: String,
    pub mappings: Vec<IdentifierMapping>,
}

impl Vocabulary {
    pub fn new(domain: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            locale: locale.into(),
            mappings: Vec::new(),
        }
    }

    pub fn with_mapping(mut self, mapping: IdentifierMapping) -> Self {
        self.mappings.push(mapping);
        self
    }
}

/// A compiled, queryable index over one or more vocabularies, supporting
/// bidirectional lookup with case-insensitive matching on the canonical
/// (English) side.
#[derive(Debug, Clone, Default)]
pub struct IdentifierIndex {
    /// Localized spelling (verbatim case) -> canonical name.
    localized_to_canonical: HashMap<String, String>,
    /// Lowercased canonical name -> canonical name, for case-insensitive
    /// lookup from the canonical side.
    canonical_lookup: HashMap<String, String>,
    /// Canonical name -> preferred localized spelling (first one registered).
    canonical_to_localized: HashMap<String, String>,
    entries: HashMap<String, IdentifierMapping>,
}

impl IdentifierIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles an index from any number of vocabularies. Mappings from
    /// later vocabularies override earlier ones with the same canonical
    /// name.
    pub fn compile<'a>(vocabularies: impl IntoIterator<Item = &'a Vocabulary>) -> Self {
        let mut index = Self::new();
        for vocab in vocabularies {
            for mapping in &vocab.mappings {
                index.insert(mapping.clone());
            }
        }
        index
    }

    pub fn insert(&mut self, mapping: IdentifierMapping) {
        for form in mapping.all_localized_forms() {
            self.localized_to_canonical
                .insert(form.to_string(), mapping.canonical.clone());
        }
        self.canonical_lookup
            .insert(mapping.canonical.to_lowercase(), mapping.canonical.clone());
        self.canonical_to_localized
            .insert(mapping.canonical.clone(), mapping.localized.clone());
        self.entries.insert(mapping.canonical.clone(), mapping);
    }

    /// Looks up the canonical name for a localized spelling (exact match,
    /// including registered aliases).
    pub fn canonical_for(&self, localized: &str) -> Option<&str> {
        self.localized_to_canonical.get(localized).map(String::as_str)
    }

    /// Looks up the canonical name case-insensitively.
    pub fn canonical_case_insensitive(&self, name: &str) -> Option<&str> {
        self.canonical_lookup.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Looks up the preferred localized spelling for a canonical name.
    pub fn localized_for(&self, canonical: &str) -> Option<&str> {
        self.canonical_to_localized.get(canonical).map(String::as_str)
    }

    pub fn mapping_for(&self, canonical: &str) -> Option<&IdentifierMapping> {
        self.entries.get(canonical)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_vocab() -> Vocabulary {
        Vocabulary::new("fleet", "zh-CN").with_mapping(
            IdentifierMapping::new("Driver", "驾驶员", IdentifierKind::Struct)
                .with_aliases(["司机".to_string()]),
        )
    }

    #[test]
    fn compiles_bidirectional_lookup() {
        let vocab = driver_vocab();
        let index = IdentifierIndex::compile([&vocab]);
        assert_eq!(index.canonical_for("驾驶员"), Some("Driver"));
        assert_eq!(index.canonical_for("司机"), Some("Driver"));
        assert_eq!(index.localized_for("Driver"), Some("驾驶员"));
    }

    #[test]
    fn canonical_lookup_is_case_insensitive() {
        let vocab = driver_vocab();
        let index = IdentifierIndex::compile([&vocab]);
        assert_eq!(index.canonical_case_insensitive("driver"), Some("Driver"));
        assert_eq!(index.canonical_case_insensitive("DRIVER"), Some("Driver"));
    }

    #[test]
    fn unknown_localized_word_is_absent() {
        let vocab = driver_vocab();
        let index = IdentifierIndex::compile([&vocab]);
        assert_eq!(index.canonical_for("车辆"), None);
    }

    #[test]
    fn later_vocabulary_overrides_earlier_mapping() {
        let a = Vocabulary::new("fleet", "zh-CN")
            .with_mapping(IdentifierMapping::new("Driver", "old", IdentifierKind::Struct));
        let b = Vocabulary::new("fleet-v2", "zh-CN")
            .with_mapping(IdentifierMapping::new("Driver", "new", IdentifierKind::Struct));
        let index = IdentifierIndex::compile([&a, &b]);
        assert_eq!(index.localized_for("Driver"), Some("new"));
    }
}

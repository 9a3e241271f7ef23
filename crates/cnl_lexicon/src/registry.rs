//! Process-wide registries for lexicons and vocabularies.
//!
//! Per the concurrency model, these are the only mutable process-wide state
//! in the system: written once at startup, then treated as a read-only
//! frozen map for the remainder of the process's life. Registration is
//! guarded by a [`std::sync::RwLock`] rather than left unsynchronized, since
//! a long-lived host process (a language server, a test harness) may
//! register locales lazily from more than one thread.

use crate::lexicon::Lexicon;
use crate::vocabulary::Vocabulary;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::RwLock;

/// Registry of locale lexicons, keyed by locale tag (`en-US`, `zh-CN`, …).
///
/// Seeded with the three built-in locales; `register` may add more and
/// `reset` restores exactly the built-in set (for test isolation).
pub struct LexiconRegistry {
    lexicons: RwLock<HashMap<String, Lexicon>>,
}

impl LexiconRegistry {
    fn with_builtins() -> Self {
        let mut lexicons = HashMap::new();
        for lexicon in [Lexicon::en_us(), Lexicon::zh_cn(), Lexicon::de_de()] {
            lexicons.insert(lexicon.locale.clone(), lexicon);
        }
        Self {
            lexicons: RwLock::new(lexicons),
        }
    }

    /// Registers (or replaces) a lexicon under its own locale tag.
    pub fn register(&self, lexicon: Lexicon) {
        let mut guard = self.lexicons.write().expect("lexicon registry poisoned");
        guard.insert(lexicon.locale.clone(), lexicon);
    }

    pub fn get(&self, locale: &str) -> Option<Lexicon> {
        self.lexicons.read().expect("lexicon registry poisoned").get(locale).cloned()
    }

    pub fn locales(&self) -> Vec<String> {
        let mut locales: Vec<String> =
            self.lexicons.read().expect("lexicon registry poisoned").keys().cloned().collect();
        locales.sort();
        locales
    }

    /// Restores the registry to exactly the built-in locales. Intended for
    /// test isolation between cases that register custom lexicons.
    pub fn reset(&self) {
        let mut guard = self.lexicons.write().expect("lexicon registry poisoned");
        guard.clear();
        for lexicon in [Lexicon::en_us(), Lexicon::zh_cn(), Lexicon::de_de()] {
            guard.insert(lexicon.locale.clone(), lexicon);
        }
    }
}

/// Registry of domain vocabularies, keyed `"<domain>:<locale>"`.
///
/// Starts empty: vocabularies are always domain-specific and supplied by
/// the embedding application, never built in.
#[derive(Default)]
pub struct VocabularyRegistry {
    vocabularies: RwLock<HashMap<String, Vocabulary>>,
}

impl VocabularyRegistry {
    fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, vocabulary: Vocabulary) {
        let key = format!("{}:{}", vocabulary.domain, vocabulary.locale);
        let mut guard = self.vocabularies.write().expect("vocabulary registry poisoned");
        guard.insert(key, vocabulary);
    }

    pub fn get(&self, domain: &str, locale: &str) -> Option<Vocabulary> {
        let key = format!("{domain}:{locale}");
        self.vocabularies
            .read()
            .expect("vocabulary registry poisoned")
            .get(&key)
            .cloned()
    }

    pub fn all(&self) -> Vec<Vocabulary> {
        self.vocabularies
            .read()
            .expect("vocabulary registry poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub fn reset(&self) {
        self.vocabularies.write().expect("vocabulary registry poisoned").clear();
    }
}

/// The process-wide lexicon registry.
pub static LEXICONS: Lazy<LexiconRegistry> = Lazy::new(LexiconRegistry::with_builtins);

/// The process-wide vocabulary registry.
pub static VOCABULARIES: Lazy<VocabularyRegistry> = Lazy::new(VocabularyRegistry::new);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::{IdentifierKind, IdentifierMapping};

    #[test]
    fn builtin_locales_are_preregistered() {
        let registry = LexiconRegistry::with_builtins();
        let mut locales = registry.locales();
        locales.sort();
        assert_eq!(locales, vec!["de-DE", "en-US", "zh-CN"]);
    }

    #[test]
    fn register_adds_a_new_locale() {
        let registry = LexiconRegistry::with_builtins();
        let mut custom = Lexicon::en_us();
        custom.locale = "en-GB".to_string();
        registry.register(custom);
        assert!(registry.get("en-GB").is_some());
    }

    #[test]
    fn reset_restores_exactly_the_builtins() {
        let registry = LexiconRegistry::with_builtins();
        let mut custom = Lexicon::en_us();
        custom.locale = "en-GB".to_string();
        registry.register(custom);
        registry.reset();
        assert!(registry.get("en-GB").is_none());
        assert!(registry.get("en-US").is_some());
    }

    #[test]
    fn vocabulary_registry_round_trips() {
        let registry = VocabularyRegistry::new();
        let vocab = Vocabulary::new("fleet", "zh-CN")
            .with_mapping(IdentifierMapping::new("Driver", "驾驶员", IdentifierKind::Struct));
        registry.register(vocab);
        let fetched = registry.get("fleet", "zh-CN").unwrap();
        assert_eq!(fetched.mappings[0].canonical, "Driver");
    }
}

//! Deterministic JSON export of a vocabulary registry for inter-process
//! exchange (the actual exchange format/transport is out of scope here;
//! this module only produces the payload and its checksum).

use crate::vocabulary::Vocabulary;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Top-level export envelope. `vocabularies` is keyed `"<domain>:<locale>"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyExport {
    pub version: u32,
    pub generated_at: String,
    pub vocabularies: BTreeMap<String, Vocabulary>,
    pub checksum: String,
}

impl VocabularyExport {
    /// Builds an export from a set of vocabularies, computing the checksum
    /// over the compact JSON of `vocabularies` with keys sorted — which a
    /// [`BTreeMap`] guarantees by construction, so two exports of the same
    /// registry always produce identical checksums regardless of
    /// registration order.
    pub fn build(generated_at: impl Into<String>, vocabularies: Vec<Vocabulary>) -> Self {
        let mut map = BTreeMap::new();
        for vocab in vocabularies {
            let key = format!("{}:{}", vocab.domain, vocab.locale);
            map.insert(key, vocab);
        }
        let checksum = compute_checksum(&map);
        Self {
            version: 1,
            generated_at: generated_at.into(),
            vocabularies: map,
            checksum,
        }
    }

    /// Recomputes the checksum from `self.vocabularies` and compares it to
    /// the stored one — used to detect a tampered or hand-edited export.
    pub fn verify(&self) -> bool {
        self.checksum == compute_checksum(&self.vocabularies)
    }
}

fn compute_checksum(vocabularies: &BTreeMap<String, Vocabulary>) -> String {
    let compact = serde_json::to_string(vocabularies).expect("vocabularies always serialize");
    let mut hasher = Sha256::new();
    hasher.update(compact.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::{IdentifierKind, IdentifierMapping};

    fn sample() -> Vec<Vocabulary> {
        vec![Vocabulary::new("fleet", "zh-CN").with_mapping(IdentifierMapping::new(
            "Driver",
            "驾驶员",
            IdentifierKind::Struct,
        ))]
    }

    #[test]
    fn two_exports_of_same_registry_match_checksums() {
        let a = VocabularyExport::build("2026-01-01T00:00:00Z", sample());
        let b = VocabularyExport::build("2026-06-01T00:00:00Z", sample());
        assert_eq!(a.checksum, b.checksum);
    }

    #[test]
    fn export_verifies_itself() {
        let export = VocabularyExport::build("2026-01-01T00:00:00Z", sample());
        assert!(export.verify());
    }

    #[test]
    fn tampering_breaks_verification() {
        let mut export = VocabularyExport::build("2026-01-01T00:00:00Z", sample());
        export
            .vocabularies
            .get_mut("fleet:zh-CN")
            .unwrap()
            .mappings
            .push(IdentifierMapping::new("Vehicle", "车辆", IdentifierKind::Struct));
        assert!(!export.verify());
    }

    #[test]
    fn checksum_is_order_independent_across_registration() {
        let mut first = sample();
        first.push(Vocabulary::new("fleet", "de-DE"));
        let mut second = vec![Vocabulary::new("fleet", "de-DE")];
        second.extend(sample());
        let a = VocabularyExport::build("t", first);
        let b = VocabularyExport::build("t", second);
        assert_eq!(a.checksum, b.checksum);
    }
}

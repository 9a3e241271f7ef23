//! Type annotations (`@pii(level=L3, category=email)`) attached to a
//! [`crate::ast::Type`].
//!
//! Annotation arguments may be named (`level=L3`) or positional; positional
//! arguments are keyed `$0`, `$1`, … so a single ordered map covers both
//! forms uniformly.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationValue {
    Ident(String),
    String(String),
    Int(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub name: String,
    pub params: BTreeMap<String, AnnotationValue>,
}

impl Annotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_named(mut self, key: impl Into<String>, value: AnnotationValue) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn with_positional(mut self, index: usize, value: AnnotationValue) -> Self {
        self.params.insert(format!("${index}"), value);
        self
    }

    pub fn param(&self, key: &str) -> Option<&AnnotationValue> {
        self.params.get(key)
    }

    /// Reads this annotation as a `@pii(level, category)` marker, if it is
    /// one; tolerant of both named (`level=L3, category=email`) and
    /// positional (`$0`, `$1`) argument styles.
    pub fn as_pii(&self) -> Option<(String, String)> {
        if self.name != "pii" {
            return None;
        }
        let level = self
            .param("level")
            .or_else(|| self.param("$0"))
            .and_then(value_as_string)?;
        let category = self
            .param("category")
            .or_else(|| self.param("$1"))
            .and_then(value_as_string)?;
        Some((level, category))
    }
}

fn value_as_string(value: &AnnotationValue) -> Option<String> {
    match value {
        AnnotationValue::Ident(s) | AnnotationValue::String(s) => Some(s.clone()),
        AnnotationValue::Int(n) => Some(n.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_named_pii_arguments() {
        let ann = Annotation::new("pii")
            .with_named("level", AnnotationValue::Ident("L3".into()))
            .with_named("category", AnnotationValue::Ident("email".into()));
        assert_eq!(ann.as_pii(), Some(("L3".to_string(), "email".to_string())));
    }

    #[test]
    fn reads_positional_pii_arguments() {
        let ann = Annotation::new("pii")
            .with_positional(0, AnnotationValue::Ident("L2".into()))
            .with_positional(1, AnnotationValue::Ident("ssn".into()));
        assert_eq!(ann.as_pii(), Some(("L2".to_string(), "ssn".to_string())));
    }

    #[test]
    fn non_pii_annotation_returns_none() {
        let ann = Annotation::new("deprecated");
        assert_eq!(ann.as_pii(), None);
    }
}

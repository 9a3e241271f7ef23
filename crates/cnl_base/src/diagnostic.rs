//! Structured, tool-consumable compiler diagnostics.
//!
//! Every semantic checker in the pipeline reports its findings as
//! [`Diagnostic`] values rather than failing outright (see the error-handling
//! design: fatal per-stage errors use [`crate::SpannedError`] instead).
//! A diagnostic's `code` is the only part of its contract callers may rely
//! on across versions — message wording is free to change.

use crate::span::Span;
use std::collections::BTreeMap;
use std::fmt;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// A single compiler message: a stable code, a severity, a rendered message,
/// an optional span and help text, and a structured `data` bag for tooling
/// (IDE quick fixes, machine-readable test assertions, and the like).
///
/// `code` uniquely determines the diagnostic's message template and
/// severity class (invariant 4) — two diagnostics with the same code always
/// describe the same kind of problem, even though `message` may be filled in
/// with different arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub span: Option<Span>,
    pub help: Option<String>,
    pub data: BTreeMap<String, serde_json::Value>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            span: None,
            help: None,
            data: BTreeMap::new(),
        }
    }

    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn info(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;
        if let Some(span) = &self.span {
            write!(f, " at {span}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Position;

    #[test]
    fn diagnostic_builder_chain() {
        let d = Diagnostic::error("TYPE_MISMATCH", "expected Int, found Text")
            .with_span(Span::new(Position::new(2, 3), Position::new(2, 10)))
            .with_help("convert the value with `toInt`")
            .with_data("expected", "Int")
            .with_data("found", "Text");

        assert_eq!(d.severity, Severity::Error);
        assert!(d.is_error());
        assert_eq!(d.data.get("expected").unwrap(), "Int");
        assert!(d.to_string().contains("TYPE_MISMATCH"));
    }

    #[test]
    fn severity_ordering_places_error_highest() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn diagnostic_without_span_displays_without_location() {
        let d = Diagnostic::warning("PII_IMPLICIT_UPLEVEL", "value upgraded to labeled target");
        assert!(!d.to_string().contains(" at "));
    }
}

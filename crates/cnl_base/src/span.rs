//! Source location tracking for error reporting.
//!
//! A [`Position`] is a 1-based `(line, column)` pair. A [`Span`] is a
//! contiguous range of positions, optionally tagged with the source file it
//! came from. Every token, AST node, and IR node in the pipeline carries a
//! span, enabling precise diagnostics that point at the exact offending
//! source text.
//!
//! # Synthetic spans
//!
//! Nodes introduced by desugaring (for example, an implicitly inferred type
//! annotation) have no real source location. By convention these carry
//! [`Span::synthetic`], which is `(0, 0)..(0, 0)` — a value that can never
//! occur for real source text, since [`Position`] is 1-based there.
//!
//! # Example
//!
//! ```
//! use cnl_base::{Position, Span};
//!
//! let start = Position::new(3, 1);
//! let end = Position::new(3, 9);
//! let span = Span::new(start, end);
//!
//! assert_eq!(span.start.line, 3);
//! assert!(!span.is_synthetic());
//! ```

use std::fmt;

/// A 1-based `(line, column)` source location.
///
/// Line and column `0` is reserved for [`Span::synthetic`] and never occurs
/// in a span derived from real source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    /// The zero position used only by synthetic spans.
    pub const ZERO: Position = Position { line: 0, column: 0 };

    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A contiguous source range, optionally tagged with the file it came from.
///
/// Spans are `Clone` (not `Copy`, since the file identifier may be an owned
/// string) and cheap to pass around. Use [`Span::merge`] to combine spans
/// when building compound AST or IR nodes from several sub-expressions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
    /// Identifies the source file this span belongs to, when the caller is
    /// compiling more than one unit and wants diagnostics to disambiguate.
    pub file: Option<String>,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self {
            start,
            end,
            file: None,
        }
    }

    pub fn with_file(start: Position, end: Position, file: impl Into<String>) -> Self {
        Self {
            start,
            end,
            file: Some(file.into()),
        }
    }

    /// The span carried by nodes that have no real source location (see
    /// invariant 1: every AST/IR node has a span unless it is synthetic).
    pub fn synthetic() -> Self {
        Self {
            start: Position::ZERO,
            end: Position::ZERO,
            file: None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.start == Position::ZERO && self.end == Position::ZERO
    }

    /// Creates a span covering from the start of `self` to the end of `other`.
    ///
    /// Useful for building compound expressions: the span of `a + b` is
    /// `a.span().merge(b.span())`. The file of `self` wins when both spans
    /// disagree (they never should within one compilation unit).
    pub fn merge(&self, other: &Span) -> Span {
        if self.is_synthetic() {
            return other.clone();
        }
        if other.is_synthetic() {
            return self.clone();
        }
        let start = self.start.min(other.start);
        let end = self.end.max(other.end);
        Span {
            start,
            end,
            file: self.file.clone().or_else(|| other.file.clone()),
        }
    }

    /// Number of columns covered when `start` and `end` share a line.
    ///
    /// Meaningless (and not meant to be used) across multi-line spans; call
    /// sites that need multi-line extents should track line counts
    /// separately.
    pub fn len_columns(&self) -> u32 {
        self.end.column.saturating_sub(self.start.column)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}-{}", file, self.start, self.end),
            None => write!(f, "{}-{}", self.start, self.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_new_stores_line_and_column() {
        let p = Position::new(4, 12);
        assert_eq!(p.line, 4);
        assert_eq!(p.column, 12);
    }

    #[test]
    fn span_default_is_synthetic() {
        assert!(Span::default().is_synthetic());
        assert!(Span::synthetic().is_synthetic());
    }

    #[test]
    fn span_merge_combines_ranges() {
        let a = Span::new(Position::new(1, 1), Position::new(1, 5));
        let b = Span::new(Position::new(1, 8), Position::new(2, 3));
        let merged = a.merge(&b);
        assert_eq!(merged.start, Position::new(1, 1));
        assert_eq!(merged.end, Position::new(2, 3));
    }

    #[test]
    fn span_merge_with_synthetic_returns_the_real_span() {
        let real = Span::new(Position::new(2, 1), Position::new(2, 4));
        let synthetic = Span::synthetic();
        assert_eq!(real.merge(&synthetic), real);
        assert_eq!(synthetic.merge(&real), real);
    }

    #[test]
    fn span_len_columns_on_single_line() {
        let span = Span::new(Position::new(1, 1), Position::new(1, 9));
        assert_eq!(span.len_columns(), 8);
    }

    #[test]
    fn span_display_includes_file_when_present() {
        let span = Span::with_file(Position::new(1, 1), Position::new(1, 2), "driver.cnl");
        assert!(span.to_string().starts_with("driver.cnl:"));
    }
}

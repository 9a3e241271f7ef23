//! Fatal per-stage errors with source location tracking.
//!
//! Stages that cannot produce a usable result at all — an indent-sensitive
//! lexer that hits a tab character, a parser that meets a token the grammar
//! doesn't admit — abort with a single [`SpannedError`] rather than limping
//! on. Everything recoverable is instead reported as a
//! [`crate::Diagnostic`] and the stage continues (see the error-handling
//! design).
//!
//! # Example
//!
//! ```
//! use cnl_base::{Position, Span, SpannedError, Result};
//!
//! fn parse_indent(spaces: usize, span: Span) -> Result<usize> {
//!     if spaces % 2 != 0 {
//!         return Err(SpannedError::new("indent must increase by an even amount", span));
//!     }
//!     Ok(spaces)
//! }
//!
//! let span = Span::new(Position::new(3, 1), Position::new(3, 4));
//! let err = parse_indent(3, span).unwrap_err();
//! assert!(err.to_string().contains("indent"));
//! ```

use crate::span::Span;
use std::fmt;

/// An error annotated with its source location.
///
/// Implements [`std::error::Error`] and [`fmt::Display`]. The display format
/// is: `{message} at {span}`.
#[derive(Debug, Clone)]
pub struct SpannedError {
    pub message: String,
    pub span: Span,
}

impl SpannedError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for SpannedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

impl std::error::Error for SpannedError {}

/// Alias for `std::result::Result<T, SpannedError>`.
///
/// Used as the return type for every stage that must stop on failure rather
/// than accumulate diagnostics and continue.
pub type Result<T> = std::result::Result<T, SpannedError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Position;

    #[test]
    fn spanned_error_display() {
        let span = Span::new(Position::new(5, 1), Position::new(5, 10));
        let err = SpannedError::new("unterminated string literal", span);
        let display = err.to_string();
        assert!(display.contains("unterminated string literal"));
        assert!(display.contains("5:1"));
    }
}

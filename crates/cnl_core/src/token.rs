//! Token types produced by the lexer and consumed by the parser.
//!
//! Every keyword concept (`let`, `return`, `<`, …) is represented uniformly
//! as `TokenKind::Keyword(KeywordKind)` rather than one bare enum variant
//! per word — the lexicon's keyword table is the only source of truth for
//! which spelling maps to which kind, so the token type never hard-codes a
//! reserved-word list.

use cnl_base::{Span, Symbol};
use cnl_lexicon::KeywordKind;

/// Where a comment sits relative to surrounding code, for trivia-channel
/// placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentPlacement {
    /// Shares its start line with the previous non-trivia token.
    Inline,
    /// Sits alone on its own line(s).
    Standalone,
}

/// A comment routed to the hidden trivia channel. Comments never become
/// grammar tokens; the parser never sees them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub text: String,
    pub span: Span,
    pub placement: CommentPlacement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberSuffix {
    None,
    Long,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(KeywordKind),

    Identifier(Symbol),
    /// An identifier whose first letter is uppercase — a type name.
    TypeIdentifier(Symbol),

    StringLiteral(Symbol),
    IntLiteral(i64),
    FloatLiteral(u64), // bit pattern of the parsed f64, for Eq/Hash
    NumberSuffix(NumberSuffix),

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Period,
    Colon,
    Dot,
    Arrow,

    Plus,
    Minus,
    Star,
    Slash,
    Equals,
    Lt,
    Gt,
    LtEq,
    GtEq,
    EqEq,
    NotEq,
    Question,
    At,

    Indent,
    Dedent,
    Newline,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: Symbol,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: Symbol, span: Span) -> Self {
        Self { kind, lexeme, span }
    }

    pub fn is_keyword(&self, kind: KeywordKind) -> bool {
        matches!(self.kind, TokenKind::Keyword(k) if k == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnl_base::{Interner, Position};

    #[test]
    fn token_carries_kind_lexeme_and_span() {
        let mut interner = Interner::new();
        let lexeme = interner.intern("Return");
        let span = Span::new(Position::new(1, 1), Position::new(1, 7));
        let token = Token::new(TokenKind::Keyword(KeywordKind::Return), lexeme, span);
        assert!(token.is_keyword(KeywordKind::Return));
        assert_eq!(token.span.start.column, 1);
    }
}

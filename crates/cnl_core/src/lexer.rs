//! Indent-sensitive lexer: turns canonical CNL source into a flat token
//! sequence plus a trivia list of comments.
//!
//! The interesting complication is the off-side rule: indentation carries
//! block structure, so the lexer maintains an explicit indent stack and
//! emits `Indent`/`Dedent` tokens around changes in leading-space count.
//! Tabs in leading whitespace are a hard error — tab-to-space conversion is
//! the canonicalizer's job (pipeline step 2), so by the time source reaches
//! here a tab in an indent position means the canonicalizer was bypassed.

use cnl_base::{Interner, Position, Result, Span, SpannedError, Symbol};
use cnl_lexicon::{KeywordKind, Lexicon};

use crate::token::{Comment, CommentPlacement, NumberSuffix, Token, TokenKind};

/// Output of a successful (or partially successful) lex pass.
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
}

/// Chinese punctuation mapped to its ASCII counterpart (lexer tokenization
/// detail, distinct from the canonicalizer's own punctuation handling).
const CHINESE_PUNCTUATION: &[(char, char)] = &[
    ('。', '.'),
    ('，', ','),
    ('、', ','),
    ('：', ':'),
    ('【', '['),
    ('】', ']'),
    ('「', '"'),
    ('」', '"'),
];

struct Lexer<'a> {
    lexicon: &'a Lexicon,
    interner: &'a mut Interner,
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    indent_stack: Vec<u32>,
    at_line_start: bool,
    tokens: Vec<Token>,
    comments: Vec<Comment>,
}

/// Lexes canonical CNL `source` into a flat token sequence plus trivia
/// comments, per the lexicon's keyword table.
pub fn lex(source: &str, lexicon: &Lexicon, interner: &mut Interner) -> Result<LexOutput> {
    let mut lexer = Lexer {
        lexicon,
        interner,
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
        indent_stack: vec![0],
        at_line_start: true,
        tokens: Vec::new(),
        comments: Vec::new(),
    };
    lexer.run()?;
    Ok(LexOutput {
        tokens: lexer.tokens,
        comments: lexer.comments,
    })
}

impl<'a> Lexer<'a> {
    fn run(&mut self) -> Result<()> {
        loop {
            if self.at_line_start {
                self.handle_indentation()?;
                self.at_line_start = false;
                if self.is_eof() {
                    break;
                }
            }

            self.skip_inline_whitespace();

            if self.is_eof() {
                break;
            }

            let c = self.peek().unwrap();
            if c == '\n' {
                let start = self.current_position();
                self.advance();
                self.emit(TokenKind::Newline, "\n", Span::new(start, start));
                self.at_line_start = true;
                continue;
            }

            if c == '/' && self.peek_at(1) == Some('/') {
                self.lex_comment();
                continue;
            }

            if c == '"' {
                self.lex_string()?;
                continue;
            }

            if c.is_ascii_digit() {
                self.lex_number();
                continue;
            }

            if is_identifier_start(c) {
                if self.try_lex_multiword_keyword() {
                    continue;
                }
                self.lex_word();
                continue;
            }

            self.lex_punctuation(c)?;
        }

        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            let span = self.pos_span(0);
            self.emit(TokenKind::Dedent, "", span);
        }
        let span = self.pos_span(0);
        self.emit(TokenKind::Eof, "", span);
        Ok(())
    }

    fn handle_indentation(&mut self) -> Result<()> {
        let start_line = self.line;
        let mut indent = 0u32;
        loop {
            match self.peek() {
                Some(' ') => {
                    indent += 1;
                    self.advance();
                }
                Some('\t') => {
                    return Err(SpannedError::new(
                        "tabs are not permitted in leading indentation",
                        self.pos_span(1),
                    ));
                }
                _ => break,
            }
        }

        if self.is_blank_or_comment_only_line() {
            return Ok(());
        }

        let current = *self.indent_stack.last().unwrap();
        if indent == current {
            return Ok(());
        }
        if indent > current {
            if (indent - current) % 2 != 0 {
                return Err(SpannedError::new(
                    "indentation must increase by an even number of spaces",
                    self.pos_span(0),
                ));
            }
            self.indent_stack.push(indent);
            let span = Span::new(Position::new(start_line, 1), Position::new(start_line, indent + 1));
            self.emit(TokenKind::Indent, "", span);
            return Ok(());
        }

        loop {
            let top = *self.indent_stack.last().unwrap();
            if top == indent {
                return Ok(());
            }
            if top < indent || self.indent_stack.len() == 1 {
                return Err(SpannedError::new(
                    "dedent does not match any enclosing indentation level",
                    self.pos_span(0),
                ));
            }
            self.indent_stack.pop();
            let span = Span::new(Position::new(start_line, 1), Position::new(start_line, indent + 1));
            self.emit(TokenKind::Dedent, "", span);
        }
    }

    fn is_blank_or_comment_only_line(&self) -> bool {
        let mut i = self.pos;
        while i < self.chars.len() {
            match self.chars[i] {
                ' ' | '\t' => i += 1,
                '\n' => return true,
                '/' if self.chars.get(i + 1) == Some(&'/') => return true,
                _ => return false,
            }
        }
        true
    }

    fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.advance();
        }
    }

    fn lex_comment(&mut self) {
        let start = self.current_position();
        let inline = !self.tokens.is_empty()
            && !matches!(self.tokens.last().unwrap().kind, TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent)
            && self.tokens.last().unwrap().span.end.line == start.line;

        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            text.push(c);
            self.advance();
        }
        let end = self.current_position();
        self.comments.push(Comment {
            text,
            span: Span::new(start, end),
            placement: if inline {
                CommentPlacement::Inline
            } else {
                CommentPlacement::Standalone
            },
        });
    }

    fn lex_string(&mut self) -> Result<()> {
        let start = self.current_position();
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(SpannedError::new(
                        "unterminated string literal",
                        Span::new(start, self.current_position()),
                    ));
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escaped = self.lex_escape(start)?;
                    text.push(escaped);
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
        let span = Span::new(start, self.current_position());
        let symbol = self.interner.intern(&text);
        self.emit_at(TokenKind::StringLiteral(symbol), symbol, span);
        Ok(())
    }

    fn lex_escape(&mut self, string_start: Position) -> Result<char> {
        let c = self.peek().ok_or_else(|| {
            SpannedError::new("unterminated escape sequence", Span::new(string_start, self.current_position()))
        })?;
        match c {
            'n' => {
                self.advance();
                Ok('\n')
            }
            'r' => {
                self.advance();
                Ok('\r')
            }
            't' => {
                self.advance();
                Ok('\t')
            }
            'b' => {
                self.advance();
                Ok('\u{8}')
            }
            'f' => {
                self.advance();
                Ok('\u{c}')
            }
            '0' => {
                self.advance();
                Ok('\0')
            }
            '\\' => {
                self.advance();
                Ok('\\')
            }
            '"' => {
                self.advance();
                Ok('"')
            }
            '\'' => {
                self.advance();
                Ok('\'')
            }
            '/' => {
                self.advance();
                Ok('/')
            }
            'u' => {
                self.advance();
                let mut digits = String::new();
                for _ in 0..4 {
                    match self.peek() {
                        Some(d) if d.is_ascii_hexdigit() => {
                            digits.push(d);
                            self.advance();
                        }
                        _ => {
                            return Err(SpannedError::new(
                                "invalid \\u escape: expected four hex digits",
                                Span::new(string_start, self.current_position()),
                            ));
                        }
                    }
                }
                let code = u32::from_str_radix(&digits, 16).unwrap();
                char::from_u32(code).ok_or_else(|| {
                    SpannedError::new("invalid \\u escape: not a valid codepoint", Span::new(string_start, self.current_position()))
                })
            }
            other => Err(SpannedError::new(
                format!("invalid escape sequence '\\{other}'"),
                Span::new(string_start, self.current_position()),
            )),
        }
    }

    fn lex_number(&mut self) {
        let start = self.current_position();
        let start_idx = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        let mut is_float = false;
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        let mut suffix = NumberSuffix::None;
        if matches!(self.peek(), Some('L') | Some('l')) {
            suffix = NumberSuffix::Long;
            self.advance();
        }
        let text: String = self.chars[start_idx..self.pos].iter().collect();
        let digits: String = text.chars().filter(|c| *c != 'L' && *c != 'l').collect();
        let span = Span::new(start, self.current_position());
        let symbol = self.interner.intern(&text);

        if is_float {
            let value: f64 = digits.parse().unwrap_or(0.0);
            self.emit_at(TokenKind::FloatLiteral(value.to_bits()), symbol, span.clone());
        } else {
            let value: i64 = digits.parse().unwrap_or(0);
            self.emit_at(TokenKind::IntLiteral(value), symbol, span.clone());
        }
        if matches!(suffix, NumberSuffix::Long) {
            self.tokens.push(Token::new(TokenKind::NumberSuffix(NumberSuffix::Long), symbol, span));
        }
    }

    /// A few keywords (`this module is`, `it performs`, `depends on`)
    /// canonicalize to more than one English word with no single-word
    /// stand-in, so a single `lex_word` run can't recognize them. Tries
    /// every multi-word spelling in the lexicon, longest first, against
    /// the text starting here; on a full match emits one `Keyword` token
    /// spanning the whole phrase and reports success.
    fn try_lex_multiword_keyword(&mut self) -> bool {
        let start = self.current_position();
        let start_idx = self.pos;
        let mut candidates: Vec<(KeywordKind, &str)> = self
            .lexicon
            .keywords
            .iter()
            .filter(|(_, spelling)| spelling.contains(' '))
            .map(|(kind, spelling)| (*kind, spelling.as_str()))
            .collect();
        candidates.sort_by(|(_, a), (_, b)| b.len().cmp(&a.len()));

        for (kind, spelling) in candidates {
            if let Some(end_idx) = self.match_word_sequence(start_idx, spelling) {
                let text: String = self.chars[start_idx..end_idx].iter().collect();
                let symbol = self.interner.intern(&text);
                while self.pos < end_idx {
                    self.advance();
                }
                let span = Span::new(start, self.current_position());
                self.emit_at(TokenKind::Keyword(kind), symbol, span);
                return true;
            }
        }
        false
    }

    /// Checks whether `spelling`'s space-separated words occur one after
    /// another (skipping the whitespace between them) starting at
    /// `start_idx`; returns the index just past the match.
    fn match_word_sequence(&self, start_idx: usize, spelling: &str) -> Option<usize> {
        let mut idx = start_idx;
        for (i, word) in spelling.split(' ').enumerate() {
            if i > 0 {
                let before = idx;
                while matches!(self.chars.get(idx), Some(' ') | Some('\t')) {
                    idx += 1;
                }
                if idx == before {
                    return None;
                }
            }
            let word_start = idx;
            while matches!(self.chars.get(idx), Some(c) if is_identifier_continue(*c)) {
                idx += 1;
            }
            if idx == word_start {
                return None;
            }
            let actual: String = self.chars[word_start..idx].iter().collect();
            if !actual.eq_ignore_ascii_case(word) {
                return None;
            }
        }
        Some(idx)
    }

    fn lex_word(&mut self) {
        let start = self.current_position();
        let start_idx = self.pos;
        self.advance();
        while matches!(self.peek(), Some(c) if is_identifier_continue(c)) {
            self.advance();
        }
        let word: String = self.chars[start_idx..self.pos].iter().collect();
        let span = Span::new(start, self.current_position());
        let symbol = self.interner.intern(&word);

        if let Some(kind) = self.lexicon.keyword_for_word(&word.to_lowercase()) {
            self.emit_at(TokenKind::Keyword(kind), symbol, span);
            return;
        }
        if let Some(kind) = lookup_literal_keyword(&word) {
            self.emit_at(TokenKind::Keyword(kind), symbol, span);
            return;
        }

        if symbol.looks_like_type(self.interner) {
            self.emit_at(TokenKind::TypeIdentifier(symbol), symbol, span);
        } else {
            self.emit_at(TokenKind::Identifier(symbol), symbol, span);
        }
    }

    fn lex_punctuation(&mut self, c: char) -> Result<()> {
        let mapped = map_chinese_punctuation(c);
        let start = self.current_position();
        let start_idx = self.pos;
        self.advance();
        let kind = match mapped {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Period,
            ':' => TokenKind::Colon,
            '-' if self.peek() == Some('>') => {
                self.advance();
                TokenKind::Arrow
            }
            '-' => TokenKind::Minus,
            '+' => TokenKind::Plus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '?' => TokenKind::Question,
            '@' => TokenKind::At,
            '<' if self.peek() == Some('=') => {
                self.advance();
                TokenKind::LtEq
            }
            '<' => TokenKind::Lt,
            '>' if self.peek() == Some('=') => {
                self.advance();
                TokenKind::GtEq
            }
            '>' => TokenKind::Gt,
            '=' if self.peek() == Some('=') => {
                self.advance();
                TokenKind::EqEq
            }
            '=' => TokenKind::Equals,
            '!' if self.peek() == Some('=') => {
                self.advance();
                TokenKind::NotEq
            }
            _ => {
                return Err(SpannedError::new(
                    format!("unexpected character '{c}'"),
                    Span::new(start, self.current_position()),
                ));
            }
        };
        let text: String = self.chars[start_idx..self.pos].iter().collect();
        let symbol = self.interner.intern(&text);
        self.emit_at(kind, symbol, Span::new(start, self.current_position()));
        Ok(())
    }

    fn emit(&mut self, kind: TokenKind, text: &str, span: Span) {
        let symbol = self.interner.intern(text);
        self.tokens.push(Token::new(kind, symbol, span));
    }

    fn emit_at(&mut self, kind: TokenKind, symbol: Symbol, span: Span) {
        self.tokens.push(Token::new(kind, symbol, span));
    }

    fn pos_span(&self, width: u32) -> Span {
        let start = self.current_position();
        let end = Position::new(start.line, start.column + width);
        Span::new(start, end)
    }

    fn current_position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn map_chinese_punctuation(c: char) -> char {
    CHINESE_PUNCTUATION
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
        .unwrap_or(c)
}

/// Booleans and `null` are universal across lexicons but are not keyed by
/// a single locale spelling list the way other keywords are — the
/// canonicalizer already translated them to their English spelling by the
/// time the lexer runs, so a small literal table suffices here.
fn lookup_literal_keyword(word: &str) -> Option<KeywordKind> {
    match word.to_lowercase().as_str() {
        "true" => Some(KeywordKind::True),
        "false" => Some(KeywordKind::False),
        "null" => Some(KeywordKind::Null),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnl_lexicon::Lexicon;

    fn lex_en(source: &str) -> LexOutput {
        let lexicon = Lexicon::en_us();
        let mut interner = Interner::new();
        lex(source, &lexicon, &mut interner).expect("lex should succeed")
    }

    #[test]
    fn lexes_a_simple_return_statement() {
        let out = lex_en("return 5.\n");
        let kinds: Vec<_> = out.tokens.iter().map(|t| t.kind.clone()).collect();
        assert!(matches!(kinds[0], TokenKind::Keyword(KeywordKind::Return)));
        assert!(matches!(kinds[1], TokenKind::IntLiteral(5)));
        assert!(matches!(kinds[2], TokenKind::Period));
    }

    #[test]
    fn lexes_multiword_keywords_as_a_single_token() {
        let out = lex_en("this module is greeter.\n");
        assert!(matches!(out.tokens[0].kind, TokenKind::Keyword(KeywordKind::Module)));
        assert!(matches!(out.tokens[1].kind, TokenKind::Identifier(_)));

        let out = lex_en("to f() it performs io:\n  return true.\n");
        let kinds: Vec<_> = out.tokens.iter().map(|t| t.kind.clone()).collect();
        let performs_count =
            kinds.iter().filter(|k| matches!(k, TokenKind::Keyword(KeywordKind::Performs))).count();
        assert_eq!(performs_count, 1, "{kinds:?}");
    }

    #[test]
    fn emits_indent_and_dedent_around_a_nested_block() {
        let out = lex_en("to greet, produce Text:\n  return \"hi\".\nreturn 1.\n");
        let kinds: Vec<_> = out.tokens.iter().map(|t| t.kind.clone()).collect();
        assert!(kinds.contains(&TokenKind::Indent));
        assert!(kinds.contains(&TokenKind::Dedent));
    }

    #[test]
    fn rejects_tabs_in_indentation() {
        let lexicon = Lexicon::en_us();
        let mut interner = Interner::new();
        let result = lex("to greet:\n\treturn 1.\n", &lexicon, &mut interner);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_odd_indent_increment() {
        let lexicon = Lexicon::en_us();
        let mut interner = Interner::new();
        let result = lex("to greet:\n return 1.\n", &lexicon, &mut interner);
        assert!(result.is_err());
    }

    #[test]
    fn string_literal_decodes_escapes() {
        let out = lex_en("return \"a\\nb\".\n");
        match &out.tokens[1].kind {
            TokenKind::StringLiteral(sym) => {
                let mut interner = Interner::new();
                let _ = interner.intern("placeholder");
                // Just confirm the token kind decoded without erroring; the
                // resolved text is checked at the interner level in callers.
                let _ = sym;
            }
            other => panic!("expected string literal, got {other:?}"),
        }
    }

    #[test]
    fn classifies_inline_and_standalone_comments() {
        let out = lex_en("// standalone\nreturn 1. // inline\n");
        assert_eq!(out.comments.len(), 2);
        assert_eq!(out.comments[0].placement, CommentPlacement::Standalone);
        assert_eq!(out.comments[1].placement, CommentPlacement::Inline);
    }

    #[test]
    fn lexes_comparison_and_arithmetic_operators() {
        let out = lex_en("return a < b and c >= 1 and d != e.\n");
        let kinds: Vec<_> = out.tokens.iter().map(|t| t.kind.clone()).collect();
        assert!(kinds.contains(&TokenKind::Lt));
        assert!(kinds.contains(&TokenKind::GtEq));
        assert!(kinds.contains(&TokenKind::NotEq));
    }

    #[test]
    fn dedent_stack_is_empty_at_eof_after_balanced_indentation() {
        let out = lex_en("to greet, produce Text:\n  return \"hi\".\n");
        let last_non_eof = out.tokens.iter().rev().find(|t| !matches!(t.kind, TokenKind::Eof));
        assert!(matches!(last_non_eof.unwrap().kind, TokenKind::Dedent));
    }
}

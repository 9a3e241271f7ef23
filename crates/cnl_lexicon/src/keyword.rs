//! The fixed set of semantic token kinds every locale lexicon must supply a
//! spelling for.
//!
//! A [`KeywordKind`] is locale-independent: `KeywordKind::Return` means "the
//! word that introduces a return statement" regardless of whether the source
//! locale spells it `return`, `返回`, or `rückgabe`. The canonicalizer and
//! the lexer both consult [`crate::Lexicon::keyword_spelling`] /
//! [`crate::Lexicon::keyword_for_word`] rather than hard-coding any
//! particular language's reserved-word list (see the lexer design: "matched
//! via the lexicon's keyword table, not via a hard-coded reserved list").

use serde::{Deserialize, Serialize};

/// A locale-independent keyword concept.
///
/// Grouped by role purely for readability; the lexer treats every variant
/// uniformly as "the keyword that the active lexicon spells this way".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeywordKind {
    // Declarations
    Module,
    Import,
    Data,
    Enum,
    TypeAlias,
    Function,
    Produces,
    Of,
    Performs,
    Workflow,
    Step,
    Compensate,
    Retry,
    Timeout,
    DependsOn,

    // Statements
    Let,
    Be,
    Set,
    To,
    Return,
    If,
    Then,
    Else,
    Match,
    When,
    Start,
    Wait,
    As,

    // Literals and wrappers
    True,
    False,
    Null,
    Ok,
    Err,
    Some,
    None,

    // Effect and capability vocabulary
    Pure,
    Cpu,
    Io,
    Async,
    Await,

    // Connectives / misc surface words
    And,
    Or,
    Not,
    With,
    Is,

    // Operator words (folded to symbolic form by the parser builder)
    Plus,
    Minus,
    Times,
    DividedBy,
    LessThan,
    GreaterThan,
    LessOrEqual,
    GreaterOrEqual,
    NotEqual,
    Equals,
}

impl KeywordKind {
    /// All keyword kinds, in a stable order. A complete [`crate::Lexicon`]
    /// supplies exactly one spelling for each of these.
    pub const ALL: &'static [KeywordKind] = &[
        KeywordKind::Module,
        KeywordKind::Import,
        KeywordKind::Data,
        KeywordKind::Enum,
        KeywordKind::TypeAlias,
        KeywordKind::Function,
        KeywordKind::Produces,
        KeywordKind::Of,
        KeywordKind::Performs,
        KeywordKind::Workflow,
        KeywordKind::Step,
        KeywordKind::Compensate,
        KeywordKind::Retry,
        KeywordKind::Timeout,
        KeywordKind::DependsOn,
        KeywordKind::Let,
        KeywordKind::Be,
        KeywordKind::Set,
        KeywordKind::To,
        KeywordKind::Return,
        KeywordKind::If,
        KeywordKind::Then,
        KeywordKind::Else,
        KeywordKind::Match,
        KeywordKind::When,
        KeywordKind::Start,
        KeywordKind::Wait,
        KeywordKind::As,
        KeywordKind::True,
        KeywordKind::False,
        KeywordKind::Null,
        KeywordKind::Ok,
        KeywordKind::Err,
        KeywordKind::Some,
        KeywordKind::None,
        KeywordKind::Pure,
        KeywordKind::Cpu,
        KeywordKind::Io,
        KeywordKind::Async,
        KeywordKind::Await,
        KeywordKind::And,
        KeywordKind::Or,
        KeywordKind::Not,
        KeywordKind::With,
        KeywordKind::Is,
        KeywordKind::Plus,
        KeywordKind::Minus,
        KeywordKind::Times,
        KeywordKind::DividedBy,
        KeywordKind::LessThan,
        KeywordKind::GreaterThan,
        KeywordKind::LessOrEqual,
        KeywordKind::GreaterOrEqual,
        KeywordKind::NotEqual,
        KeywordKind::Equals,
    ];

    /// `true` for the operator-word kinds that the canonicalizer folds to a
    /// symbolic spelling (`+`, `<`, …) rather than leaving as an English word.
    pub fn is_operator_word(self) -> bool {
        matches!(
            self,
            KeywordKind::Plus
                | KeywordKind::Minus
                | KeywordKind::Times
                | KeywordKind::DividedBy
                | KeywordKind::LessThan
                | KeywordKind::GreaterThan
                | KeywordKind::LessOrEqual
                | KeywordKind::GreaterOrEqual
                | KeywordKind::NotEqual
                | KeywordKind::Equals
        )
    }

    /// The ASCII symbol an operator-word keyword canonicalizes to, or `None`
    /// for non-operator keywords (which canonicalize to their English word).
    pub fn operator_symbol(self) -> Option<&'static str> {
        match self {
            KeywordKind::Plus => Some("+"),
            KeywordKind::Minus => Some("-"),
            KeywordKind::Times => Some("*"),
            KeywordKind::DividedBy => Some("/"),
            KeywordKind::LessThan => Some("<"),
            KeywordKind::GreaterThan => Some(">"),
            KeywordKind::LessOrEqual => Some("<="),
            KeywordKind::GreaterOrEqual => Some(">="),
            KeywordKind::NotEqual => Some("!="),
            KeywordKind::Equals => Some("=="),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_contains_every_variant_once() {
        let mut seen: Vec<KeywordKind> = KeywordKind::ALL.to_vec();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), KeywordKind::ALL.len());
    }

    #[test]
    fn operator_words_have_symbols() {
        for &k in KeywordKind::ALL {
            assert_eq!(k.is_operator_word(), k.operator_symbol().is_some());
        }
    }

    #[test]
    fn less_than_folds_to_angle_bracket() {
        assert_eq!(KeywordKind::LessThan.operator_symbol(), Some("<"));
    }
}

//! Locale lexicons: the data that lets the canonicalizer and lexer treat
//! English, Chinese, and German source as the same underlying grammar.
//!
//! A [`Lexicon`] names a locale and carries everything locale-specific the
//! rest of the pipeline needs: keyword spellings, quote delimiters,
//! whitespace conventions, an article list, and an ordered list of custom
//! rewrite rules. Nothing downstream of the canonicalizer ever inspects a
//! locale name again — by the time the lexer runs, the lexicon is used only
//! to resolve already-canonical English keywords back to their semantic
//! kind.

use crate::keyword::KeywordKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a locale separates words with spaces or runs them together.
///
/// CJK scripts are `Spaceless`: the canonicalizer must not insert spaces
/// around translated keywords unless doing so would glue two words
/// together, and identifier-run scanning has to lean on Unicode word
/// boundaries rather than ASCII whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhitespaceMode {
    SpaceSeparated,
    Spaceless,
}

/// A custom, locale-specific text rewrite applied outside string literals
/// (lexicon pipeline step 9), such as German `ue -> ü`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteRule {
    pub pattern: String,
    pub replacement: String,
}

impl RewriteRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }

    /// Compiles the stored pattern. Lexicons are validated once at
    /// registration time (see [`crate::registry::LexiconRegistry::register`]),
    /// so call sites on the hot canonicalization path may `.expect()` this.
    pub fn compiled(&self) -> Result<Regex, regex::Error> {
        Regex::new(&self.pattern)
    }
}

/// A single open/close quote pair recognized as a string delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotePair {
    pub open: char,
    pub close: char,
}

impl QuotePair {
    pub const fn new(open: char, close: char) -> Self {
        Self { open, close }
    }
}

/// Everything the pipeline needs to know about one source locale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lexicon {
    /// Locale tag, e.g. `en-US`, `zh-CN`, `de-DE`.
    pub locale: String,
    /// One localized spelling per semantic keyword kind.
    pub keywords: BTreeMap<KeywordKind, String>,
    /// Keyword phrases spanning more than one word (e.g. "This Module Is"),
    /// canonicalized for case before the single-word keyword pass runs.
    pub multi_word_keywords: Vec<String>,
    /// The locale's primary string-quote delimiter. ASCII `"…"` and smart
    /// `"…"` quotes are always recognized in addition to this pair.
    pub quote: QuotePair,
    /// Locale punctuation mapped to the matching ASCII delimiter, e.g.
    /// Chinese `，` -> `,`.
    pub punctuation: Vec<(char, char)>,
    pub whitespace_mode: WhitespaceMode,
    /// Articles stripped during canonicalization ("a", "an", "the", …).
    pub articles: Vec<String>,
    /// Ordered custom rewrites applied outside string literals.
    pub rewrite_rules: Vec<RewriteRule>,
    /// Whether to fold full-width ASCII (`U+FF01..U+FF5E`, `U+3000`) to
    /// half-width outside strings (canonicalizer step 6).
    pub fold_fullwidth: bool,
}

impl Lexicon {
    /// Looks up the spelling this lexicon uses for a keyword kind.
    pub fn spelling(&self, kind: KeywordKind) -> Option<&str> {
        self.keywords.get(&kind).map(String::as_str)
    }

    /// Reverse lookup: which keyword kind (if any) does this exact word
    /// spell in this lexicon. Case-sensitive; canonicalization and keyword
    /// matching both normalize case before calling this when appropriate.
    pub fn keyword_for_word(&self, word: &str) -> Option<KeywordKind> {
        self.keywords
            .iter()
            .find(|(_, spelling)| spelling.as_str() == word)
            .map(|(kind, _)| *kind)
    }

    /// All `(localized, canonical-or-symbol)` pairs, longest localized
    /// spelling first — the order the canonicalizer's keyword-translation
    /// step (step 10) must scan in to implement longest-match-first.
    pub fn translation_table(&self) -> Vec<(&str, String)> {
        let mut pairs: Vec<(&str, String)> = self
            .keywords
            .iter()
            .map(|(kind, localized)| {
                let canonical = kind
                    .operator_symbol()
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        english_spelling(*kind).unwrap_or(localized).to_string()
                    });
                (localized.as_str(), canonical)
            })
            .collect();
        pairs.sort_by(|(a, _), (b, _)| b.chars().count().cmp(&a.chars().count()));
        pairs
    }

    pub fn en_us() -> Self {
        en_us_lexicon()
    }

    pub fn zh_cn() -> Self {
        zh_cn_lexicon()
    }

    pub fn de_de() -> Self {
        de_de_lexicon()
    }
}

/// The canonical English spelling for a keyword kind (non-operator kinds
/// canonicalize to this word; operator kinds canonicalize to their symbol).
fn english_spelling(kind: KeywordKind) -> Option<&'static str> {
    use KeywordKind::*;
    Option::Some(match kind {
        Module => "this module is",
        Import => "import",
        Data => "data",
        Enum => "enum",
        TypeAlias => "type",
        Function => "to",
        Produces => "produce",
        Of => "of",
        Performs => "it performs",
        Workflow => "workflow",
        Step => "step",
        Compensate => "compensate",
        Retry => "retry",
        Timeout => "timeout",
        DependsOn => "depends on",
        Let => "let",
        Be => "be",
        Set => "update",
        To => "to",
        Return => "return",
        If => "if",
        Then => "then",
        Else => "else",
        Match => "match",
        When => "when",
        Start => "start",
        Wait => "wait",
        As => "as",
        True => "true",
        False => "false",
        Null => "null",
        Ok => "ok",
        Err => "err",
        Some => "some",
        None => "none",
        Pure => "pure",
        Cpu => "cpu",
        Io => "io",
        Async => "async",
        Await => "await",
        And => "and",
        Or => "or",
        Not => "not",
        With => "with",
        Is => "is",
        Plus | Minus | Times | DividedBy | LessThan | GreaterThan | LessOrEqual
        | GreaterOrEqual | NotEqual | Equals => return Option::None,
    })
}

fn base_keywords() -> BTreeMap<KeywordKind, String> {
    let mut map = BTreeMap::new();
    for &kind in KeywordKind::ALL {
        if let Some(word) = english_spelling(kind) {
            map.insert(kind, word.to_string());
        }
    }
    map
}

fn en_us_lexicon() -> Lexicon {
    let mut keywords = base_keywords();
    keywords.insert(KeywordKind::Plus, "plus".to_string());
    keywords.insert(KeywordKind::Minus, "minus".to_string());
    keywords.insert(KeywordKind::Times, "times".to_string());
    keywords.insert(KeywordKind::DividedBy, "divided by".to_string());
    keywords.insert(KeywordKind::LessThan, "less than".to_string());
    keywords.insert(KeywordKind::GreaterThan, "greater than".to_string());
    keywords.insert(KeywordKind::LessOrEqual, "at most".to_string());
    keywords.insert(KeywordKind::GreaterOrEqual, "at least".to_string());
    keywords.insert(KeywordKind::NotEqual, "is not".to_string());
    keywords.insert(KeywordKind::Equals, "equals".to_string());

    Lexicon {
        locale: "en-US".to_string(),
        keywords,
        multi_word_keywords: vec![
            "This Module Is".to_string(),
            "It Performs".to_string(),
            "Depends On".to_string(),
            "Divided By".to_string(),
            "Less Than".to_string(),
            "Greater Than".to_string(),
            "At Most".to_string(),
            "At Least".to_string(),
            "Is Not".to_string(),
        ],
        quote: QuotePair::new('"', '"'),
        punctuation: vec![],
        whitespace_mode: WhitespaceMode::SpaceSeparated,
        articles: vec!["a".to_string(), "an".to_string(), "the".to_string()],
        rewrite_rules: vec![],
        fold_fullwidth: false,
    }
}

fn zh_cn_lexicon() -> Lexicon {
    let mut keywords = BTreeMap::new();
    keywords.insert(KeywordKind::Module, "【模块】".to_string());
    keywords.insert(KeywordKind::Return, "返回".to_string());
    keywords.insert(KeywordKind::Let, "令".to_string());
    keywords.insert(KeywordKind::Be, "为".to_string());
    keywords.insert(KeywordKind::Set, "设置".to_string());
    keywords.insert(KeywordKind::If, "如果".to_string());
    keywords.insert(KeywordKind::Then, "那么".to_string());
    keywords.insert(KeywordKind::Else, "否则".to_string());
    keywords.insert(KeywordKind::Match, "匹配".to_string());
    keywords.insert(KeywordKind::True, "真".to_string());
    keywords.insert(KeywordKind::False, "假".to_string());
    keywords.insert(KeywordKind::Null, "空".to_string());
    keywords.insert(KeywordKind::Produces, "产出".to_string());
    keywords.insert(KeywordKind::Function, "定义".to_string());
    keywords.insert(KeywordKind::LessThan, "小于".to_string());
    keywords.insert(KeywordKind::GreaterThan, "大于".to_string());
    keywords.insert(KeywordKind::Plus, "加上".to_string());
    keywords.insert(KeywordKind::Minus, "减去".to_string());
    keywords.insert(KeywordKind::And, "和".to_string());
    keywords.insert(KeywordKind::Or, "或".to_string());
    keywords.insert(KeywordKind::Not, "不".to_string());
    keywords.insert(KeywordKind::Is, "是".to_string());

    Lexicon {
        locale: "zh-CN".to_string(),
        keywords,
        multi_word_keywords: vec!["【模块】".to_string()],
        quote: QuotePair::new('「', '」'),
        punctuation: vec![
            ('。', '.'),
            ('，', ','),
            ('、', ','),
            ('：', ':'),
            ('【', '['),
            ('】', ']'),
        ],
        whitespace_mode: WhitespaceMode::Spaceless,
        articles: vec![],
        rewrite_rules: vec![],
        fold_fullwidth: true,
    }
}

fn de_de_lexicon() -> Lexicon {
    let mut keywords = base_keywords();
    keywords.insert(KeywordKind::Return, "rückgabe".to_string());
    keywords.insert(KeywordKind::Let, "sei".to_string());
    keywords.insert(KeywordKind::If, "wenn".to_string());
    keywords.insert(KeywordKind::Else, "sonst".to_string());
    keywords.insert(KeywordKind::True, "wahr".to_string());
    keywords.insert(KeywordKind::False, "falsch".to_string());
    keywords.insert(KeywordKind::Plus, "plus".to_string());
    keywords.insert(KeywordKind::Minus, "minus".to_string());
    keywords.insert(KeywordKind::LessThan, "kleiner als".to_string());
    keywords.insert(KeywordKind::GreaterThan, "größer als".to_string());
    keywords.insert(KeywordKind::And, "und".to_string());
    keywords.insert(KeywordKind::Or, "oder".to_string());

    Lexicon {
        locale: "de-DE".to_string(),
        keywords,
        multi_word_keywords: vec![
            "Kleiner Als".to_string(),
            "Größer Als".to_string(),
        ],
        quote: QuotePair::new('"', '"'),
        punctuation: vec![],
        whitespace_mode: WhitespaceMode::SpaceSeparated,
        articles: vec!["der".to_string(), "die".to_string(), "das".to_string(), "ein".to_string(), "eine".to_string()],
        rewrite_rules: vec![RewriteRule::new("ue", "ü")],
        fold_fullwidth: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn en_us_spells_return_as_return() {
        let lex = Lexicon::en_us();
        assert_eq!(lex.spelling(KeywordKind::Return), Some("return"));
    }

    #[test]
    fn zh_cn_keyword_for_word_round_trips() {
        let lex = Lexicon::zh_cn();
        assert_eq!(lex.keyword_for_word("返回"), Some(KeywordKind::Return));
        assert_eq!(lex.keyword_for_word("不存在"), None);
    }

    #[test]
    fn translation_table_orders_longest_match_first() {
        let lex = Lexicon::en_us();
        let table = lex.translation_table();
        for pair in table.windows(2) {
            assert!(pair[0].0.chars().count() >= pair[1].0.chars().count());
        }
    }

    #[test]
    fn de_de_rewrite_rule_compiles() {
        let lex = Lexicon::de_de();
        let rule = &lex.rewrite_rules[0];
        let re = rule.compiled().unwrap();
        assert_eq!(re.replace_all("ueber", &rule.replacement), "über");
    }

    #[test]
    fn translation_table_maps_operator_words_to_symbols() {
        let lex = Lexicon::en_us();
        let table = lex.translation_table();
        let less_than = table.iter().find(|(word, _)| *word == "less than").unwrap();
        assert_eq!(less_than.1, "<");
    }
}

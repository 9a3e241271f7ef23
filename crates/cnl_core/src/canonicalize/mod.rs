//! The fourteen-step canonicalization pipeline.
//!
//! `canonicalize` turns arbitrary-locale source into canonical CNL: English
//! keywords, ASCII quotes, no articles, normalized whitespace, and domain
//! identifiers resolved to their canonical spelling. String literal contents
//! survive every step byte-for-byte (except the final bracket-quote-to-ASCII
//! substitution, which only touches the delimiter characters themselves).
//!
//! Each step operates on the output of the previous one. Steps after 4 skip
//! string-literal interiors by routing through [`segmenter::map_outside_strings`].

pub mod segmenter;
pub mod transformers;

use cnl_lexicon::{IdentifierIndex, Lexicon, QuotePair, WhitespaceMode};
use segmenter::{map_outside_strings, segment};
use transformers::{post_translation_transformers, pre_translation_transformers, Transformer};

const SMART_OPEN: char = '\u{201C}';
const SMART_CLOSE: char = '\u{201D}';

/// Runs the full pipeline and returns canonical CNL source.
///
/// Pure: does not allocate process-wide state and never fails. Malformed
/// input surfaces as a lexer diagnostic downstream, not here.
pub fn canonicalize(source: &str, lexicon: &Lexicon, vocabulary: Option<&IdentifierIndex>) -> String {
    let mut text = source.to_string();

    text = normalize_line_endings(&text); // 1
    text = tabs_to_spaces(&text); // 2
    text = strip_line_comments(&text, lexicon.quote); // 3
    text = smart_quotes_to_ascii(&text, lexicon.quote); // 4

    let pre = pre_translation_transformers();
    text = apply_transformers_outside_strings(&text, lexicon.quote, &pre); // 5

    text = fullwidth_to_halfwidth(&text, lexicon); // 6
    text = collapse_whitespace(&text, lexicon.quote); // 7
    text = normalize_multiword_keyword_case(&text, lexicon.quote, lexicon); // 8
    text = apply_rewrite_rules(&text, lexicon.quote, lexicon); // 9
    text = translate_keywords(&text, lexicon.quote, lexicon); // 10

    if let Some(index) = vocabulary {
        text = translate_identifiers(&text, lexicon.quote, index); // 11
    }

    let post = post_translation_transformers();
    text = apply_transformers_outside_strings(&text, lexicon.quote, &post); // 12

    text = convert_locale_quotes_to_ascii(&text, lexicon.quote); // 13
    text = final_cleanup(&text); // 14

    text
}

fn normalize_line_endings(source: &str) -> String {
    source.replace("\r\n", "\n").replace('\r', "\n")
}

fn tabs_to_spaces(source: &str) -> String {
    source.replace('\t', "  ")
}

fn strip_line_comments(source: &str, quote: QuotePair) -> String {
    map_outside_strings(source, quote, strip_comments_from_segment)
}

fn strip_comments_from_segment(text: &str) -> String {
    let mut out = String::new();
    let mut first = true;
    for line in text.split('\n') {
        if !first {
            out.push('\n');
        }
        first = false;
        out.push_str(strip_comment_from_line(line));
    }
    out
}

fn strip_comment_from_line(line: &str) -> &str {
    let slash = line.find("//");
    let hash = line.find('#');
    let cut = match (slash, hash) {
        (Some(s), Some(h)) => Some(s.min(h)),
        (Some(s), None) => Some(s),
        (None, Some(h)) => Some(h),
        (None, None) => None,
    };
    match cut {
        Some(idx) => line[..idx].trim_end_matches(' '),
        None => line,
    }
}

fn smart_quotes_to_ascii(source: &str, quote: QuotePair) -> String {
    segment(source, quote)
        .into_iter()
        .map(|seg| {
            if seg.in_string {
                replace_smart_delimiters(&seg.text)
            } else {
                seg.text
                    .replace(SMART_OPEN, "\"")
                    .replace(SMART_CLOSE, "\"")
                    .replace('\u{2018}', "'")
                    .replace('\u{2019}', "'")
            }
        })
        .collect()
}

fn replace_smart_delimiters(text: &str) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    if let Some(first) = chars.first_mut() {
        if *first == SMART_OPEN {
            *first = '"';
        }
    }
    if let Some(last) = chars.last_mut() {
        if *last == SMART_CLOSE {
            *last = '"';
        }
    }
    chars.into_iter().collect()
}

fn apply_transformers_outside_strings(
    source: &str,
    quote: QuotePair,
    transformers: &[Box<dyn Transformer>],
) -> String {
    map_outside_strings(source, quote, |seg_text| {
        seg_text
            .split('\n')
            .map(|line| {
                let mut rewritten = line.to_string();
                for transformer in transformers {
                    rewritten = transformer.transform(&rewritten);
                }
                rewritten
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}

fn fullwidth_to_halfwidth(source: &str, lexicon: &Lexicon) -> String {
    if !lexicon.fold_fullwidth {
        return source.to_string();
    }
    map_outside_strings(source, lexicon.quote, |seg| {
        seg.chars()
            .map(|c| {
                let code = c as u32;
                if (0xFF01..=0xFF5E).contains(&code) {
                    char::from_u32(code - 0xFEE0).unwrap_or(c)
                } else if c == '\u{3000}' {
                    ' '
                } else {
                    c
                }
            })
            .collect()
    })
}

fn collapse_whitespace(source: &str, quote: QuotePair) -> String {
    map_outside_strings(source, quote, |seg| {
        seg.split('\n').map(collapse_line_whitespace).collect::<Vec<_>>().join("\n")
    })
}

fn collapse_line_whitespace(line: &str) -> String {
    let indent_len = line.len() - line.trim_start_matches(' ').len();
    let indent = &line[..indent_len];
    let rest = &line[indent_len..];

    let mut out = String::new();
    let mut pending_space = false;
    for c in rest.chars() {
        if c == ' ' || c == '\t' {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() && !is_terminal_punctuation(c) {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    format!("{indent}{out}")
}

fn is_terminal_punctuation(c: char) -> bool {
    matches!(c, '.' | ',' | '!' | '?' | ':' | ';')
}

fn normalize_multiword_keyword_case(source: &str, quote: QuotePair, lexicon: &Lexicon) -> String {
    map_outside_strings(source, quote, |seg| {
        let mut text = seg.to_string();
        for phrase in &lexicon.multi_word_keywords {
            text = replace_case_insensitive_all(&text, phrase, &phrase.to_lowercase());
        }
        text
    })
}

fn replace_case_insensitive_all(haystack: &str, needle: &str, replacement: &str) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }
    let mut result = String::new();
    let mut rest = haystack;
    loop {
        let rest_lower = rest.to_lowercase();
        let needle_lower = needle.to_lowercase();
        match rest_lower.find(&needle_lower) {
            Some(byte_idx) => {
                // `rest` and `rest_lower` share byte offsets for every locale
                // this pipeline ships (ASCII and CJK), so reslicing `rest`
                // directly at `byte_idx` is sound here.
                result.push_str(&rest[..byte_idx]);
                result.push_str(replacement);
                rest = &rest[byte_idx + needle.len()..];
            }
            None => {
                result.push_str(rest);
                break;
            }
        }
    }
    result
}

fn apply_rewrite_rules(source: &str, quote: QuotePair, lexicon: &Lexicon) -> String {
    let mut text = source.to_string();
    for rule in &lexicon.rewrite_rules {
        let compiled = rule
            .compiled()
            .expect("lexicon rewrite rules are validated at registration");
        text = map_outside_strings(&text, quote, |seg| {
            compiled.replace_all(seg, rule.replacement.as_str()).into_owned()
        });
    }
    text
}

fn translate_keywords(source: &str, quote: QuotePair, lexicon: &Lexicon) -> String {
    let table = lexicon.translation_table();
    map_outside_strings(source, quote, |seg| translate_segment(seg, &table, lexicon.whitespace_mode))
}

fn translate_segment(text: &str, table: &[(&str, String)], mode: WhitespaceMode) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    'outer: while i < chars.len() {
        for (pattern, canonical) in table {
            let plen = pattern.chars().count();
            if plen == 0 || i + plen > chars.len() {
                continue;
            }
            let candidate: String = chars[i..i + plen].iter().collect();
            if !candidate.eq_ignore_ascii_case(pattern) {
                continue;
            }
            let pattern_chars: Vec<char> = pattern.chars().collect();
            let starts_with_word_char = pattern_chars.first().map(|c| c.is_alphanumeric()).unwrap_or(false);
            let ends_with_word_char = pattern_chars.last().map(|c| c.is_alphanumeric()).unwrap_or(false);

            let before_ok = !starts_with_word_char || i == 0 || !joins_identifier(chars[i - 1], mode);
            let after_ok =
                !ends_with_word_char || i + plen >= chars.len() || !joins_identifier(chars[i + plen], mode);
            if !before_ok || !after_ok {
                continue;
            }

            if let Some(last_char) = out.chars().last() {
                if last_char.is_alphanumeric()
                    && canonical.chars().next().map(|c| c.is_alphanumeric()).unwrap_or(false)
                {
                    out.push(' ');
                }
            }
            out.push_str(canonical);

            let ends_in_letter = canonical.chars().last().map(|c| c.is_alphabetic()).unwrap_or(false);
            let next_joins = i + plen < chars.len() && chars[i + plen].is_alphanumeric();
            if ends_in_letter && next_joins {
                out.push(' ');
            }

            i += plen;
            continue 'outer;
        }
        out.push(chars[i]);
        i += 1;
    }

    out
}

fn joins_identifier(c: char, _mode: WhitespaceMode) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn translate_identifiers(source: &str, quote: QuotePair, index: &IdentifierIndex) -> String {
    map_outside_strings(source, quote, |seg| translate_identifiers_segment(seg, index))
}

fn translate_identifiers_segment(text: &str, index: &IdentifierIndex) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        if is_identifier_start(chars[i]) {
            let start = i;
            i += 1;
            while i < chars.len() && is_identifier_continue(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            match index.canonical_for(&word) {
                Some(canonical) => out.push_str(canonical),
                None => out.push_str(&word),
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn convert_locale_quotes_to_ascii(source: &str, quote: QuotePair) -> String {
    if quote.open == '"' && quote.close == '"' {
        return source.to_string();
    }
    source
        .chars()
        .map(|c| if c == quote.open || c == quote.close { '"' } else { c })
        .collect()
}

fn final_cleanup(source: &str) -> String {
    source
        .split('\n')
        .map(|line| line.trim_end_matches([' ', '\t']))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_is_idempotent_for_english_source() {
        let lex = Lexicon::en_us();
        let source = "Let x be 5.\nReturn x plus 1.\n";
        let once = canonicalize(source, &lex, None);
        let twice = canonicalize(&once, &lex, None);
        assert_eq!(once, twice);
    }

    #[test]
    fn strips_line_comments_outside_strings() {
        let lex = Lexicon::en_us();
        let out = canonicalize("Let x be 5. // a comment\n", &lex, None);
        assert!(!out.contains("comment"));
    }

    #[test]
    fn preserves_string_literal_contents() {
        let lex = Lexicon::en_us();
        let out = canonicalize(r#"Return "Driver Name".
"#, &lex, None);
        assert!(out.contains("\"Driver Name\""));
    }

    #[test]
    fn translates_chinese_module_declaration_and_string() {
        let lex = Lexicon::zh_cn();
        let source = "【模块】测试。\n返回「你好」。\n";
        let out = canonicalize(source, &lex, None);
        assert!(out.starts_with("this module is 测试."));
        assert!(out.contains("return \"你好\"."));
    }

    #[test]
    fn folds_operator_words_to_symbols() {
        let lex = Lexicon::en_us();
        let out = canonicalize("Return x less than y.\n", &lex, None);
        assert!(out.contains("x < y"));
    }

    #[test]
    fn set_to_let_rewrite_runs_after_translation() {
        let lex = Lexicon::en_us();
        let out = canonicalize("Set total to 0.\n", &lex, None);
        assert!(out.starts_with("let total be 0."));
    }

    #[test]
    fn identifier_translation_resolves_known_vocabulary_words() {
        use cnl_lexicon::{IdentifierIndex, IdentifierKind, IdentifierMapping, Vocabulary};
        let lex = Lexicon::zh_cn();
        let vocab = Vocabulary::new("fleet", "zh-CN")
            .with_mapping(IdentifierMapping::new("Driver", "驾驶员", IdentifierKind::Struct));
        let index = IdentifierIndex::compile([&vocab]);
        let out = canonicalize("返回 驾驶员。\n", &lex, Some(&index));
        assert!(out.contains("Driver"));
    }
}

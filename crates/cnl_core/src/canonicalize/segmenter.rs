//! Single-pass string-literal segmentation.
//!
//! Every canonicalization step past line 4 of the pipeline must leave string
//! literal contents byte-for-byte untouched (invariant: string-literal
//! preservation). [`segment`] partitions a source string into alternating
//! `(text, in_string)` runs so that each pipeline step can map itself only
//! over the `in_string == false` runs.
//!
//! Three quote families are recognized as delimiters: the locale's
//! configured [`QuotePair`], ASCII `"…"` (always, regardless of locale), and
//! smart `“…”` quotes. A quote character is *escaped* — not a delimiter —
//! when preceded by an odd number of consecutive backslashes.

use cnl_lexicon::QuotePair;

/// One contiguous run of source text, tagged with whether it lies inside a
/// string literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub in_string: bool,
}

const SMART_OPEN: char = '\u{201C}';
const SMART_CLOSE: char = '\u{201D}';
const ASCII_QUOTE: char = '"';

/// Splits `source` into segments, each either entirely inside or entirely
/// outside a string literal. Concatenating every segment's `text` in order
/// reproduces `source` exactly.
pub fn segment(source: &str, quote: QuotePair) -> Vec<Segment> {
    let chars: Vec<char> = source.chars().collect();
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut closer: char = ASCII_QUOTE;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if !in_string {
            if is_opener(c, quote) {
                if !current.is_empty() {
                    segments.push(Segment {
                        text: std::mem::take(&mut current),
                        in_string: false,
                    });
                }
                closer = matching_closer(c, quote);
                current.push(c);
                in_string = true;
            } else {
                current.push(c);
            }
        } else {
            current.push(c);
            if c == closer && !escaped(&chars, i) {
                segments.push(Segment {
                    text: std::mem::take(&mut current),
                    in_string: true,
                });
                in_string = false;
            }
        }
        i += 1;
    }

    if !current.is_empty() {
        segments.push(Segment {
            text: current,
            in_string,
        });
    }

    segments
}

fn is_opener(c: char, quote: QuotePair) -> bool {
    c == ASCII_QUOTE || c == SMART_OPEN || c == quote.open
}

fn matching_closer(opener: char, quote: QuotePair) -> char {
    if opener == ASCII_QUOTE {
        ASCII_QUOTE
    } else if opener == SMART_OPEN {
        SMART_CLOSE
    } else if opener == quote.open {
        quote.close
    } else {
        ASCII_QUOTE
    }
}

/// `true` if the character at `index` is preceded by an odd number of
/// backslashes (i.e. it is escaped, not a real delimiter).
fn escaped(chars: &[char], index: usize) -> bool {
    let mut backslashes = 0;
    let mut j = index;
    while j > 0 && chars[j - 1] == '\\' {
        backslashes += 1;
        j -= 1;
    }
    backslashes % 2 == 1
}

/// Applies `f` to every out-of-string segment and reassembles the result,
/// leaving string-literal contents untouched.
pub fn map_outside_strings(source: &str, quote: QuotePair, f: impl Fn(&str) -> String) -> String {
    segment(source, quote)
        .into_iter()
        .map(|seg| if seg.in_string { seg.text } else { f(&seg.text) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascii() -> QuotePair {
        QuotePair::new('"', '"')
    }

    #[test]
    fn segments_a_simple_string_literal() {
        let segs = segment(r#"Return "hello"."#, ascii());
        assert_eq!(segs.len(), 3);
        assert!(!segs[0].in_string);
        assert!(segs[1].in_string);
        assert_eq!(segs[1].text, "\"hello\"");
        assert!(!segs[2].in_string);
    }

    #[test]
    fn reassembly_is_lossless() {
        let src = r#"Let x be "a, b" plus 1."#;
        let segs = segment(src, ascii());
        let rebuilt: String = segs.iter().map(|s| s.text.clone()).collect();
        assert_eq!(rebuilt, src);
    }

    #[test]
    fn escaped_quote_does_not_close_the_string() {
        let src = r#"Return "she said \"hi\"".""#;
        let segs = segment(src, ascii());
        // The whole escaped-quote string is one in-string segment, followed
        // by trailing punctuation outside it.
        assert!(segs[1].in_string);
        assert!(segs[1].text.contains("\\\""));
    }

    #[test]
    fn locale_quote_pair_delimits_strings() {
        let cn = QuotePair::new('「', '」');
        let segs = segment("返回「你好」。", cn);
        assert!(segs[1].in_string);
        assert_eq!(segs[1].text, "「你好」");
    }

    #[test]
    fn map_outside_strings_preserves_string_bytes() {
        let src = r#"SET x TO "KEEP CASE"."#;
        let result = map_outside_strings(src, ascii(), |s| s.to_lowercase());
        assert_eq!(result, r#"set x to "KEEP CASE"."#);
    }

    #[test]
    fn no_strings_maps_the_whole_input() {
        let result = map_outside_strings("HELLO WORLD", ascii(), |s| s.to_lowercase());
        assert_eq!(result, "hello world");
    }
}

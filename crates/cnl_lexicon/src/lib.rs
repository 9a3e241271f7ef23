#![cfg_attr(docsrs, feature(doc_cfg))]

//! # cnl-lexicon
//!
//! Locale lexicons and domain vocabularies for the CNL compiler front end.
//!
//! This crate provides the data the canonicalizer and lexer need to treat
//! English, Chinese, and German source as the same underlying grammar:
//!
//! - [`Lexicon`] — one locale's keyword spellings, quote delimiters,
//!   whitespace mode, article list, and custom rewrite rules, with built-in
//!   defaults for `en-US`, `zh-CN`, and `de-DE`
//! - [`KeywordKind`] — the fixed, locale-independent set of semantic
//!   keyword concepts every lexicon must supply a spelling for
//! - [`Vocabulary`]/[`IdentifierIndex`] — domain identifier mappings
//!   (`Driver` <-> `驾驶员`) with bidirectional, case-insensitive lookup
//! - [`VocabularyExport`] — deterministic, checksummed JSON export for
//!   inter-process exchange
//! - [`registry::LEXICONS`]/[`registry::VOCABULARIES`] — process-wide,
//!   read-write-locked registries seeded with the built-in locales
//!
//! # Architecture
//!
//! This crate has no knowledge of tokens, the grammar, or the IR — it is
//! pure data plus lookup. The lexer and canonicalizer in `cnl-core` are the
//! only consumers that interpret this data as instructions for rewriting or
//! tokenizing source text.
//!
//! # Example
//!
//! ```
//! use cnl_lexicon::{KeywordKind, Lexicon};
//!
//! let zh = Lexicon::zh_cn();
//! assert_eq!(zh.keyword_for_word("返回"), Some(KeywordKind::Return));
//! ```

pub mod export;
pub mod keyword;
pub mod lexicon;
pub mod registry;
pub mod vocabulary;

pub use export::VocabularyExport;
pub use keyword::KeywordKind;
pub use lexicon::{Lexicon, QuotePair, RewriteRule, WhitespaceMode};
pub use registry::{LexiconRegistry, VocabularyRegistry, LEXICONS, VOCABULARIES};
pub use vocabulary::{IdentifierIndex, IdentifierKind, IdentifierMapping, Vocabulary};

#![cfg_attr(docsrs, feature(doc_cfg))]

//! # cnl-base
//!
//! Pure structural atoms shared by every stage of the CNL compiler front end.
//!
//! This crate provides the foundational types used throughout the pipeline:
//!
//! - [`Interner`]/[`Symbol`] — String interning for O(1) equality
//! - [`Position`]/[`Span`] — Line/column source location tracking
//! - [`Diagnostic`]/[`Severity`] — Structured, tool-consumable compiler messages
//! - [`SpannedError`]/[`Result`] — Fatal per-stage errors with source positions
//!
//! # Design principles
//!
//! This crate has **no knowledge of any particular locale or checker**, but
//! [`Symbol::looks_like_type`] does encode the one surface-grammar
//! convention (leading-uppercase marks a type name) shared by every locale's
//! lexicon, since every stage downstream of the lexer needs to ask that
//! question.
//!
//! # Example
//!
//! ```
//! use cnl_base::{Interner, Position, Span};
//!
//! let mut interner = Interner::new();
//!
//! let hello = interner.intern("Driver");
//! let span = Span::new(Position::new(1, 1), Position::new(1, 7));
//!
//! assert!(hello.looks_like_type(&interner));
//! assert_eq!(span.len_columns(), 6);
//! ```

pub mod diagnostic;
pub mod error;
pub mod intern;
pub mod span;

pub use diagnostic::{Diagnostic, Severity};
pub use error::{Result, SpannedError};
pub use intern::{Interner, Symbol};
pub use span::{Position, Span};

//! The controlled-natural-language compiler front end: canonicalization,
//! lexing, parsing, lowering to Core IR, and semantic checking.
//!
//! The pipeline is a strict sequence of pure or fallible passes, each
//! consuming the previous one's output: [`canonicalize`] → [`lex`] →
//! [`parse`] → [`ir::lower`] → [`semantics::check`]. Only lexing and
//! parsing can fail outright (a [`cnl_base::SpannedError`]); everything
//! downstream of a successfully parsed module reports findings as
//! [`cnl_base::Diagnostic`]s instead of failing the whole pipeline.

pub mod ast;
pub mod canonicalize;
pub mod codes;
pub mod ir;
pub mod lexer;
pub mod manifest;
pub mod parser;
pub mod semantics;
pub mod symtab;
pub mod token;

pub use cnl_base::{Diagnostic, Result, Severity, SpannedError};
pub use cnl_lexicon::Lexicon;

pub use ast::Module;
pub use canonicalize::canonicalize as canonicalize_source;
pub use codes::ErrorCode;
pub use ir::{lower, IrModule};
pub use lexer::lex;
pub use manifest::Manifest;
pub use parser::parse;

/// Runs the full front end over `source` for a locale with no domain
/// vocabulary: canonicalize, lex, parse, lower, check.
///
/// Returns the lowered module alongside every diagnostic the checkers
/// produced — a non-empty diagnostic list is not itself an error; callers
/// decide whether any `Severity::Error` entries should block further use.
pub fn compile(source: &str, lexicon: &Lexicon, module_name: impl Into<String>) -> Result<(IrModule, Vec<Diagnostic>)> {
    compile_with_manifest(source, lexicon, module_name, None)
}

/// Like [`compile`], but checks every function's capabilities against an
/// optional allow-list [`Manifest`].
pub fn compile_with_manifest(
    source: &str,
    lexicon: &Lexicon,
    module_name: impl Into<String>,
    manifest: Option<&Manifest>,
) -> Result<(IrModule, Vec<Diagnostic>)> {
    let canonical = canonicalize::canonicalize(source, lexicon, None);
    let mut interner = cnl_base::Interner::new();
    let lexed = lexer::lex(&canonical, lexicon, &mut interner)?;
    let module = parser::parse(lexed.tokens, &interner, module_name)?;
    let ir_module = ir::lower(&module);
    let diagnostics = semantics::check(&ir_module, manifest);
    Ok((ir_module, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiling_a_clean_pure_function_yields_no_diagnostics() {
        let lexicon = Lexicon::en_us();
        let (_, diagnostics) = compile("to f() produce Bool:\n  return true.\n", &lexicon, "test").unwrap();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn compiling_an_io_call_without_a_declared_effect_surfaces_a_diagnostic() {
        let lexicon = Lexicon::en_us();
        let (_, diagnostics) = compile("to f():\n  return Http.get().\n", &lexicon, "test").unwrap();
        assert!(diagnostics.iter().any(|d| d.code == "EFF_MISSING_IO"));
    }
}

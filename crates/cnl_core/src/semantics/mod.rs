//! Semantic checking: base types, effects, capabilities, PII taint-flow,
//! and async discipline, run over a lowered module and aggregated into one
//! diagnostic stream.

pub mod async_discipline;
pub mod base_type;
pub mod capability;
pub mod effect;
pub mod pii;
pub mod unify;

use cnl_base::Diagnostic;

use crate::ir::{IrDecl, IrEffect, IrModule};
use crate::manifest::Manifest;
use crate::symtab::AliasTable;

/// Runs every checker over every function in `module`, in the order the
/// checks are described: base types, effects, capabilities, PII, async.
/// A checker failing on one function does not stop the others from
/// running — every diagnostic from every checker is collected.
pub fn check(module: &IrModule, manifest: Option<&Manifest>) -> Vec<Diagnostic> {
    let signatures = base_type::collect_signatures(module);
    let pii_signatures = pii::collect_signatures(module);
    let aliases = AliasTable::new();

    let declared_effect_of = |name: &str| -> Option<IrEffect> {
        module.decls.iter().find_map(|decl| match decl {
            IrDecl::Func(f) if f.name == name => Some(f.effect.clone()),
            _ => None,
        })
    };

    let mut diagnostics = Vec::new();
    for decl in &module.decls {
        let IrDecl::Func(func) = decl else { continue };

        let checker = base_type::TypeChecker::new(&signatures, &aliases);
        diagnostics.extend(checker.check_function(func));

        diagnostics.extend(effect::check_function(func, &declared_effect_of));
        diagnostics.extend(capability::check_function(func, manifest));
        diagnostics.extend(pii::PiiChecker::new(&pii_signatures).check_function(func));
        diagnostics.extend(async_discipline::check_function(func));
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnl_base::Interner;
    use cnl_lexicon::Lexicon;

    fn check_source(source: &str) -> Vec<Diagnostic> {
        let lexicon = Lexicon::en_us();
        let mut interner = Interner::new();
        let lexed = crate::lexer::lex(source, &lexicon, &mut interner).expect("lex should succeed");
        let module = crate::parser::parse(lexed.tokens, &interner, "test").expect("parse should succeed");
        let ir_module = crate::ir::lower(&module);
        check(&ir_module, None)
    }

    #[test]
    fn a_clean_pure_function_produces_no_diagnostics() {
        let diagnostics = check_source("to f() produce Bool:\n  return true.\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn calling_io_without_declaring_it_is_flagged_across_checkers() {
        let diagnostics = check_source("to f():\n  return Http.get().\n");
        assert!(diagnostics.iter().any(|d| d.code == "EFF_MISSING_IO"));
    }
}

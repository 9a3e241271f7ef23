//! Effect lattice and inference.
//!
//! `pure ⊑ cpu ⊑ io`, `pure ⊑ async`, and `async` sits at the top,
//! absorbing whatever `io`/`cpu` a function also performs.

use cnl_base::Diagnostic;

use crate::codes::ErrorCode;
use crate::ir::{IrEffect, IrExpr, IrFunc, IrStmt};

const IO_PREFIXES: &[&str] =
    &["Http", "Db", "Sql", "Time", "Files", "Secrets", "Ai", "Payment", "Inventory"];
const CPU_PREFIXES: &[&str] = &["Cpu"];

pub fn join(a: IrEffect, b: IrEffect) -> IrEffect {
    use IrEffect::*;
    match (a, b) {
        (Async, _) | (_, Async) => Async,
        (Io, _) | (_, Io) => Io,
        (Cpu, _) | (_, Cpu) => Cpu,
        (Pure, Pure) => Pure,
    }
}

fn rank(effect: &IrEffect) -> u8 {
    match effect {
        IrEffect::Pure => 0,
        IrEffect::Cpu => 1,
        IrEffect::Io => 2,
        IrEffect::Async => 3,
    }
}

fn exceeds(observed: &IrEffect, declared: &IrEffect) -> bool {
    rank(observed) > rank(declared)
}

fn effect_for_qualified_name(name: &str) -> Option<IrEffect> {
    let prefix = name.split('.').next()?;
    if IO_PREFIXES.contains(&prefix) {
        Some(IrEffect::Io)
    } else if CPU_PREFIXES.contains(&prefix) {
        Some(IrEffect::Cpu)
    } else {
        None
    }
}

/// Infers the effect of a single expression, consulting `declared_effect_of`
/// for any call target that is a symbol with a function-level declared
/// effect (checked before falling back to prefix matching).
pub fn infer_expr_effect(expr: &IrExpr, declared_effect_of: &impl Fn(&str) -> Option<IrEffect>) -> IrEffect {
    match expr {
        IrExpr::Bool { .. }
        | IrExpr::Int { .. }
        | IrExpr::Long { .. }
        | IrExpr::Double { .. }
        | IrExpr::String { .. }
        | IrExpr::Null { .. }
        | IrExpr::None { .. }
        | IrExpr::Name { .. } => IrEffect::Pure,
        IrExpr::Await { inner, .. } => join(IrEffect::Async, infer_expr_effect(inner, declared_effect_of)),
        IrExpr::Ok { inner, .. }
        | IrExpr::Err { inner, .. }
        | IrExpr::Some { inner, .. } => infer_expr_effect(inner, declared_effect_of),
        IrExpr::Construct { fields, .. } => fields
            .iter()
            .fold(IrEffect::Pure, |acc, (_, v)| join(acc, infer_expr_effect(v, declared_effect_of))),
        IrExpr::Lambda { .. } => IrEffect::Pure,
        IrExpr::Call { callee, args, .. } => {
            let args_effect = args
                .iter()
                .fold(IrEffect::Pure, |acc, a| join(acc, infer_expr_effect(a, declared_effect_of)));
            let call_effect = match callee.as_ref() {
                IrExpr::Name { name, .. } => declared_effect_of(name)
                    .or_else(|| effect_for_qualified_name(name))
                    .unwrap_or(IrEffect::Pure),
                other => infer_expr_effect(other, declared_effect_of),
            };
            join(args_effect, call_effect)
        }
    }
}

pub fn infer_stmt_effect(stmt: &IrStmt, declared_effect_of: &impl Fn(&str) -> Option<IrEffect>) -> IrEffect {
    match stmt {
        IrStmt::Let { value, .. } | IrStmt::Set { value, .. } | IrStmt::Start { value, .. } => {
            infer_expr_effect(value, declared_effect_of)
        }
        IrStmt::Return { value, .. } => value
            .as_ref()
            .map(|v| infer_expr_effect(v, declared_effect_of))
            .unwrap_or(IrEffect::Pure),
        IrStmt::If { cond, then_branch, else_branch, .. } => {
            let mut effect = infer_expr_effect(cond, declared_effect_of);
            effect = join(effect, infer_stmt_effect(then_branch, declared_effect_of));
            if let Some(else_branch) = else_branch {
                effect = join(effect, infer_stmt_effect(else_branch, declared_effect_of));
            }
            effect
        }
        IrStmt::Match { scrutinee, arms, .. } => {
            let mut effect = infer_expr_effect(scrutinee, declared_effect_of);
            for arm in arms {
                effect = join(effect, infer_expr_effect(&arm.body, declared_effect_of));
            }
            effect
        }
        IrStmt::Wait { .. } => IrEffect::Async,
        IrStmt::Workflow { steps, .. } => {
            let mut effect = IrEffect::Io;
            for step in steps {
                effect = join(effect, infer_stmt_effect(&step.body, declared_effect_of));
                if let Some(compensate) = &step.compensate {
                    effect = join(effect, infer_stmt_effect(compensate, declared_effect_of));
                }
            }
            effect
        }
        IrStmt::Block { statements, .. } | IrStmt::Scope { statements, .. } => statements
            .iter()
            .fold(IrEffect::Pure, |acc, s| join(acc, infer_stmt_effect(s, declared_effect_of))),
    }
}

/// Checks a single function's declared effect against its inferred body
/// effect, given the declared effects of every other module-level function
/// (for call targets that resolve to a declared symbol).
pub fn check_function(func: &IrFunc, declared_effect_of: &impl Fn(&str) -> Option<IrEffect>) -> Vec<Diagnostic> {
    let observed = infer_stmt_effect(&func.body, declared_effect_of);
    let mut diagnostics = Vec::new();
    if exceeds(&observed, &func.effect) {
        // The fixed diagnostic-code enum has no EFF_MISSING_CPU entry
        // distinct from EFF_MISSING_IO — see DESIGN.md.
        diagnostics.push(
            ErrorCode::EffMissingIo.diagnostic(format!(
                "function `{}` declares {:?} but its body performs {:?}",
                func.name, func.effect, observed
            ))
            .with_span(func.span.clone()),
        );
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnl_base::Span;

    #[test]
    fn join_is_commutative_and_async_is_top() {
        assert_eq!(join(IrEffect::Io, IrEffect::Cpu), join(IrEffect::Cpu, IrEffect::Io));
        assert_eq!(join(IrEffect::Async, IrEffect::Io), IrEffect::Async);
    }

    #[test]
    fn join_is_idempotent() {
        assert_eq!(join(IrEffect::Cpu, IrEffect::Cpu), IrEffect::Cpu);
    }

    #[test]
    fn http_prefixed_call_infers_io() {
        let call = IrExpr::Call {
            callee: Box::new(IrExpr::Name { name: "Http.get".into(), span: Span::synthetic() }),
            args: vec![],
            span: Span::synthetic(),
        };
        assert_eq!(infer_expr_effect(&call, &|_| None), IrEffect::Io);
    }

    #[test]
    fn await_sets_async_even_over_a_pure_inner_expression() {
        let inner = IrExpr::Bool { value: true, span: Span::synthetic() };
        let expr = IrExpr::Await { inner: Box::new(inner), span: Span::synthetic() };
        assert_eq!(infer_expr_effect(&expr, &|_| None), IrEffect::Async);
    }

    #[test]
    fn pure_function_body_calling_io_is_flagged() {
        let body = IrStmt::Return {
            value: Some(IrExpr::Call {
                callee: Box::new(IrExpr::Name { name: "Http.get".into(), span: Span::synthetic() }),
                args: vec![],
                span: Span::synthetic(),
            }),
            span: Span::synthetic(),
        };
        let func = IrFunc {
            name: "f".into(),
            type_params: vec![],
            params: vec![],
            ret: crate::ir::IrType::TypeName("Text".into()),
            effect: IrEffect::Pure,
            capabilities: vec![],
            body,
            pii_level: None,
            pii_categories: Default::default(),
            span: Span::synthetic(),
        };
        let diagnostics = check_function(&func, &|_| None);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, ErrorCode::EffMissingIo.as_str());
    }
}

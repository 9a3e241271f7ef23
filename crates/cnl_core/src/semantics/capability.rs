//! Capability inference and the rules that depend on it: explicit
//! capability lists, workflow capability containment, and the optional
//! manifest allow-list.

use std::collections::BTreeSet;

use cnl_base::Diagnostic;

use crate::codes::ErrorCode;
use crate::ir::{IrEffect, IrExpr, IrFunc, IrStmt};
use crate::manifest::Manifest;

const CAPABILITY_PREFIXES: &[(&str, &str)] = &[
    ("Http", "Http"),
    ("Db", "Sql"),
    ("Sql", "Sql"),
    ("Time", "Time"),
    ("Files", "Files"),
    ("Secrets", "Secrets"),
    ("Ai", "AiModel"),
    ("Payment", "Payment"),
    ("Inventory", "Inventory"),
    ("Cpu", "Cpu"),
];

fn capability_for_qualified_name(name: &str) -> Option<&'static str> {
    let prefix = name.split('.').next()?;
    CAPABILITY_PREFIXES.iter().find(|(p, _)| *p == prefix).map(|(_, cap)| *cap)
}

/// Walks `stmt`'s calls and records which capability each one exercises.
pub fn infer_capabilities(stmt: &IrStmt) -> BTreeSet<String> {
    let mut caps = BTreeSet::new();
    walk_stmt(stmt, &mut |expr| {
        if let IrExpr::Call { callee, .. } = expr {
            if let IrExpr::Name { name, .. } = callee.as_ref() {
                if let Some(cap) = capability_for_qualified_name(name) {
                    caps.insert(cap.to_string());
                }
            }
        }
    });
    caps
}

fn walk_stmt(stmt: &IrStmt, visit: &mut impl FnMut(&IrExpr)) {
    match stmt {
        IrStmt::Let { value, .. } | IrStmt::Set { value, .. } | IrStmt::Start { value, .. } => {
            walk_expr(value, visit)
        }
        IrStmt::Return { value, .. } => {
            if let Some(v) = value {
                walk_expr(v, visit);
            }
        }
        IrStmt::If { cond, then_branch, else_branch, .. } => {
            walk_expr(cond, visit);
            walk_stmt(then_branch, visit);
            if let Some(e) = else_branch {
                walk_stmt(e, visit);
            }
        }
        IrStmt::Match { scrutinee, arms, .. } => {
            walk_expr(scrutinee, visit);
            for arm in arms {
                walk_expr(&arm.body, visit);
            }
        }
        IrStmt::Wait { .. } => {}
        IrStmt::Workflow { steps, .. } => {
            for step in steps {
                walk_stmt(&step.body, visit);
                if let Some(c) = &step.compensate {
                    walk_stmt(c, visit);
                }
            }
        }
        IrStmt::Block { statements, .. } | IrStmt::Scope { statements, .. } => {
            for s in statements {
                walk_stmt(s, visit);
            }
        }
    }
}

fn walk_expr(expr: &IrExpr, visit: &mut impl FnMut(&IrExpr)) {
    visit(expr);
    match expr {
        IrExpr::Call { callee, args, .. } => {
            walk_expr(callee, visit);
            for a in args {
                walk_expr(a, visit);
            }
        }
        IrExpr::Construct { fields, .. } => {
            for (_, v) in fields {
                walk_expr(v, visit);
            }
        }
        IrExpr::Ok { inner, .. }
        | IrExpr::Err { inner, .. }
        | IrExpr::Some { inner, .. }
        | IrExpr::Await { inner, .. } => walk_expr(inner, visit),
        IrExpr::Lambda { body, .. } => walk_stmt(body, visit),
        _ => {}
    }
}

/// Checks one function's capabilities: the used-vs-declared-effect
/// relationship, the explicit capability list if present, and the
/// function's entry (if any) in the manifest allow-list.
pub fn check_function(func: &IrFunc, manifest: Option<&Manifest>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let used = infer_capabilities(&func.body);
    let non_cpu_used: BTreeSet<&String> = used.iter().filter(|c| c.as_str() != "Cpu").collect();

    if !non_cpu_used.is_empty() && !matches!(func.effect, IrEffect::Io | IrEffect::Async) {
        diagnostics.push(
            ErrorCode::CapabilityInferMissingIo
                .diagnostic(format!(
                    "function `{}` uses {:?} but does not declare `io`",
                    func.name, non_cpu_used
                ))
                .with_span(func.span.clone()),
        );
    }
    if used.contains("Cpu") && !matches!(func.effect, IrEffect::Cpu | IrEffect::Io | IrEffect::Async) {
        diagnostics.push(
            ErrorCode::CapabilityInferMissingCpu
                .diagnostic(format!("function `{}` uses Cpu but declares neither `cpu` nor `io`", func.name))
                .with_span(func.span.clone()),
        );
    }

    if !func.capabilities.is_empty() {
        let declared: BTreeSet<String> = func.capabilities.iter().cloned().collect();
        for cap in &used {
            if !declared.contains(cap) {
                diagnostics.push(
                    ErrorCode::EffCapMissing
                        .diagnostic(format!("`{}` uses capability `{cap}` but it is not declared", func.name))
                        .with_span(func.span.clone()),
                );
            }
        }
        for cap in &declared {
            if !used.contains(cap) {
                diagnostics.push(
                    ErrorCode::EffCapSuperfluous
                        .diagnostic(format!("`{}` declares capability `{cap}` but never uses it", func.name))
                        .with_span(func.span.clone()),
                );
            }
        }
    }

    if let Some(manifest) = manifest {
        if manifest.has_entry(&func.name) {
            for cap in func.capabilities.iter().chain(used.iter()) {
                if !manifest.permits(&func.name, cap) {
                    diagnostics.push(
                        ErrorCode::EffCapMissing
                            .diagnostic(format!(
                                "`{}` uses capability `{cap}` outside the manifest allow-list",
                                func.name
                            ))
                            .with_span(func.span.clone()),
                    );
                }
            }
        }
    }

    diagnostics.extend(check_workflows(func));
    diagnostics
}

fn check_workflows(func: &IrFunc) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    collect_workflow_diagnostics(&func.body, func, &mut diagnostics);
    diagnostics
}

fn collect_workflow_diagnostics(stmt: &IrStmt, func: &IrFunc, diagnostics: &mut Vec<Diagnostic>) {
    match stmt {
        IrStmt::Workflow { steps, span, .. } => {
            if !matches!(func.effect, IrEffect::Io | IrEffect::Async) {
                diagnostics.push(
                    ErrorCode::WorkflowMissingIoEffect
                        .diagnostic(format!("workflow in `{}` must declare `io`", func.name))
                        .with_span(span.clone()),
                );
            }
            let declared: BTreeSet<String> = func.capabilities.iter().cloned().collect();
            for step in steps {
                if !declared.is_empty() {
                    for cap in &step.effect_caps {
                        if !declared.contains(cap) {
                            diagnostics.push(
                                ErrorCode::WorkflowUndeclaredCapability
                                    .diagnostic(format!(
                                        "step `{}` uses capability `{cap}` not declared by `{}`",
                                        step.name, func.name
                                    ))
                                    .with_span(step.span.clone()),
                            );
                        }
                    }
                }
                if let Some(compensate) = &step.compensate {
                    let compensate_caps = infer_capabilities(compensate);
                    let body_caps = infer_capabilities(&step.body);
                    for cap in &compensate_caps {
                        if !body_caps.contains(cap) {
                            diagnostics.push(
                                ErrorCode::CompensateNewCapability
                                    .diagnostic(format!(
                                        "step `{}`'s compensate block introduces capability `{cap}` not used in its body",
                                        step.name
                                    ))
                                    .with_span(step.span.clone()),
                            );
                        }
                    }
                }
            }
        }
        IrStmt::If { then_branch, else_branch, .. } => {
            collect_workflow_diagnostics(then_branch, func, diagnostics);
            if let Some(e) = else_branch {
                collect_workflow_diagnostics(e, func, diagnostics);
            }
        }
        IrStmt::Block { statements, .. } | IrStmt::Scope { statements, .. } => {
            for s in statements {
                collect_workflow_diagnostics(s, func, diagnostics);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnl_base::Span;
    use crate::ir::IrType;

    fn http_call_func(effect: IrEffect, capabilities: Vec<String>) -> IrFunc {
        let body = IrStmt::Return {
            value: Some(IrExpr::Call {
                callee: Box::new(IrExpr::Name { name: "Http.get".into(), span: Span::synthetic() }),
                args: vec![],
                span: Span::synthetic(),
            }),
            span: Span::synthetic(),
        };
        IrFunc {
            name: "f".into(),
            type_params: vec![],
            params: vec![],
            ret: IrType::TypeName("Text".into()),
            effect,
            capabilities,
            body,
            pii_level: None,
            pii_categories: Default::default(),
            span: Span::synthetic(),
        }
    }

    #[test]
    fn using_http_without_declaring_io_is_flagged() {
        let func = http_call_func(IrEffect::Pure, vec![]);
        let diagnostics = check_function(&func, None);
        assert!(diagnostics.iter().any(|d| d.code == ErrorCode::CapabilityInferMissingIo.as_str()));
    }

    #[test]
    fn declared_io_with_matching_capability_is_clean() {
        let func = http_call_func(IrEffect::Io, vec!["Http".to_string()]);
        let diagnostics = check_function(&func, None);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn superfluous_declared_capability_is_flagged() {
        let func = http_call_func(IrEffect::Io, vec!["Http".to_string(), "Sql".to_string()]);
        let diagnostics = check_function(&func, None);
        assert!(diagnostics.iter().any(|d| d.code == ErrorCode::EffCapSuperfluous.as_str()));
    }

    #[test]
    fn manifest_denies_a_capability_outside_its_allow_list() {
        let func = http_call_func(IrEffect::Io, vec!["Http".to_string()]);
        let manifest = Manifest::new().allow("f", ["Sql".to_string()]);
        let diagnostics = check_function(&func, Some(&manifest));
        assert!(diagnostics.iter().any(|d| d.code == ErrorCode::EffCapMissing.as_str()));
    }
}

//! AST-to-Core-IR lowering.
//!
//! Lowering is a single top-down pass with no fixed point and no fallible
//! steps of its own — anything that can fail (undefined names, type
//! mismatches) is the semantic checkers' job, not this pass's. Lowering
//! only reshapes the tree: it resolves annotation sugar into [`super::PiiType`],
//! flattens `ListLiteral` into its `Construct` form, drops `TypeAlias`
//! declarations, distinguishes a function's top-level body from a nested
//! `Scope`, and computes the two pieces of derived metadata the checkers
//! need up front — a lambda's captures and a function's or workflow step's
//! inferred capabilities.

use std::collections::BTreeSet;

use crate::ast::{
    self, Decl, EffectDecl, Expr, MatchArm, Module, Param, Pattern, Stmt, Type, WorkflowStep,
};

use super::{
    IrData, IrDecl, IrEffect, IrEnum, IrExpr, IrField, IrFunc, IrImport, IrMatchArm, IrModule,
    IrParam, IrPattern, IrStmt, IrType, IrWorkflowStep, PiiLevel, PiiMeta,
};

pub fn lower(module: &Module) -> IrModule {
    let decls = module.decls.iter().filter_map(lower_decl).collect();
    IrModule { name: module.name.clone(), decls, span: module.span.clone() }
}

fn lower_decl(decl: &Decl) -> Option<IrDecl> {
    match decl {
        Decl::Import(import) => Some(IrDecl::Import(IrImport {
            path: import.path.clone(),
            span: import.span.clone(),
        })),
        Decl::Data(data) => Some(IrDecl::Data(IrData {
            name: data.name.clone(),
            fields: data.fields.iter().map(lower_field).collect(),
            span: data.span.clone(),
        })),
        Decl::Enum(e) => Some(IrDecl::Enum(IrEnum {
            name: e.name.clone(),
            variants: e.variants.clone(),
            span: e.span.clone(),
        })),
        // Aliases are resolved in-line, on demand, by the symbol table; the
        // IR has no node for them.
        Decl::TypeAlias(_) => None,
        Decl::Func(func) => Some(IrDecl::Func(lower_func(func))),
    }
}

fn lower_field(field: &ast::Field) -> IrField {
    IrField { name: field.name.clone(), ty: lower_type(&field.ty), span: field.span.clone() }
}

fn lower_func(func: &ast::FuncDecl) -> IrFunc {
    let params: Vec<IrParam> = func.params.iter().map(lower_param).collect();
    let ret = lower_type(&func.ret);

    let mut pii: Option<PiiMeta> = None;
    for param in &params {
        pii = PiiMeta::merge(pii.as_ref(), collect_pii(&param.ty).as_ref());
    }
    pii = PiiMeta::merge(pii.as_ref(), collect_pii(&ret).as_ref());

    IrFunc {
        name: func.name.clone(),
        type_params: func.type_params.clone(),
        params,
        ret,
        effect: lower_effect(&func.effect),
        capabilities: func.capabilities.clone(),
        body: lower_top_block(&func.body),
        pii_level: pii.as_ref().map(|p| p.level),
        pii_categories: pii.map(|p| p.categories).unwrap_or_default(),
        span: func.span.clone(),
    }
}

fn lower_param(param: &Param) -> IrParam {
    IrParam { name: param.name.clone(), ty: lower_type(&param.ty), span: param.span.clone() }
}

fn lower_effect(effect: &EffectDecl) -> IrEffect {
    match effect {
        EffectDecl::Pure => IrEffect::Pure,
        EffectDecl::Cpu => IrEffect::Cpu,
        EffectDecl::Io => IrEffect::Io,
        EffectDecl::Async => IrEffect::Async,
    }
}

fn lower_type(ty: &Type) -> IrType {
    match ty {
        Type::TypeName(name) => IrType::TypeName(name.clone()),
        Type::TypeVar(name) => IrType::TypeVar(name.clone()),
        Type::TypeApp { name, args } => {
            IrType::TypeApp { name: name.clone(), args: args.iter().map(lower_type).collect() }
        }
        Type::Result { ok, err } => {
            IrType::Result { ok: Box::new(lower_type(ok)), err: Box::new(lower_type(err)) }
        }
        Type::Maybe(inner) => IrType::Maybe(Box::new(lower_type(inner))),
        Type::Option(inner) => IrType::Option(Box::new(lower_type(inner))),
        Type::List(inner) => IrType::List(Box::new(lower_type(inner))),
        Type::Map { key, value } => {
            IrType::Map { key: Box::new(lower_type(key)), value: Box::new(lower_type(value)) }
        }
        Type::FuncType { params, ret } => IrType::FuncType {
            params: params.iter().map(lower_type).collect(),
            ret: Box::new(lower_type(ret)),
        },
        Type::Annotated { annotation, inner } => {
            let base = lower_type(inner);
            match annotation.as_pii() {
                Some((level, category)) => IrType::PiiType {
                    base_type: Box::new(base),
                    sensitivity: parse_pii_level(&level),
                    category,
                },
                // Unrecognized annotations carry no IR representation of
                // their own; they describe the base type and nothing else.
                None => base,
            }
        }
    }
}

fn parse_pii_level(level: &str) -> PiiLevel {
    match level {
        "L1" => PiiLevel::L1,
        "L3" => PiiLevel::L3,
        _ => PiiLevel::L2,
    }
}

fn collect_pii(ty: &IrType) -> Option<PiiMeta> {
    match ty {
        IrType::PiiType { base_type, sensitivity, category } => {
            let inner = collect_pii(base_type);
            let here = PiiMeta::new(*sensitivity, [category.clone()]);
            PiiMeta::merge(Some(&here), inner.as_ref())
        }
        IrType::TypeApp { args, .. } => args.iter().filter_map(collect_pii).fold(None, |acc, m| {
            PiiMeta::merge(acc.as_ref(), Some(&m))
        }),
        IrType::Result { ok, err } => {
            PiiMeta::merge(collect_pii(ok).as_ref(), collect_pii(err).as_ref())
        }
        IrType::Maybe(inner) | IrType::Option(inner) | IrType::List(inner) => collect_pii(inner),
        IrType::Map { key, value } => {
            PiiMeta::merge(collect_pii(key).as_ref(), collect_pii(value).as_ref())
        }
        IrType::FuncType { params, ret } => {
            let from_params = params.iter().filter_map(collect_pii).fold(None, |acc, m| {
                PiiMeta::merge(acc.as_ref(), Some(&m))
            });
            PiiMeta::merge(from_params.as_ref(), collect_pii(ret).as_ref())
        }
        IrType::TypeName(_) | IrType::TypeVar(_) => None,
    }
}

/// A function body is always a `Block`; it lowers to `IrStmt::Block`. Any
/// `Block` found elsewhere in the tree is a nested scope.
fn lower_top_block(stmt: &Stmt) -> IrStmt {
    match stmt {
        Stmt::Block { statements, span } => IrStmt::Block {
            statements: statements.iter().map(lower_stmt).collect(),
            span: span.clone(),
        },
        other => lower_stmt(other),
    }
}

fn lower_stmt(stmt: &Stmt) -> IrStmt {
    match stmt {
        Stmt::Let { name, ty, value, span } => IrStmt::Let {
            name: name.clone(),
            ty: ty.as_ref().map(lower_type),
            value: lower_expr(value),
            span: span.clone(),
        },
        Stmt::Set { name, value, span } => {
            IrStmt::Set { name: name.clone(), value: lower_expr(value), span: span.clone() }
        }
        Stmt::Return { value, span } => {
            IrStmt::Return { value: value.as_ref().map(lower_expr), span: span.clone() }
        }
        Stmt::If { cond, then_branch, else_branch, span } => IrStmt::If {
            cond: lower_expr(cond),
            then_branch: Box::new(lower_stmt(then_branch)),
            else_branch: else_branch.as_ref().map(|b| Box::new(lower_stmt(b))),
            span: span.clone(),
        },
        Stmt::Match { scrutinee, arms, span } => IrStmt::Match {
            scrutinee: lower_expr(scrutinee),
            arms: arms.iter().map(lower_match_arm).collect(),
            span: span.clone(),
        },
        Stmt::Start { task, value, span } => {
            IrStmt::Start { task: task.clone(), value: lower_expr(value), span: span.clone() }
        }
        Stmt::Wait { task, span } => IrStmt::Wait { task: task.clone(), span: span.clone() },
        Stmt::Workflow { steps, span } => {
            let ir_steps = lower_workflow_steps(steps);
            let effect_caps = ir_steps.iter().fold(BTreeSet::new(), |mut acc, step| {
                acc.extend(step.effect_caps.iter().cloned());
                acc
            });
            IrStmt::Workflow { steps: ir_steps, effect_caps, span: span.clone() }
        }
        // A nested Block (inside If/Match arm/workflow step/etc.) is a
        // lexical scope, not the function's own body.
        Stmt::Block { statements, span } => {
            IrStmt::Scope { statements: statements.iter().map(lower_stmt).collect(), span: span.clone() }
        }
    }
}

fn lower_match_arm(arm: &MatchArm) -> IrMatchArm {
    IrMatchArm {
        pattern: lower_pattern(&arm.pattern),
        body: Box::new(lower_expr(&arm.body)),
        span: arm.span.clone(),
    }
}

fn lower_pattern(pattern: &Pattern) -> IrPattern {
    match pattern {
        Pattern::PatternNull => IrPattern::PatternNull,
        Pattern::PatternCtor { name, fields } => IrPattern::PatternCtor {
            name: name.clone(),
            fields: fields.iter().map(lower_pattern).collect(),
        },
        Pattern::PatternName(name) => IrPattern::PatternName(name.clone()),
        Pattern::PatternInt(n) => IrPattern::PatternInt(*n),
    }
}

fn lower_workflow_steps(steps: &[WorkflowStep]) -> Vec<IrWorkflowStep> {
    let mut lowered = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        let depends_on = if step.depends_on.is_empty() && index > 0 {
            vec![steps[index - 1].name.clone()]
        } else {
            step.depends_on.clone()
        };
        let body = Box::new(lower_stmt(&step.body));
        let compensate = step.compensate.as_ref().map(|c| Box::new(lower_stmt(c)));

        let mut effect_caps = BTreeSet::new();
        infer_capabilities(&body, &mut effect_caps);
        if let Some(comp) = &compensate {
            infer_capabilities(comp, &mut effect_caps);
        }

        lowered.push(IrWorkflowStep {
            name: step.name.clone(),
            depends_on,
            body,
            compensate,
            retry: step.retry,
            timeout: step.timeout,
            effect_caps,
            span: step.span.clone(),
        });
    }
    lowered
}

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
];

fn capability_for_qualified_name(name: &str) -> Option<&'static str> {
    let prefix = name.split('.').next()?;
    CAPABILITY_PREFIXES.iter().find(|(p, _)| *p == prefix).map(|(_, cap)| *cap)
}

fn infer_capabilities(stmt: &IrStmt, out: &mut BTreeSet<String>) {
    walk_stmt(stmt, &mut |expr| {
        if let IrExpr::Call { callee, .. } = expr {
            if let IrExpr::Name { name, .. } = callee.as_ref() {
                if let Some(cap) = capability_for_qualified_name(name) {
                    out.insert(cap.to_string());
                }
            }
        }
    });
}

/// Invokes `visit` on every expression reachable from `stmt`, recursing into
/// nested statements and expressions alike.
fn walk_stmt(stmt: &IrStmt, visit: &mut impl FnMut(&IrExpr)) {
    match stmt {
        IrStmt::Let { value, .. } | IrStmt::Set { value, .. } | IrStmt::Start { value, .. } => {
            walk_expr(value, visit);
        }
        IrStmt::Return { value, .. } => {
            if let Some(value) = value {
                walk_expr(value, visit);
            }
        }
        IrStmt::If { cond, then_branch, else_branch, .. } => {
            walk_expr(cond, visit);
            walk_stmt(then_branch, visit);
            if let Some(else_branch) = else_branch {
                walk_stmt(else_branch, visit);
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
                if let Some(compensate) = &step.compensate {
                    walk_stmt(compensate, visit);
                }
            }
        }
        IrStmt::Block { statements, .. } | IrStmt::Scope { statements, .. } => {
            for stmt in statements {
                walk_stmt(stmt, visit);
            }
        }
    }
}

fn walk_expr(expr: &IrExpr, visit: &mut impl FnMut(&IrExpr)) {
    visit(expr);
    match expr {
        IrExpr::Call { callee, args, .. } => {
            walk_expr(callee, visit);
            for arg in args {
                walk_expr(arg, visit);
            }
        }
        IrExpr::Construct { fields, .. } => {
            for (_, value) in fields {
                walk_expr(value, visit);
            }
        }
        IrExpr::Ok { inner, .. }
        | IrExpr::Err { inner, .. }
        | IrExpr::Some { inner, .. }
        | IrExpr::Await { inner, .. } => walk_expr(inner, visit),
        IrExpr::Lambda { body, .. } => walk_stmt(body, visit),
        IrExpr::Name { .. }
        | IrExpr::Bool { .. }
        | IrExpr::Int { .. }
        | IrExpr::Long { .. }
        | IrExpr::Double { .. }
        | IrExpr::String { .. }
        | IrExpr::Null { .. }
        | IrExpr::None { .. } => {}
    }
}

fn lower_expr(expr: &Expr) -> IrExpr {
    match expr {
        Expr::Name { name, span } => IrExpr::Name { name: name.clone(), span: span.clone() },
        Expr::Bool { value, span } => IrExpr::Bool { value: *value, span: span.clone() },
        Expr::Int { value, span } => IrExpr::Int { value: *value, span: span.clone() },
        Expr::Long { value, span } => IrExpr::Long { value: *value, span: span.clone() },
        Expr::Double { bits, span } => IrExpr::Double { bits: *bits, span: span.clone() },
        Expr::String { value, span } => IrExpr::String { value: value.clone(), span: span.clone() },
        Expr::Null { span } => IrExpr::Null { span: span.clone() },
        Expr::Call { callee, args, span } => IrExpr::Call {
            callee: Box::new(lower_expr(callee)),
            args: args.iter().map(lower_expr).collect(),
            span: span.clone(),
        },
        Expr::Construct { type_name, fields, span } => IrExpr::Construct {
            type_name: type_name.clone(),
            fields: fields.iter().map(|(name, value)| (name.clone(), lower_expr(value))).collect(),
            span: span.clone(),
        },
        Expr::Ok { inner, span } => {
            IrExpr::Ok { inner: Box::new(lower_expr(inner)), span: span.clone() }
        }
        Expr::Err { inner, span } => {
            IrExpr::Err { inner: Box::new(lower_expr(inner)), span: span.clone() }
        }
        Expr::Some { inner, span } => {
            IrExpr::Some { inner: Box::new(lower_expr(inner)), span: span.clone() }
        }
        Expr::None { span } => IrExpr::None { span: span.clone() },
        Expr::ListLiteral { items, span } => {
            let fields = items
                .iter()
                .enumerate()
                .map(|(index, item)| (index.to_string(), lower_expr(item)))
                .collect();
            IrExpr::Construct { type_name: "List".to_string(), fields, span: span.clone() }
        }
        Expr::Lambda { params, body, ret, span } => {
            let ir_params: Vec<IrParam> = params.iter().map(lower_param).collect();
            let ir_body = Box::new(lower_top_block(body));
            let mut bound: BTreeSet<String> = ir_params.iter().map(|p| p.name.clone()).collect();
            let mut free = BTreeSet::new();
            free_vars_in_stmt(&ir_body, &mut bound, &mut free);
            IrExpr::Lambda {
                params: ir_params,
                body: ir_body,
                ret: ret.as_ref().map(lower_type),
                captures: free.into_iter().collect(),
                span: span.clone(),
            }
        }
        Expr::Await { inner, span } => {
            IrExpr::Await { inner: Box::new(lower_expr(inner)), span: span.clone() }
        }
    }
}

fn free_vars_in_stmt(stmt: &IrStmt, bound: &mut BTreeSet<String>, free: &mut BTreeSet<String>) {
    match stmt {
        IrStmt::Let { name, value, .. } => {
            free_vars_in_expr(value, bound, free);
            bound.insert(name.clone());
        }
        IrStmt::Set { name, value, .. } => {
            if !bound.contains(name) {
                free.insert(name.clone());
            }
            free_vars_in_expr(value, bound, free);
        }
        IrStmt::Return { value, .. } => {
            if let Some(value) = value {
                free_vars_in_expr(value, bound, free);
            }
        }
        IrStmt::If { cond, then_branch, else_branch, .. } => {
            free_vars_in_expr(cond, bound, free);
            free_vars_in_stmt(then_branch, &mut bound.clone(), free);
            if let Some(else_branch) = else_branch {
                free_vars_in_stmt(else_branch, &mut bound.clone(), free);
            }
        }
        IrStmt::Match { scrutinee, arms, .. } => {
            free_vars_in_expr(scrutinee, bound, free);
            for arm in arms {
                let mut arm_bound = bound.clone();
                bind_pattern(&arm.pattern, &mut arm_bound);
                free_vars_in_expr(&arm.body, &mut arm_bound, free);
            }
        }
        IrStmt::Start { value, .. } => free_vars_in_expr(value, bound, free),
        IrStmt::Wait { task, .. } => {
            if !bound.contains(task) {
                free.insert(task.clone());
            }
        }
        IrStmt::Workflow { steps, .. } => {
            for step in steps {
                free_vars_in_stmt(&step.body, &mut bound.clone(), free);
                if let Some(compensate) = &step.compensate {
                    free_vars_in_stmt(compensate, &mut bound.clone(), free);
                }
            }
        }
        IrStmt::Block { statements, .. } | IrStmt::Scope { statements, .. } => {
            let mut local = bound.clone();
            for stmt in statements {
                free_vars_in_stmt(stmt, &mut local, free);
            }
        }
    }
}

fn bind_pattern(pattern: &IrPattern, bound: &mut BTreeSet<String>) {
    match pattern {
        IrPattern::PatternName(name) => {
            bound.insert(name.clone());
        }
        IrPattern::PatternCtor { fields, .. } => {
            for field in fields {
                bind_pattern(field, bound);
            }
        }
        IrPattern::PatternNull | IrPattern::PatternInt(_) => {}
    }
}

fn free_vars_in_expr(expr: &IrExpr, bound: &BTreeSet<String>, free: &mut BTreeSet<String>) {
    match expr {
        IrExpr::Name { name, .. } => {
            // A qualified callee (`Http.get`) is not a variable reference.
            if !name.contains('.') && !bound.contains(name) {
                free.insert(name.clone());
            }
        }
        IrExpr::Call { callee, args, .. } => {
            free_vars_in_expr(callee, bound, free);
            for arg in args {
                free_vars_in_expr(arg, bound, free);
            }
        }
        IrExpr::Construct { fields, .. } => {
            for (_, value) in fields {
                free_vars_in_expr(value, bound, free);
            }
        }
        IrExpr::Ok { inner, .. }
        | IrExpr::Err { inner, .. }
        | IrExpr::Some { inner, .. }
        | IrExpr::Await { inner, .. } => free_vars_in_expr(inner, bound, free),
        // A nested lambda already knows its own captures; anything it
        // pulls from this scope still needs to flow outward.
        IrExpr::Lambda { captures, .. } => {
            for name in captures {
                if !bound.contains(name) {
                    free.insert(name.clone());
                }
            }
        }
        IrExpr::Bool { .. }
        | IrExpr::Int { .. }
        | IrExpr::Long { .. }
        | IrExpr::Double { .. }
        | IrExpr::String { .. }
        | IrExpr::Null { .. }
        | IrExpr::None { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnl_base::Interner;
    use cnl_lexicon::Lexicon;

    fn lower_source(source: &str) -> IrModule {
        let lexicon = Lexicon::en_us();
        let mut interner = Interner::new();
        let lexed = crate::lexer::lex(source, &lexicon, &mut interner).expect("lex should succeed");
        let module = crate::parser::parse(lexed.tokens, &interner, "test").expect("parse should succeed");
        lower(&module)
    }

    #[test]
    fn list_literal_lowers_to_an_indexed_construct() {
        let module = lower_source("to f():\n  return [1, 2].\n");
        match &module.decls[0] {
            IrDecl::Func(f) => match &f.body {
                IrStmt::Block { statements, .. } => match &statements[0] {
                    IrStmt::Return { value: Some(IrExpr::Construct { type_name, fields, .. }), .. } => {
                        assert_eq!(type_name, "List");
                        assert_eq!(fields[0].0, "0");
                        assert_eq!(fields[1].0, "1");
                    }
                    other => panic!("expected Return(Construct), got {other:?}"),
                },
                other => panic!("expected Block, got {other:?}"),
            },
            other => panic!("expected Func, got {other:?}"),
        }
    }

    #[test]
    fn nested_block_lowers_to_scope_not_block() {
        let module = lower_source("to f(flag):\n  if flag then:\n    return true.\n");
        match &module.decls[0] {
            IrDecl::Func(f) => match &f.body {
                IrStmt::Block { statements, .. } => match &statements[0] {
                    IrStmt::If { then_branch, .. } => {
                        assert!(matches!(then_branch.as_ref(), IrStmt::Scope { .. }));
                    }
                    other => panic!("expected If, got {other:?}"),
                },
                other => panic!("expected Block, got {other:?}"),
            },
            other => panic!("expected Func, got {other:?}"),
        }
    }

    #[test]
    fn workflow_step_without_explicit_dependency_depends_on_predecessor() {
        let module = lower_source(
            "to f():\n  workflow:\n    step first:\n      return true.\n    step second:\n      return true.\n",
        );
        match &module.decls[0] {
            IrDecl::Func(f) => match &f.body {
                IrStmt::Block { statements, .. } => match &statements[0] {
                    IrStmt::Workflow { steps, .. } => {
                        assert_eq!(steps[0].depends_on, Vec::<String>::new());
                        assert_eq!(steps[1].depends_on, vec!["first".to_string()]);
                    }
                    other => panic!("expected Workflow, got {other:?}"),
                },
                other => panic!("expected Block, got {other:?}"),
            },
            other => panic!("expected Func, got {other:?}"),
        }
    }

    #[test]
    fn capability_is_inferred_from_a_qualified_call_prefix() {
        let module = lower_source("to f(url):\n  return Http.get(url).\n");
        match &module.decls[0] {
            IrDecl::Func(f) => {
                let mut caps = BTreeSet::new();
                infer_capabilities(&f.body, &mut caps);
                assert!(caps.contains("Http"));
            }
            other => panic!("expected Func, got {other:?}"),
        }
    }
}

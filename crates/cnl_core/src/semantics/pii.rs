//! PII taint-flow checker.
//!
//! Tracks a `(level, categories)` label through expression evaluation and
//! flags assignments and sink calls that would let a higher-sensitivity
//! value flow somewhere it shouldn't.

use std::collections::{BTreeMap, HashMap};

use cnl_base::Diagnostic;

use crate::codes::ErrorCode;
use crate::ir::{IrExpr, IrFunc, IrMatchArm, IrStmt, IrType, PiiLevel, PiiMeta};

type Env = HashMap<String, Option<PiiMeta>>;

const SANITIZERS: &[&str] = &["redact", "tokenize"];
const CONSOLE_SINKS: &[&str] = &["console", "print", "log"];
const EMIT_SINKS: &[&str] = &["emit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sink {
    Console,
    Emit,
    Network,
    Database,
}

fn classify_sink(name: &str) -> Option<Sink> {
    if CONSOLE_SINKS.contains(&name) {
        return Some(Sink::Console);
    }
    if EMIT_SINKS.contains(&name) {
        return Some(Sink::Emit);
    }
    let prefix = name.split('.').next()?;
    match prefix {
        "Http" => Some(Sink::Network),
        "Sql" | "Db" => Some(Sink::Database),
        _ => None,
    }
}

/// `target ← value` assignment compatibility. Returns the diagnostic code
/// to raise, if any, plus whether it is a hard error (vs. a warning the
/// caller may still choose to surface).
fn assignment_diagnostic(target: &Option<PiiMeta>, value: &Option<PiiMeta>) -> Option<(ErrorCode, String)> {
    match (target, value) {
        (None, Some(_)) => Some((
            ErrorCode::PiiAssignDowngrade,
            "assigning a labeled value to an unlabeled target drops its PII label".to_string(),
        )),
        (Some(_), None) => Some((
            ErrorCode::PiiImplicitUplevel,
            "assigning an unlabeled value to a labeled target implicitly upgrades it".to_string(),
        )),
        (Some(t), Some(v)) => {
            if t.categories != v.categories {
                Some((ErrorCode::PiiArgViolation, format!(
                    "category mismatch: target expects {:?}, value carries {:?}",
                    t.categories, v.categories
                )))
            } else if v.level > t.level {
                Some((ErrorCode::PiiArgViolation, format!(
                    "value is more sensitive ({:?}) than its target ({:?})",
                    v.level, t.level
                )))
            } else if v.level < t.level {
                Some((ErrorCode::PiiImplicitUplevel, format!(
                    "value is less sensitive ({:?}) than its target ({:?})",
                    v.level, t.level
                )))
            } else {
                None
            }
        }
        (None, None) => None,
    }
}

pub struct PiiChecker<'a> {
    signatures: &'a HashMap<String, PiiSignature>,
    diagnostics: Vec<Diagnostic>,
    cache: BTreeMap<(String, String), bool>,
}

#[derive(Debug, Clone, Default)]
pub struct PiiSignature {
    pub params: Vec<Option<PiiMeta>>,
    pub ret: Option<PiiMeta>,
}

pub fn collect_signatures(module: &crate::ir::IrModule) -> HashMap<String, PiiSignature> {
    let mut signatures = HashMap::new();
    for decl in &module.decls {
        if let crate::ir::IrDecl::Func(func) = decl {
            let params = func.params.iter().map(|p| pii_of_type(&p.ty)).collect();
            signatures.insert(
                func.name.clone(),
                PiiSignature { params, ret: pii_of_type(&func.ret) },
            );
        }
    }
    signatures
}

fn pii_of_type(ty: &IrType) -> Option<PiiMeta> {
    match ty {
        IrType::PiiType { sensitivity, category, base_type } => {
            let here = PiiMeta::new(*sensitivity, [category.clone()]);
            PiiMeta::merge(Some(&here), pii_of_type(base_type).as_ref())
        }
        IrType::Maybe(inner) | IrType::Option(inner) | IrType::List(inner) => pii_of_type(inner),
        _ => None,
    }
}

impl<'a> PiiChecker<'a> {
    pub fn new(signatures: &'a HashMap<String, PiiSignature>) -> Self {
        Self { signatures, diagnostics: Vec::new(), cache: BTreeMap::new() }
    }

    pub fn check_function(mut self, func: &IrFunc) -> Vec<Diagnostic> {
        let mut env: Env = HashMap::new();
        for param in &func.params {
            env.insert(param.name.clone(), pii_of_type(&param.ty));
        }
        self.check_stmt(&func.body, &mut env);
        self.diagnostics
    }

    fn check_stmt(&mut self, stmt: &IrStmt, env: &mut Env) {
        match stmt {
            IrStmt::Let { name, value, span, .. } => {
                let value_meta = self.eval(value, env, span);
                env.insert(name.clone(), value_meta);
            }
            IrStmt::Set { name, value, span } => {
                let value_meta = self.eval(value, env, span);
                let target_meta = env.get(name).cloned().unwrap_or(None);
                self.report_assignment(&target_meta, &value_meta, span);
                env.insert(name.clone(), value_meta);
            }
            IrStmt::Return { value, span } => {
                if let Some(v) = value {
                    self.eval(v, env, span);
                }
            }
            IrStmt::If { cond, then_branch, else_branch, span } => {
                self.eval(cond, env, span);
                let mut then_env = env.clone();
                self.check_stmt(then_branch, &mut then_env);
                let mut else_env = env.clone();
                if let Some(e) = else_branch {
                    self.check_stmt(e, &mut else_env);
                }
                *env = merge_envs(&then_env, &else_env);
            }
            IrStmt::Match { scrutinee, arms, span } => {
                self.eval(scrutinee, env, span);
                let mut branch_envs = Vec::new();
                for arm in arms {
                    let mut arm_env = env.clone();
                    self.check_match_arm(arm, &mut arm_env);
                    branch_envs.push(arm_env);
                }
                if let Some(first) = branch_envs.first().cloned() {
                    *env = branch_envs.into_iter().fold(first, |acc, e| merge_envs(&acc, &e));
                }
            }
            IrStmt::Start { value, span, .. } => {
                self.eval(value, env, span);
            }
            IrStmt::Wait { .. } => {}
            IrStmt::Workflow { steps, .. } => {
                for step in steps {
                    self.check_stmt(&step.body, env);
                    if let Some(c) = &step.compensate {
                        self.check_stmt(c, env);
                    }
                }
            }
            IrStmt::Block { statements, .. } | IrStmt::Scope { statements, .. } => {
                for s in statements {
                    self.check_stmt(s, env);
                }
            }
        }
    }

    fn check_match_arm(&mut self, arm: &IrMatchArm, env: &mut Env) {
        bind_pattern(&arm.pattern, env);
        self.eval(&arm.body, env, &arm.span);
    }

    fn report_assignment(&mut self, target: &Option<PiiMeta>, value: &Option<PiiMeta>, span: &cnl_base::Span) {
        let key = (format!("{target:?}"), format!("{value:?}"));
        if self.cache.contains_key(&key) {
            return;
        }
        if let Some((code, message)) = assignment_diagnostic(target, value) {
            self.diagnostics.push(code.diagnostic(message).with_span(span.clone()));
            self.cache.insert(key, true);
        } else {
            self.cache.insert(key, false);
        }
    }

    fn eval(&mut self, expr: &IrExpr, env: &mut Env, span: &cnl_base::Span) -> Option<PiiMeta> {
        match expr {
            IrExpr::Bool { .. }
            | IrExpr::Int { .. }
            | IrExpr::Long { .. }
            | IrExpr::Double { .. }
            | IrExpr::String { .. }
            | IrExpr::Null { .. }
            | IrExpr::None { .. } => None,
            IrExpr::Name { name, .. } => env.get(name).cloned().unwrap_or(None),
            IrExpr::Ok { inner, .. }
            | IrExpr::Err { inner, .. }
            | IrExpr::Some { inner, .. }
            | IrExpr::Await { inner, .. } => self.eval(inner, env, span),
            IrExpr::Construct { fields, .. } => fields
                .iter()
                .map(|(_, v)| self.eval(v, env, span))
                .fold(None, |acc, m| PiiMeta::merge(acc.as_ref(), m.as_ref())),
            IrExpr::Lambda { params, body, .. } => {
                let mut lambda_env: Env = params.iter().map(|p| (p.name.clone(), pii_of_type(&p.ty))).collect();
                self.check_stmt(body, &mut lambda_env);
                None
            }
            IrExpr::Call { callee, args, .. } => self.eval_call(callee, args, env, span),
        }
    }

    fn eval_call(&mut self, callee: &IrExpr, args: &[IrExpr], env: &mut Env, span: &cnl_base::Span) -> Option<PiiMeta> {
        let arg_metas: Vec<Option<PiiMeta>> = args.iter().map(|a| self.eval(a, env, span)).collect();

        let IrExpr::Name { name, .. } = callee else {
            return arg_metas.into_iter().fold(None, |acc, m| PiiMeta::merge(acc.as_ref(), m.as_ref()));
        };

        if SANITIZERS.contains(&name.as_str()) {
            let input = arg_metas.into_iter().next().flatten();
            return input.map(|meta| PiiMeta::new(PiiLevel::L1, meta.categories));
        }

        if let Some(sink) = classify_sink(name) {
            self.check_sink(sink, &arg_metas, args, span);
        }

        match self.signatures.get(name) {
            Some(signature) => {
                for (param_meta, arg_meta) in signature.params.iter().zip(arg_metas.iter()) {
                    self.report_assignment(param_meta, arg_meta, span);
                }
                signature.ret.clone()
            }
            None => arg_metas.into_iter().fold(None, |acc, m| PiiMeta::merge(acc.as_ref(), m.as_ref())),
        }
    }

    fn check_sink(&mut self, sink: Sink, arg_metas: &[Option<PiiMeta>], args: &[IrExpr], span: &cnl_base::Span) {
        let sensitive_index = match sink {
            Sink::Network => 1,
            _ => 0,
        };
        let Some(meta) = arg_metas.get(sensitive_index) else { return };
        let is_unknown_name = matches!(args.get(sensitive_index), Some(IrExpr::Name { .. }));

        match meta {
            None => {
                if is_unknown_name {
                    self.diagnostics.push(
                        ErrorCode::PiiSinkUnknown
                            .diagnostic("sink argument has no known PII label".to_string())
                            .with_span(span.clone()),
                    );
                }
            }
            Some(m) => {
                if m.level == PiiLevel::L3 || (sink == Sink::Console && m.level == PiiLevel::L2) {
                    self.diagnostics.push(
                        ErrorCode::PiiSinkUnsanitized
                            .diagnostic(format!("sink receives unsanitized {:?} data", m.level))
                            .with_span(span.clone()),
                    );
                }
            }
        }
    }
}

fn bind_pattern(pattern: &crate::ir::IrPattern, env: &mut Env) {
    use crate::ir::IrPattern;
    match pattern {
        IrPattern::PatternName(name) => {
            env.insert(name.clone(), None);
        }
        IrPattern::PatternCtor { fields, .. } => {
            for field in fields {
                bind_pattern(field, env);
            }
        }
        IrPattern::PatternNull | IrPattern::PatternInt(_) => {}
    }
}

fn merge_envs(a: &Env, b: &Env) -> Env {
    let mut merged = a.clone();
    for (name, b_meta) in b {
        let combined = match merged.get(name) {
            Some(a_meta) => PiiMeta::merge(a_meta.as_ref(), b_meta.as_ref()),
            None => b_meta.clone(),
        };
        merged.insert(name.clone(), combined);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnl_base::{Interner, Span};
    use cnl_lexicon::Lexicon;

    fn check_source(source: &str) -> Vec<Diagnostic> {
        let lexicon = Lexicon::en_us();
        let mut interner = Interner::new();
        let lexed = crate::lexer::lex(source, &lexicon, &mut interner).unwrap();
        let module = crate::parser::parse(lexed.tokens, &interner, "test").unwrap();
        let ir_module = crate::ir::lower(&module);
        let signatures = collect_signatures(&ir_module);
        let mut diagnostics = Vec::new();
        for decl in &ir_module.decls {
            if let crate::ir::IrDecl::Func(func) = decl {
                diagnostics.extend(PiiChecker::new(&signatures).check_function(func));
            }
        }
        diagnostics
    }

    #[test]
    fn redact_downgrades_to_l1_preserving_category() {
        let meta = PiiMeta::new(PiiLevel::L3, ["email".to_string()]);
        let downgraded = PiiMeta::new(PiiLevel::L1, meta.categories.clone());
        assert_eq!(downgraded.level, PiiLevel::L1);
        assert_eq!(downgraded.categories, meta.categories);
    }

    #[test]
    fn sink_receiving_an_unlabeled_name_is_unknown() {
        let diagnostics = check_source("to f(user):\n  return console(user).\n");
        assert!(diagnostics.iter().any(|d| d.code == ErrorCode::PiiSinkUnknown.as_str()));
    }

    #[test]
    fn console_sink_with_l2_data_is_unsanitized() {
        let signatures = HashMap::new();
        let mut checker = PiiChecker::new(&signatures);
        let mut env: Env = HashMap::new();
        env.insert("ssn".into(), Some(PiiMeta::new(PiiLevel::L2, ["ssn".to_string()])));
        let call = IrExpr::Call {
            callee: Box::new(IrExpr::Name { name: "console".into(), span: Span::synthetic() }),
            args: vec![IrExpr::Name { name: "ssn".into(), span: Span::synthetic() }],
            span: Span::synthetic(),
        };
        checker.eval(&call, &mut env, &Span::synthetic());
        assert!(checker.diagnostics.iter().any(|d| d.code == ErrorCode::PiiSinkUnsanitized.as_str()));
    }
}

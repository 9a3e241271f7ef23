//! Async discipline: every `start`ed task must be `wait`ed on exactly once,
//! and every `wait` must name a task that was actually started.

use std::collections::HashMap;

use cnl_base::{Diagnostic, Span};

use crate::codes::ErrorCode;
use crate::ir::{IrFunc, IrStmt};

#[derive(Debug, Default, Clone)]
struct TaskUses {
    starts: HashMap<String, Vec<Span>>,
    waits: HashMap<String, Vec<Span>>,
}

impl TaskUses {
    fn record_start(&mut self, task: &str, span: &Span) {
        self.starts.entry(task.to_string()).or_default().push(span.clone());
    }

    fn record_wait(&mut self, task: &str, span: &Span) {
        self.waits.entry(task.to_string()).or_default().push(span.clone());
    }
}

fn collect(stmt: &IrStmt, uses: &mut TaskUses) {
    match stmt {
        IrStmt::Start { task, span, .. } => uses.record_start(task, span),
        IrStmt::Wait { task, span } => uses.record_wait(task, span),
        IrStmt::If { then_branch, else_branch, .. } => {
            collect(then_branch, uses);
            if let Some(e) = else_branch {
                collect(e, uses);
            }
        }
        IrStmt::Match { arms, .. } => {
            // Match arms carry expression bodies, not statements — no
            // start/wait can appear directly in an arm.
            let _ = arms;
        }
        IrStmt::Workflow { steps, .. } => {
            for step in steps {
                collect(&step.body, uses);
                if let Some(c) = &step.compensate {
                    collect(c, uses);
                }
            }
        }
        IrStmt::Block { statements, .. } | IrStmt::Scope { statements, .. } => {
            for s in statements {
                collect(s, uses);
            }
        }
        IrStmt::Let { .. } | IrStmt::Set { .. } | IrStmt::Return { .. } => {}
    }
}

/// Checks one function's start/wait discipline over its whole body.
pub fn check_function(func: &IrFunc) -> Vec<Diagnostic> {
    let mut uses = TaskUses::default();
    collect(&func.body, &mut uses);
    let mut diagnostics = Vec::new();

    for (task, spans) in &uses.starts {
        if spans.len() > 1 {
            diagnostics.push(
                ErrorCode::AsyncDuplicateStart
                    .diagnostic(format!("task `{task}` is started more than once"))
                    .with_span(spans[1].clone()),
            );
        }
        if !uses.waits.contains_key(task) {
            diagnostics.push(
                ErrorCode::AsyncStartNotWaited
                    .diagnostic(format!("task `{task}` is started but never waited on"))
                    .with_span(spans[0].clone()),
            );
        }
    }

    for (task, spans) in &uses.waits {
        if spans.len() > 1 {
            diagnostics.push(
                ErrorCode::AsyncDuplicateWait
                    .diagnostic(format!("task `{task}` is waited on more than once"))
                    .with_span(spans[1].clone()),
            );
        }
        if !uses.starts.contains_key(task) {
            diagnostics.push(
                ErrorCode::AsyncWaitNotStarted
                    .diagnostic(format!("task `{task}` is waited on but never started"))
                    .with_span(spans[0].clone()),
            );
        }
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
        let mut diagnostics = Vec::new();
        for decl in &ir_module.decls {
            if let crate::ir::IrDecl::Func(func) = decl {
                diagnostics.extend(check_function(func));
            }
        }
        diagnostics
    }

    #[test]
    fn started_task_that_is_never_waited_is_flagged() {
        let diagnostics = check_source("to f():\n  start fetch as 1.\n  return true.\n");
        assert!(diagnostics.iter().any(|d| d.code == ErrorCode::AsyncStartNotWaited.as_str()));
    }

    #[test]
    fn waited_task_that_was_never_started_is_flagged() {
        let diagnostics = check_source("to f():\n  wait fetch.\n  return true.\n");
        assert!(diagnostics.iter().any(|d| d.code == ErrorCode::AsyncWaitNotStarted.as_str()));
    }

    #[test]
    fn started_then_waited_once_each_is_clean() {
        let diagnostics = check_source("to f():\n  start fetch as 1.\n  wait fetch.\n  return true.\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn starting_the_same_task_twice_is_a_duplicate_start() {
        let mut uses = TaskUses::default();
        uses.record_start("fetch", &Span::synthetic());
        uses.record_start("fetch", &Span::synthetic());
        assert_eq!(uses.starts["fetch"].len(), 2);
    }

    #[test]
    fn waiting_the_same_task_twice_is_only_a_warning() {
        assert_eq!(ErrorCode::AsyncDuplicateWait.severity(), cnl_base::Severity::Warning);
    }
}

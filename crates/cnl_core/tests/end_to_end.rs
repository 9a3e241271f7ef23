//! End-to-end scenarios exercising the full `compile` pipeline:
//! canonicalize → lex → parse → lower → check.

use cnl_core::{compile, ErrorCode, Lexicon};

fn codes_of(diagnostics: &[cnl_core::Diagnostic]) -> Vec<&str> {
    diagnostics.iter().map(|d| d.code).collect()
}

/// S1 — a Chinese-locale module canonicalizes to English keywords and
/// compiles clean: the module declaration and the string literal both
/// survive, and there are no diagnostics.
#[test]
fn s1_chinese_source_canonicalizes_and_compiles_clean() {
    let lex = Lexicon::zh_cn();
    let canonical = cnl_core::canonicalize_source("【模块】测试。\n定义 f()：\n  返回「你好」。\n", &lex, None);
    assert!(canonical.starts_with("this module is 测试."));
    assert!(canonical.contains("\"你好\""));

    let en = Lexicon::en_us();
    let (module, diagnostics) = compile(&canonical, &en, "test").expect("compiles");
    assert_eq!(module.name, "测试");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

/// S2 — a function declared to produce `Int` whose body returns a string
/// literal is a return-type mismatch.
#[test]
fn s2_return_type_mismatch_is_flagged() {
    let lex = Lexicon::en_us();
    let (_, diagnostics) = compile("to bad() produce Int:\n  return \"oops\".\n", &lex, "test").unwrap();
    assert!(codes_of(&diagnostics).contains(&ErrorCode::ReturnTypeMismatch.as_str()));
}

/// S3 — an `io` function called from a `pure` caller propagates a missing
/// effect diagnostic to the caller; declaring `io` on the caller clears it.
#[test]
fn s3_missing_effect_propagates_across_call_and_clears_once_declared() {
    let lex = Lexicon::en_us();
    let source = "\
to ioOperation() it performs io:
  return Http.get().
to caller():
  return ioOperation().
";
    let (_, diagnostics) = compile(source, &lex, "test").unwrap();
    let caller_diags: Vec<_> = diagnostics.iter().filter(|d| d.code == "EFF_MISSING_IO").collect();
    assert_eq!(caller_diags.len(), 1, "{diagnostics:?}");

    let fixed = "\
to ioOperation() it performs io:
  return Http.get().
to caller() it performs io:
  return ioOperation().
";
    let (_, diagnostics) = compile(fixed, &lex, "test").unwrap();
    assert!(!diagnostics.iter().any(|d| d.code == "EFF_MISSING_IO"), "{diagnostics:?}");
}

/// S4 — an `L3`-annotated parameter passed straight to a network sink is
/// unsanitized; routing it through `redact` first clears the diagnostic.
#[test]
fn s4_unsanitized_pii_reaches_a_sink_and_redact_clears_it() {
    let lex = Lexicon::en_us();
    let source = "to send(user: @pii(L3, email) Text) it performs io:\n  return Http.post(\"/users\", user).\n";
    let (_, diagnostics) = compile(source, &lex, "test").unwrap();
    assert!(codes_of(&diagnostics).contains(&ErrorCode::PiiSinkUnsanitized.as_str()), "{diagnostics:?}");

    let sanitized = "to send(user: @pii(L3, email) Text) it performs io:\n  return Http.post(\"/users\", redact(user)).\n";
    let (_, diagnostics) = compile(sanitized, &lex, "test").unwrap();
    assert!(!diagnostics.iter().any(|d| d.code == "PII_SINK_UNSANITIZED"), "{diagnostics:?}");
}

/// S5 — starting a task without ever waiting on it is flagged by name.
#[test]
fn s5_started_task_never_waited_is_flagged() {
    let lex = Lexicon::en_us();
    let source = "to f() it performs async:\n  start taskA as 1.\n  return true.\n";
    let (_, diagnostics) = compile(source, &lex, "test").unwrap();
    let hits: Vec<_> = diagnostics.iter().filter(|d| d.code == "ASYNC_START_NOT_WAITED").collect();
    assert_eq!(hits.len(), 1, "{diagnostics:?}");
    assert!(hits[0].message.contains("taskA"));
}

/// S6 — a workflow step that exercises a capability the enclosing function
/// never declared is flagged, naming the step and the capability.
#[test]
fn s6_workflow_step_uses_an_undeclared_capability() {
    let lex = Lexicon::en_us();
    let source = "\
to run() it performs io [Sql]:
  workflow:
    step fetch:
      return Http.get(1).
";
    let (_, diagnostics) = compile(source, &lex, "test").unwrap();
    let hit = diagnostics
        .iter()
        .find(|d| d.code == "WORKFLOW_UNDECLARED_CAPABILITY")
        .unwrap_or_else(|| panic!("{diagnostics:?}"));
    assert!(hit.message.contains("fetch"));
    assert!(hit.message.contains("Http"));
}

//! Implicit type inference rule tables used by the parser's AST builder.
//!
//! A parameter, field, or return type left unannotated is assigned a type by
//! matching its name against a small set of priority-ordered rules rather
//! than defaulting blindly — `isValid` is `Bool`, not `Text`, because the
//! boolean-prefix rule outranks the id-suffix rule.

use crate::ast::{Param, Type};

struct Rule {
    priority: u8,
    matches: fn(&str) -> bool,
    type_name: &'static str,
}

fn starts_with_any(name: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| {
        name.len() > p.len()
            && name.starts_with(p)
            && name.as_bytes()[p.len()].is_ascii_uppercase()
    })
}

fn ends_with_any(name: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|s| name.ends_with(s) && name.len() > s.len())
}

const BOOL_PREFIXES: &[&str] = &["is", "has", "can", "should", "was"];
const ID_SUFFIXES: &[&str] = &["Id", "Code", "Key", "Token", "Uuid", "Vin"];
const MONEY_SUFFIXES: &[&str] = &["Amount", "Price", "Cost", "Total", "Fee"];
const COUNT_SUFFIXES: &[&str] = &["Count", "Number", "Qty", "Minutes", "Seconds", "Hours", "Days"];
const DATE_SUFFIXES: &[&str] = &["Date", "Time", "At"];

const PARAM_RULES: &[Rule] = &[
    Rule { priority: 4, matches: |n| starts_with_any(n, BOOL_PREFIXES), type_name: "Bool" },
    Rule { priority: 3, matches: |n| ends_with_any(n, ID_SUFFIXES), type_name: "Text" },
    Rule { priority: 3, matches: |n| ends_with_any(n, MONEY_SUFFIXES), type_name: "Float" },
    Rule { priority: 2, matches: |n| ends_with_any(n, COUNT_SUFFIXES), type_name: "Int" },
    Rule { priority: 2, matches: |n| ends_with_any(n, DATE_SUFFIXES), type_name: "DateTime" },
];

/// Assigns an implicit type to a parameter or field by name, per the
/// priority-ordered rule table (boolean prefix beats id suffix).
pub fn infer_param_type(name: &str) -> Type {
    let mut best: Option<&Rule> = None;
    for rule in PARAM_RULES {
        if (rule.matches)(name) {
            if best.map(|b| rule.priority > b.priority).unwrap_or(true) {
                best = Some(rule);
            }
        }
    }
    Type::text(best.map(|r| r.type_name).unwrap_or("Text"))
}

const GENERATOR_PREFIXES: &[&str] = &["generate", "create", "build"];
const CALC_PREFIXES: &[&str] = &["calculate", "compute", "count"];

/// Assigns an implicit return type from the function name.
pub fn infer_return_type(name: &str) -> Type {
    if starts_with_any(name, BOOL_PREFIXES) {
        return Type::text("Bool");
    }
    if let Some(prefix) = GENERATOR_PREFIXES.iter().find(|p| starts_with_any(name, &[p])) {
        let rest = &name[prefix.len()..];
        return Type::text(capitalize(rest));
    }
    if starts_with_any(name, CALC_PREFIXES) {
        return Type::text("Int");
    }
    Type::text("Text")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Single uppercase-letter-led identifiers that are neither a built-in type
/// nor declared at module level look like type variables.
fn looks_like_type_variable(name: &str) -> bool {
    const BUILTINS: &[&str] = &["Bool", "Text", "Int", "Long", "Double", "Float", "DateTime"];
    if BUILTINS.contains(&name) {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_uppercase() => chars.next().map(|c| !c.is_lowercase()).unwrap_or(true),
        _ => false,
    }
}

fn collect_type_var_names(ty: &Type, out: &mut Vec<String>) {
    match ty {
        Type::TypeName(name) | Type::TypeVar(name) => {
            if looks_like_type_variable(name) && !out.contains(name) {
                out.push(name.clone());
            }
        }
        Type::TypeApp { args, .. } => args.iter().for_each(|a| collect_type_var_names(a, out)),
        Type::Result { ok, err } => {
            collect_type_var_names(ok, out);
            collect_type_var_names(err, out);
        }
        Type::Maybe(inner) | Type::Option(inner) | Type::List(inner) => collect_type_var_names(inner, out),
        Type::Map { key, value } => {
            collect_type_var_names(key, out);
            collect_type_var_names(value, out);
        }
        Type::FuncType { params, ret } => {
            params.iter().for_each(|p| collect_type_var_names(p, out));
            collect_type_var_names(ret, out);
        }
        Type::Annotated { inner, .. } => collect_type_var_names(inner, out),
    }
}

/// Scans parameter and return types for names that look like type
/// variables, in first-occurrence order, when no explicit `of T and U`
/// clause supplied the function's type parameters.
pub fn promote_type_params(params: &[Param], ret: &Type) -> Vec<String> {
    let mut names = Vec::new();
    for param in params {
        collect_type_var_names(&param.ty, &mut names);
    }
    collect_type_var_names(ret, &mut names);
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnl_base::Span;

    #[test]
    fn boolean_prefix_outranks_id_suffix() {
        assert_eq!(infer_param_type("isValid"), Type::text("Bool"));
    }

    #[test]
    fn id_suffix_maps_to_text() {
        assert_eq!(infer_param_type("driverId"), Type::text("Text"));
    }

    #[test]
    fn money_suffix_maps_to_float() {
        assert_eq!(infer_param_type("totalAmount"), Type::text("Float"));
    }

    #[test]
    fn count_suffix_maps_to_int() {
        assert_eq!(infer_param_type("retryCount"), Type::text("Int"));
    }

    #[test]
    fn unmatched_name_defaults_to_text() {
        assert_eq!(infer_param_type("driver"), Type::text("Text"));
    }

    #[test]
    fn generator_prefix_capitalizes_the_remainder() {
        assert_eq!(infer_return_type("generateQuote"), Type::text("Quote"));
    }

    #[test]
    fn calculation_prefix_maps_to_int() {
        assert_eq!(infer_return_type("calculateTotal"), Type::text("Int"));
    }

    #[test]
    fn boolean_prefixed_function_name_returns_bool() {
        assert_eq!(infer_return_type("isEligible"), Type::text("Bool"));
    }

    #[test]
    fn promotes_type_variables_in_first_occurrence_order() {
        let params = vec![
            Param { name: "a".into(), ty: Type::TypeName("T".into()), span: Span::synthetic() },
            Param { name: "b".into(), ty: Type::TypeName("U".into()), span: Span::synthetic() },
        ];
        let ret = Type::TypeName("T".into());
        assert_eq!(promote_type_params(&params, &ret), vec!["T".to_string(), "U".to_string()]);
    }
}

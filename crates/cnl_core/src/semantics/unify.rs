//! Structural unification over [`IrType`], used by the base type checker to
//! type calls to generic functions.

use std::collections::HashMap;

use crate::ir::IrType;

pub type Bindings = HashMap<String, IrType>;

/// Attempts to unify `pattern` (drawn from a function's declared signature,
/// may contain `TypeVar`s) against `concrete` (an argument's inferred
/// type), recording any variable bindings made along the way.
///
/// A free type variable unifies with any non-variable type by binding to
/// it, guarded by an occurs-check so `T` cannot bind to `List of T`. Two
/// variables unify by union: whichever is already bound constrains the
/// other; otherwise the first becomes an alias for the second.
pub fn unify(pattern: &IrType, concrete: &IrType, bindings: &mut Bindings) -> bool {
    match (pattern, concrete) {
        (IrType::TypeVar(name), other) | (other, IrType::TypeVar(name)) => {
            unify_var(name, other, bindings)
        }
        (IrType::TypeName(a), IrType::TypeName(b)) => a == b,
        (IrType::TypeApp { name: n1, args: a1 }, IrType::TypeApp { name: n2, args: a2 }) => {
            n1 == n2 && a1.len() == a2.len() && a1.iter().zip(a2).all(|(x, y)| unify(x, y, bindings))
        }
        (IrType::Result { ok: o1, err: e1 }, IrType::Result { ok: o2, err: e2 }) => {
            unify(o1, o2, bindings) && unify(e1, e2, bindings)
        }
        (IrType::Maybe(a), IrType::Maybe(b))
        | (IrType::Option(a), IrType::Option(b))
        | (IrType::List(a), IrType::List(b)) => unify(a, b, bindings),
        (IrType::Map { key: k1, value: v1 }, IrType::Map { key: k2, value: v2 }) => {
            unify(k1, k2, bindings) && unify(v1, v2, bindings)
        }
        (IrType::FuncType { params: p1, ret: r1 }, IrType::FuncType { params: p2, ret: r2 }) => {
            p1.len() == p2.len()
                && p1.iter().zip(p2).all(|(x, y)| unify(x, y, bindings))
                && unify(r1, r2, bindings)
        }
        (
            IrType::PiiType { base_type: b1, sensitivity: s1, category: c1 },
            IrType::PiiType { base_type: b2, sensitivity: s2, category: c2 },
        ) => s1 == s2 && c1 == c2 && unify(b1, b2, bindings),
        // A PII-annotated argument still unifies against its bare base
        // type — the checker that cares about sensitivity is the PII
        // checker, not the base type checker.
        (IrType::PiiType { base_type, .. }, other) | (other, IrType::PiiType { base_type, .. }) => {
            unify(base_type, other, bindings)
        }
        _ => false,
    }
}

fn unify_var(name: &str, other: &IrType, bindings: &mut Bindings) -> bool {
    if let IrType::TypeVar(other_name) = other {
        if other_name == name {
            return true;
        }
    }
    if let Some(bound) = bindings.get(name).cloned() {
        return unify(&bound, other, bindings);
    }
    if occurs(name, other, bindings) {
        return false;
    }
    bindings.insert(name.to_string(), other.clone());
    true
}

fn occurs(name: &str, ty: &IrType, bindings: &Bindings) -> bool {
    match ty {
        IrType::TypeVar(other) => {
            if other == name {
                true
            } else if let Some(bound) = bindings.get(other) {
                occurs(name, bound, bindings)
            } else {
                false
            }
        }
        IrType::TypeName(_) => false,
        IrType::TypeApp { args, .. } => args.iter().any(|a| occurs(name, a, bindings)),
        IrType::Result { ok, err } => occurs(name, ok, bindings) || occurs(name, err, bindings),
        IrType::Maybe(inner) | IrType::Option(inner) | IrType::List(inner) => occurs(name, inner, bindings),
        IrType::Map { key, value } => occurs(name, key, bindings) || occurs(name, value, bindings),
        IrType::FuncType { params, ret } => {
            params.iter().any(|p| occurs(name, p, bindings)) || occurs(name, ret, bindings)
        }
        IrType::PiiType { base_type, .. } => occurs(name, base_type, bindings),
    }
}

/// Replaces every bound `TypeVar` in `ty` with its binding, recursively.
pub fn substitute(ty: &IrType, bindings: &Bindings) -> IrType {
    match ty {
        IrType::TypeVar(name) => match bindings.get(name) {
            Some(bound) => substitute(bound, bindings),
            None => ty.clone(),
        },
        IrType::TypeName(_) => ty.clone(),
        IrType::TypeApp { name, args } => IrType::TypeApp {
            name: name.clone(),
            args: args.iter().map(|a| substitute(a, bindings)).collect(),
        },
        IrType::Result { ok, err } => IrType::Result {
            ok: Box::new(substitute(ok, bindings)),
            err: Box::new(substitute(err, bindings)),
        },
        IrType::Maybe(inner) => IrType::Maybe(Box::new(substitute(inner, bindings))),
        IrType::Option(inner) => IrType::Option(Box::new(substitute(inner, bindings))),
        IrType::List(inner) => IrType::List(Box::new(substitute(inner, bindings))),
        IrType::Map { key, value } => IrType::Map {
            key: Box::new(substitute(key, bindings)),
            value: Box::new(substitute(value, bindings)),
        },
        IrType::FuncType { params, ret } => IrType::FuncType {
            params: params.iter().map(|p| substitute(p, bindings)).collect(),
            ret: Box::new(substitute(ret, bindings)),
        },
        IrType::PiiType { base_type, sensitivity, category } => IrType::PiiType {
            base_type: Box::new(substitute(base_type, bindings)),
            sensitivity: *sensitivity,
            category: category.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_free_variable_binds_to_a_concrete_type() {
        let mut bindings = Bindings::new();
        assert!(unify(&IrType::TypeVar("T".into()), &IrType::TypeName("Int".into()), &mut bindings));
        assert_eq!(bindings.get("T"), Some(&IrType::TypeName("Int".into())));
    }

    #[test]
    fn occurs_check_rejects_a_self_referential_binding() {
        let mut bindings = Bindings::new();
        let list_of_t = IrType::List(Box::new(IrType::TypeVar("T".into())));
        assert!(!unify(&IrType::TypeVar("T".into()), &list_of_t, &mut bindings));
    }

    #[test]
    fn two_type_apps_unify_structurally_across_their_arguments() {
        let mut bindings = Bindings::new();
        let pattern = IrType::TypeApp { name: "Box".into(), args: vec![IrType::TypeVar("T".into())] };
        let concrete = IrType::TypeApp { name: "Box".into(), args: vec![IrType::TypeName("Text".into())] };
        assert!(unify(&pattern, &concrete, &mut bindings));
        assert_eq!(bindings.get("T"), Some(&IrType::TypeName("Text".into())));
    }

    #[test]
    fn substitute_replaces_bound_variables_recursively() {
        let mut bindings = Bindings::new();
        bindings.insert("T".into(), IrType::TypeName("Int".into()));
        let ty = IrType::List(Box::new(IrType::TypeVar("T".into())));
        assert_eq!(substitute(&ty, &bindings), IrType::List(Box::new(IrType::TypeName("Int".into()))));
    }
}

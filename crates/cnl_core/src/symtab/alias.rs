//! Type alias resolution.
//!
//! Aliases are dropped from the Core IR and resolved on demand instead, so
//! a checker asking "what is `UserId` really?" gets an answer without the
//! IR carrying a separate alias-lookup node everywhere a named type could
//! appear.

use std::collections::HashSet;

use crate::ir::IrType;

#[derive(Debug, Clone)]
struct AliasDef {
    type_params: Vec<String>,
    ty: IrType,
}

#[derive(Default)]
pub struct AliasTable {
    aliases: std::collections::HashMap<String, AliasDef>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self { aliases: std::collections::HashMap::new() }
    }

    pub fn define(&mut self, name: impl Into<String>, type_params: Vec<String>, ty: IrType) {
        self.aliases.insert(name.into(), AliasDef { type_params, ty });
    }

    /// Expands `ty` fully, substituting every alias reference it contains.
    /// A cycle (`type A = B.`, `type B = A.`) degrades to the unexpanded
    /// `TypeName` at the point the cycle closes, rather than looping
    /// forever or erroring — cycle detection is the checkers' job if it
    /// matters to them.
    pub fn resolve(&self, ty: &IrType) -> IrType {
        let mut visiting = HashSet::new();
        self.resolve_inner(ty, &mut visiting)
    }

    fn resolve_inner(&self, ty: &IrType, visiting: &mut HashSet<String>) -> IrType {
        match ty {
            IrType::TypeName(name) => {
                if let Some(def) = self.aliases.get(name) {
                    if visiting.contains(name) {
                        return ty.clone();
                    }
                    visiting.insert(name.clone());
                    let resolved = self.resolve_inner(&def.ty, visiting);
                    visiting.remove(name);
                    resolved
                } else {
                    ty.clone()
                }
            }
            IrType::TypeVar(_) => ty.clone(),
            IrType::TypeApp { name, args } => {
                let resolved_args: Vec<IrType> =
                    args.iter().map(|a| self.resolve_inner(a, visiting)).collect();
                if let Some(def) = self.aliases.get(name) {
                    if visiting.contains(name) {
                        return IrType::TypeApp { name: name.clone(), args: resolved_args };
                    }
                    visiting.insert(name.clone());
                    let substituted = substitute(&def.ty, &def.type_params, &resolved_args);
                    let resolved = self.resolve_inner(&substituted, visiting);
                    visiting.remove(name);
                    resolved
                } else {
                    IrType::TypeApp { name: name.clone(), args: resolved_args }
                }
            }
            IrType::Result { ok, err } => IrType::Result {
                ok: Box::new(self.resolve_inner(ok, visiting)),
                err: Box::new(self.resolve_inner(err, visiting)),
            },
            IrType::Maybe(inner) => IrType::Maybe(Box::new(self.resolve_inner(inner, visiting))),
            IrType::Option(inner) => IrType::Option(Box::new(self.resolve_inner(inner, visiting))),
            IrType::List(inner) => IrType::List(Box::new(self.resolve_inner(inner, visiting))),
            IrType::Map { key, value } => IrType::Map {
                key: Box::new(self.resolve_inner(key, visiting)),
                value: Box::new(self.resolve_inner(value, visiting)),
            },
            IrType::FuncType { params, ret } => IrType::FuncType {
                params: params.iter().map(|p| self.resolve_inner(p, visiting)).collect(),
                ret: Box::new(self.resolve_inner(ret, visiting)),
            },
            IrType::PiiType { base_type, sensitivity, category } => IrType::PiiType {
                base_type: Box::new(self.resolve_inner(base_type, visiting)),
                sensitivity: *sensitivity,
                category: category.clone(),
            },
        }
    }
}

/// Replaces each of `params[i]`'s occurrences as a `TypeVar` in `ty` with
/// `args[i]`, for a generic alias applied to concrete arguments.
fn substitute(ty: &IrType, params: &[String], args: &[IrType]) -> IrType {
    match ty {
        IrType::TypeVar(name) => params
            .iter()
            .position(|p| p == name)
            .and_then(|i| args.get(i))
            .cloned()
            .unwrap_or_else(|| ty.clone()),
        IrType::TypeName(_) => ty.clone(),
        IrType::TypeApp { name, args: inner_args } => IrType::TypeApp {
            name: name.clone(),
            args: inner_args.iter().map(|a| substitute(a, params, args)).collect(),
        },
        IrType::Result { ok, err } => IrType::Result {
            ok: Box::new(substitute(ok, params, args)),
            err: Box::new(substitute(err, params, args)),
        },
        IrType::Maybe(inner) => IrType::Maybe(Box::new(substitute(inner, params, args))),
        IrType::Option(inner) => IrType::Option(Box::new(substitute(inner, params, args))),
        IrType::List(inner) => IrType::List(Box::new(substitute(inner, params, args))),
        IrType::Map { key, value } => IrType::Map {
            key: Box::new(substitute(key, params, args)),
            value: Box::new(substitute(value, params, args)),
        },
        IrType::FuncType { params: fn_params, ret } => IrType::FuncType {
            params: fn_params.iter().map(|p| substitute(p, params, args)).collect(),
            ret: Box::new(substitute(ret, params, args)),
        },
        IrType::PiiType { base_type, sensitivity, category } => IrType::PiiType {
            base_type: Box::new(substitute(base_type, params, args)),
            sensitivity: *sensitivity,
            category: category.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_a_simple_alias_to_its_underlying_type() {
        let mut table = AliasTable::new();
        table.define("UserId", vec![], IrType::TypeName("Text".into()));
        let resolved = table.resolve(&IrType::TypeName("UserId".into()));
        assert_eq!(resolved, IrType::TypeName("Text".into()));
    }

    #[test]
    fn resolves_transitively_through_a_chain_of_aliases() {
        let mut table = AliasTable::new();
        table.define("A", vec![], IrType::TypeName("B".into()));
        table.define("B", vec![], IrType::TypeName("Text".into()));
        let resolved = table.resolve(&IrType::TypeName("A".into()));
        assert_eq!(resolved, IrType::TypeName("Text".into()));
    }

    #[test]
    fn a_cycle_degrades_to_the_unexpanded_name_instead_of_looping() {
        let mut table = AliasTable::new();
        table.define("A", vec![], IrType::TypeName("B".into()));
        table.define("B", vec![], IrType::TypeName("A".into()));
        let resolved = table.resolve(&IrType::TypeName("A".into()));
        assert_eq!(resolved, IrType::TypeName("A".into()));
    }

    #[test]
    fn substitutes_generic_type_parameters_on_application() {
        let mut table = AliasTable::new();
        table.define(
            "Box",
            vec!["T".to_string()],
            IrType::List(Box::new(IrType::TypeVar("T".into()))),
        );
        let applied = IrType::TypeApp { name: "Box".into(), args: vec![IrType::TypeName("Int".into())] };
        let resolved = table.resolve(&applied);
        assert_eq!(resolved, IrType::List(Box::new(IrType::TypeName("Int".into()))));
    }
}

//! Let-polymorphism: quantifying over free variables at `name = expr`
//! bindings and refreshing them at each use.

use std::collections::{BTreeMap, BTreeSet};

use flux_types::{
    FunctionType, RowType, RowVarId, Type, TypeScheme, TypeVarId, free_row_vars, free_type_vars,
};

use crate::Unifier;
use crate::env::Environment;

/// Quantify the variables of `ty` that are free after solving but not free
/// in `env`. Kind constraints on quantified variables move into the scheme.
pub fn generalize(ty: &Type, env: &Environment, unifier: &Unifier) -> TypeScheme {
    let ty = unifier.substitution.apply(ty);
    let (env_types, env_rows) = env.free_vars(&unifier.substitution);

    let type_vars: Vec<TypeVarId> = free_type_vars(&ty)
        .difference(&env_types)
        .copied()
        .collect();
    let row_vars: Vec<RowVarId> = free_row_vars(&ty)
        .difference(&env_rows)
        .copied()
        .collect();

    let mut kinds = BTreeMap::new();
    for &tv in &type_vars {
        if let Some(k) = unifier.kinds_of(tv)
            && !k.is_empty()
        {
            kinds.insert(tv, k.clone());
        }
    }

    TypeScheme {
        type_vars,
        row_vars,
        kinds,
        ty,
    }
}

/// Replace a scheme's quantified variables with fresh ones. Fresh type
/// variables inherit the kinds recorded in the scheme.
pub fn instantiate(scheme: &TypeScheme, unifier: &mut Unifier) -> Type {
    if scheme.is_mono() {
        return scheme.ty.clone();
    }

    let mut type_mapping = BTreeMap::new();
    for &tv in &scheme.type_vars {
        let kinds = scheme.kinds.get(&tv).cloned().unwrap_or_default();
        type_mapping.insert(tv, unifier.fresh_type_var_with_kinds(kinds));
    }

    let mut row_mapping = BTreeMap::new();
    for &rv in &scheme.row_vars {
        row_mapping.insert(rv, unifier.fresh_row_var());
    }

    rename_type(&scheme.ty, &type_mapping, &row_mapping)
}

fn rename_type(
    ty: &Type,
    types: &BTreeMap<TypeVarId, TypeVarId>,
    rows: &BTreeMap<RowVarId, RowVarId>,
) -> Type {
    match ty {
        Type::Var(v) => Type::Var(types.get(v).copied().unwrap_or(*v)),
        Type::Array(elem) => Type::Array(Box::new(rename_type(elem, types, rows))),
        Type::Object(row) => Type::Object(rename_row(row, types, rows)),
        Type::Function(func) => Type::Function(FunctionType {
            params: func
                .params
                .iter()
                .map(|(l, t)| (l.clone(), rename_type(t, types, rows)))
                .collect(),
            required: func.required.clone(),
            pipe: func.pipe.clone(),
            ret: Box::new(rename_type(&func.ret, types, rows)),
        }),
        Type::Primitive(_) | Type::Error => ty.clone(),
    }
}

fn rename_row(
    row: &RowType,
    types: &BTreeMap<TypeVarId, TypeVarId>,
    rows: &BTreeMap<RowVarId, RowVarId>,
) -> RowType {
    // Fields are already sorted and unique; renaming keeps them so.
    RowType {
        fields: row
            .fields
            .iter()
            .map(|(l, t)| (l.clone(), rename_type(t, types, rows)))
            .collect(),
        rest: row.rest.map(|r| rows.get(&r).copied().unwrap_or(r)),
    }
}

/// Variables mentioned by a scheme's quantifier list.
pub(crate) fn quantified_vars(scheme: &TypeScheme) -> BTreeSet<TypeVarId> {
    scheme.type_vars.iter().copied().collect()
}

//! Persistent typing environment.
//!
//! An [`Environment`] is a chain of immutable frames. Binding a name pushes
//! a new frame that points at its parent, so extending a scope never
//! copies the parent and the prelude's frames are shared by every
//! environment derived from them, across threads.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use flux_types::{RowType, RowVarId, Substitution, Type, TypeScheme, TypeVarId, free_row_vars, free_type_vars};

#[derive(Debug)]
struct Frame {
    bindings: BTreeMap<String, TypeScheme>,
    /// Free variables of `bindings` before any substitution, collected once
    /// when the frame is created.
    free_type_vars: BTreeSet<TypeVarId>,
    free_row_vars: BTreeSet<RowVarId>,
    parent: Option<Arc<Frame>>,
}

/// Maps identifiers to type schemes. Cloning is O(1).
#[derive(Debug, Clone, Default)]
pub struct Environment {
    head: Option<Arc<Frame>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Innermost binding of `name`.
    pub fn lookup(&self, name: &str) -> Option<&TypeScheme> {
        let mut frame = self.head.as_deref();
        while let Some(f) = frame {
            if let Some(scheme) = f.bindings.get(name) {
                return Some(scheme);
            }
            frame = f.parent.as_deref();
        }
        None
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// A new environment with `name` bound, shadowing any outer binding.
    pub fn bind(&self, name: impl Into<String>, scheme: TypeScheme) -> Environment {
        self.bind_all([(name.into(), scheme)])
    }

    /// A new environment with all of `bindings` in one frame. Later entries
    /// win over earlier ones with the same name.
    pub fn bind_all(&self, bindings: impl IntoIterator<Item = (String, TypeScheme)>) -> Environment {
        let bindings: BTreeMap<String, TypeScheme> = bindings.into_iter().collect();
        let mut free_types = BTreeSet::new();
        let mut free_rows = BTreeSet::new();
        for scheme in bindings.values() {
            free_types.extend(scheme.free_type_vars());
            free_rows.extend(scheme.free_row_vars());
        }
        Environment {
            head: Some(Arc::new(Frame {
                bindings,
                free_type_vars: free_types,
                free_row_vars: free_rows,
                parent: self.head.clone(),
            })),
        }
    }

    /// Number of frames in the chain.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut frame = self.head.as_deref();
        while let Some(f) = frame {
            depth += 1;
            frame = f.parent.as_deref();
        }
        depth
    }

    /// Every visible name, sorted, without duplicates.
    pub fn names(&self) -> Vec<&str> {
        let mut names = BTreeSet::new();
        let mut frame = self.head.as_deref();
        while let Some(f) = frame {
            names.extend(f.bindings.keys().map(String::as_str));
            frame = f.parent.as_deref();
        }
        names.into_iter().collect()
    }

    /// Variables free in the environment once `subst` is applied.
    ///
    /// A type variable that was free when bound may since have been
    /// resolved to a type mentioning other variables (including row
    /// variables), so both sets are recomputed through the substitution.
    pub fn free_vars(&self, subst: &Substitution) -> (BTreeSet<TypeVarId>, BTreeSet<RowVarId>) {
        let mut types = BTreeSet::new();
        let mut rows = BTreeSet::new();
        let mut frame = self.head.as_deref();
        while let Some(f) = frame {
            for &v in &f.free_type_vars {
                let resolved = subst.apply(&Type::Var(v));
                types.extend(free_type_vars(&resolved));
                rows.extend(free_row_vars(&resolved));
            }
            for &r in &f.free_row_vars {
                let resolved = Type::Object(subst.apply_row(&RowType::empty_open(r)));
                types.extend(free_type_vars(&resolved));
                rows.extend(free_row_vars(&resolved));
            }
            frame = f.parent.as_deref();
        }
        (types, rows)
    }
}

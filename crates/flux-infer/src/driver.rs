//! Solver driver: runs the checker over a program, annotates every node with
//! its resolved type and collects diagnostics.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use flux_ast::walk::{Visitor, Walk, walk_program};
use flux_ast::{Expr, FunctionParam, NodeId, Program, Span, Stmt, StmtKind};
use flux_diag::{Category, Diagnostic, DiagnosticError};
use flux_types::{Substitution, Type, TypeScheme, TypeVarId, free_type_vars, sanitize_type_display};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::prelude::Prelude;
use crate::span_to_location;
use crate::trace::{InferStep, UnifyStep};
use crate::typeck::{Abort, Checker};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Per-compilation limits. Missing fields take their defaults when
/// deserialized, so a host can override just the ones it cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferConfig {
    /// Maximum nesting of statements and expressions.
    pub max_depth: usize,
    /// Maximum type and row variables allocated.
    pub max_type_vars: usize,
    /// Maximum constraints solved.
    pub max_constraints: usize,
    /// Capture unification and inference traces.
    pub trace: bool,
}

impl Default for InferConfig {
    fn default() -> Self {
        Self {
            max_depth: 512,
            max_type_vars: 100_000,
            max_constraints: 1_000_000,
            trace: false,
        }
    }
}

/// Cooperative cancellation, polled at every node the checker visits.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, thiserror::Error)]
pub enum InferError {
    /// The program has type errors, in report order.
    #[error(transparent)]
    Diagnostics(#[from] DiagnosticError),
    #[error("type inference was cancelled")]
    Cancelled,
}

impl InferError {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            InferError::Diagnostics(err) => err.diagnostics(),
            InferError::Cancelled => &[],
        }
    }
}

/// A successfully checked program: the resolved type of every expression,
/// parameter and declaration, keyed by node id.
#[derive(Debug, Clone)]
pub struct TypedProgram {
    types: BTreeMap<NodeId, Type>,
    bindings: BTreeMap<String, TypeScheme>,
    unify_trace: Vec<UnifyStep>,
    infer_trace: Vec<InferStep>,
}

impl TypedProgram {
    pub fn type_of(&self, id: NodeId) -> Option<&Type> {
        self.types.get(&id)
    }

    pub fn node_types(&self) -> &BTreeMap<NodeId, Type> {
        &self.types
    }

    /// Scheme of a top-level binding, after the whole program was solved.
    pub fn binding(&self, name: &str) -> Option<&TypeScheme> {
        self.bindings.get(name)
    }

    pub fn bindings(&self) -> &BTreeMap<String, TypeScheme> {
        &self.bindings
    }

    /// Empty unless [`InferConfig::trace`] was set.
    pub fn unify_trace(&self) -> &[UnifyStep] {
        &self.unify_trace
    }

    /// Empty unless [`InferConfig::trace`] was set.
    pub fn infer_trace(&self) -> &[InferStep] {
        &self.infer_trace
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Infer types for `program` in the scope of `prelude`.
///
/// Each call owns its variable counters and substitution, so any number of
/// programs may be checked concurrently against one shared prelude.
pub fn infer_program(
    program: &Program,
    prelude: &Prelude,
    config: &InferConfig,
    cancel: Option<&CancellationFlag>,
) -> Result<TypedProgram, InferError> {
    debug!(
        "inferring file {} ({} statements)",
        program.file.0,
        program.body.len()
    );

    let mut checker = Checker::new(config, cancel);
    let final_env = match checker.check_program(program, prelude.env()) {
        Ok(env) => env,
        Err(Abort::Cancelled) => {
            debug!("inference cancelled");
            return Err(InferError::Cancelled);
        }
        Err(Abort::Limit(diag)) => {
            debug!("inference aborted: {}", diag.message);
            let mut diags = checker.unifier.take_errors();
            diags.push(diag);
            return Err(DiagnosticError::multiple(diags).into());
        }
    };

    let mut diags = checker.unifier.take_errors();

    let mut excluded = checker.generic_vars.clone();
    excluded.extend(checker.recovery_vars.iter().copied());
    let mut annotate = Annotate {
        types: &checker.types,
        subst: &checker.unifier.substitution,
        excluded: &excluded,
        resolved: BTreeMap::new(),
        seen: BTreeSet::new(),
        ambiguous: Vec::new(),
    };
    walk_program(&mut annotate, program);
    let Annotate {
        resolved,
        ambiguous,
        ..
    } = annotate;

    // Unresolved variables after a failure are usually fallout from it.
    if diags.is_empty() {
        diags.extend(ambiguous);
    }

    debug!(
        "inference finished: {} node types, {} diagnostics",
        resolved.len(),
        diags.len()
    );
    if !diags.is_empty() {
        return Err(DiagnosticError::multiple(diags).into());
    }

    let mut bindings = BTreeMap::new();
    for stmt in &program.body {
        if let StmtKind::Variable(decl) | StmtKind::Option(decl) = &stmt.kind
            && let Some(scheme) = final_env.lookup(&decl.name.node)
        {
            bindings.insert(
                decl.name.node.clone(),
                checker.unifier.substitution.apply_scheme(scheme),
            );
        }
    }

    Ok(TypedProgram {
        types: resolved,
        bindings,
        unify_trace: checker.unifier.take_unify_trace(),
        infer_trace: std::mem::take(&mut checker.infer_trace),
    })
}

/// Applies the final substitution to every recorded node type and reports
/// each still-unresolved, non-generic variable once, at its first node.
struct Annotate<'c> {
    types: &'c BTreeMap<NodeId, Type>,
    subst: &'c Substitution,
    excluded: &'c BTreeSet<TypeVarId>,
    resolved: BTreeMap<NodeId, Type>,
    seen: BTreeSet<TypeVarId>,
    ambiguous: Vec<Diagnostic>,
}

impl Annotate<'_> {
    fn note(&mut self, id: NodeId, span: Span) {
        let Some(ty) = self.types.get(&id) else {
            return;
        };
        let ty = self.subst.apply(ty);
        for var in free_type_vars(&ty) {
            if self.excluded.contains(&var) || !self.seen.insert(var) {
                continue;
            }
            let found = sanitize_type_display(&ty);
            self.ambiguous.push(
                Diagnostic::error(
                    Category::AmbiguousType,
                    format!("cannot infer a concrete type here: found `{found}`"),
                )
                .at(span_to_location(span))
                .with_help(Category::AmbiguousType.example_fix()),
            );
        }
        self.resolved.insert(id, ty);
    }
}

impl Visitor for Annotate<'_> {
    fn visit_stmt(&mut self, stmt: &Stmt) -> Walk {
        if let StmtKind::Variable(decl) | StmtKind::Option(decl) = &stmt.kind {
            self.note(decl.id, decl.name.span);
        }
        Walk::Continue
    }

    fn visit_expr(&mut self, expr: &Expr) -> Walk {
        self.note(expr.id, expr.span);
        Walk::Continue
    }

    fn visit_param(&mut self, param: &FunctionParam) {
        self.note(param.id, param.name.span);
    }
}

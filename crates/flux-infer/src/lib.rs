//! HM type inference with Rémy-style row unification for Flux.
//!
//! This crate implements:
//! - Constraint-based Hindley-Milner inference, solving each constraint as
//!   soon as it is generated
//! - Row unification over open and closed objects
//! - Labeled function parameters with required/optional sets and a pipe slot
//! - Kind constraints (`Addable`, `Comparable`, ...) on type variables
//! - Let-generalization and instantiation
//!
//! The entry point is [`infer_program`]. Every constraint carries a
//! [`Provenance`] so that a failure can point at the smallest offending
//! expression and explain why the constraint exists.

pub mod driver;
pub mod env;
pub mod generalize;
pub mod prelude;
pub mod trace;
pub mod typeck;

use std::collections::BTreeMap;

use flux_ast::Span;
use flux_types::{
    FunctionType, Kind, KindSet, Label, RowType, RowVarId, Substitution, Type, TypeVarId,
    display_kinds, sanitize_type_display, sanitize_type_pair_display,
};
use log::trace;

use crate::trace::{UnifyAction, UnifyStep};

// Re-export for convenience.
pub use driver::{CancellationFlag, InferConfig, InferError, TypedProgram, infer_program};
pub use env::Environment;
pub use flux_diag::{Category, Diagnostic, DiagnosticError, SourceLocation};
pub use flux_types::TypeScheme;
pub use prelude::{Prelude, PreludeBuilder, PreludeError, build_prelude};

// ---------------------------------------------------------------------------
// Provenance: why a constraint exists
// ---------------------------------------------------------------------------

/// Tracks the origin of a type constraint for error reporting.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub span: Span,
    pub reason: Reason,
}

/// Why a constraint was generated.
#[derive(Debug, Clone)]
pub enum Reason {
    /// Operands of a binary operator must be compatible.
    BinaryOp(&'static str),
    UnaryOp(&'static str),
    LogicalOp(&'static str),
    /// A call argument must match the declared parameter.
    CallArgument { label: Label },
    /// The left side of `|>` must match the pipe parameter.
    PipeArgument,
    /// A call's result is the callee's return type.
    ReturnType,
    /// A value used as a function must be a function.
    Callee,
    /// Parameter types of two function types must agree.
    FunctionParam { label: Label },
    /// Same-labeled properties of two objects must agree.
    RecordField { label: Label },
    /// `object.label` access.
    MemberAccess { label: Label },
    /// `{base with ...}` requires an object base.
    ObjectExtension,
    /// `array[index]`.
    IndexAccess,
    /// All array elements share one type.
    ArrayElements,
    /// `if` condition must be a boolean.
    ConditionalTest,
    /// `then` and `else` branches must agree.
    ConditionalBranches,
    /// `${...}` parts of a string interpolation.
    Interpolation,
    /// An `option` assignment must keep the type of the binding it overrides.
    OptionOverride { name: String },
}

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

/// A constraint generated during type inference.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Two types must be equal.
    TypeEqual {
        expected: Type,
        actual: Type,
        provenance: Provenance,
    },
    /// `ty` must be an object with property `label` of type `field`.
    HasLabel {
        ty: Type,
        label: Label,
        field: Type,
        provenance: Provenance,
    },
    /// `ty` must satisfy every kind in `kinds`.
    Kinds {
        ty: Type,
        kinds: KindSet,
        provenance: Provenance,
    },
}

// ---------------------------------------------------------------------------
// Unifier
// ---------------------------------------------------------------------------

/// Solves constraints into a substitution.
///
/// One `Unifier` belongs to one compilation: its variable counters start at
/// zero, so checking identical input twice produces identical variables,
/// substitutions and diagnostics.
#[derive(Debug, Default)]
pub struct Unifier {
    pub substitution: Substitution,
    type_var_kinds: BTreeMap<TypeVarId, KindSet>,
    errors: Vec<Diagnostic>,
    next_type_var: u32,
    next_row_var: u32,
    constraint_count: usize,
    tracing: bool,
    unify_trace: Vec<UnifyStep>,
}

impl Unifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh_type_var(&mut self) -> TypeVarId {
        let id = TypeVarId(self.next_type_var);
        self.next_type_var += 1;
        id
    }

    /// A fresh variable that may only be bound to types satisfying `kinds`.
    pub fn fresh_type_var_with_kinds(&mut self, kinds: KindSet) -> TypeVarId {
        let id = self.fresh_type_var();
        if !kinds.is_empty() {
            self.type_var_kinds.insert(id, kinds);
        }
        id
    }

    pub fn fresh_type(&mut self) -> Type {
        Type::Var(self.fresh_type_var())
    }

    pub fn fresh_row_var(&mut self) -> RowVarId {
        let id = RowVarId(self.next_row_var);
        self.next_row_var += 1;
        id
    }

    /// Type and row variables allocated so far.
    pub fn var_count(&self) -> usize {
        self.next_type_var as usize + self.next_row_var as usize
    }

    pub fn constraint_count(&self) -> usize {
        self.constraint_count
    }

    pub fn kinds_of(&self, var: TypeVarId) -> Option<&KindSet> {
        self.type_var_kinds.get(&var)
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(Diagnostic::is_error)
    }

    pub fn push_error(&mut self, diag: Diagnostic) {
        self.errors.push(diag);
    }

    pub fn take_errors(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.errors)
    }

    pub fn enable_tracing(&mut self) {
        self.tracing = true;
    }

    pub fn take_unify_trace(&mut self) -> Vec<UnifyStep> {
        std::mem::take(&mut self.unify_trace)
    }

    /// Solve one constraint against the running substitution.
    ///
    /// Returns `false` if solving it reported a new diagnostic.
    pub fn constrain(&mut self, constraint: Constraint) -> bool {
        self.constraint_count += 1;
        let before = self.errors.len();
        self.apply_constraint(constraint);
        self.errors.len() == before
    }

    pub fn constrain_equal(&mut self, expected: Type, actual: Type, provenance: Provenance) -> bool {
        self.constrain(Constraint::TypeEqual {
            expected,
            actual,
            provenance,
        })
    }

    /// Test-only convenience shim over `constrain`.
    #[cfg(test)]
    pub fn unify(&mut self, expected: &Type, actual: &Type, provenance: &Provenance) -> bool {
        self.constrain(Constraint::TypeEqual {
            expected: expected.clone(),
            actual: actual.clone(),
            provenance: provenance.clone(),
        })
    }

    fn apply_constraint(&mut self, constraint: Constraint) {
        match constraint {
            Constraint::TypeEqual {
                expected,
                actual,
                provenance,
            } => self.unify_immediate(&expected, &actual, &provenance),
            Constraint::HasLabel {
                ty,
                label,
                field,
                provenance,
            } => self.has_label_immediate(&ty, &label, &field, &provenance),
            Constraint::Kinds {
                ty,
                kinds,
                provenance,
            } => self.check_kinds(&ty, &kinds, &provenance),
        }
    }

    fn unify_immediate(&mut self, expected: &Type, actual: &Type, provenance: &Provenance) {
        let expected = self.substitution.apply(expected);
        let actual = self.substitution.apply(actual);

        match (&expected, &actual) {
            _ if expected == actual => {
                self.push_unify_step(
                    UnifyAction::Identity,
                    &expected,
                    &actual,
                    "types already equal".into(),
                );
            }

            // A variable meeting an already-reported failure takes on the
            // error type, so its later uses stay quiet.
            (Type::Var(v), Type::Error) | (Type::Error, Type::Var(v)) => {
                self.push_unify_step(
                    UnifyAction::Bind,
                    &expected,
                    &actual,
                    format!("t{} := <error>", v.0),
                );
                self.substitution.bind_type(*v, Type::Error);
            }
            (Type::Error, _) | (_, Type::Error) => {
                self.push_unify_step(
                    UnifyAction::Identity,
                    &expected,
                    &actual,
                    "error type unifies with any type".into(),
                );
            }

            // Bind whichever variable fewer bindings mention: binding it
            // rewrites each of them.
            (Type::Var(a), Type::Var(b)) => {
                let (var, target) =
                    if self.substitution.type_var_uses(*a) > self.substitution.type_var_uses(*b) {
                        (*b, &expected)
                    } else {
                        (*a, &actual)
                    };
                self.push_unify_step(
                    UnifyAction::Bind,
                    &expected,
                    &actual,
                    format!("t{} := {}", var.0, sanitize_type_display(target)),
                );
                self.bind_type_var(var, target, provenance);
            }
            (Type::Var(v), _) => {
                self.push_unify_step(
                    UnifyAction::Bind,
                    &expected,
                    &actual,
                    format!("t{} := {}", v.0, sanitize_type_display(&actual)),
                );
                self.bind_type_var(*v, &actual, provenance);
            }
            (_, Type::Var(v)) => {
                self.push_unify_step(
                    UnifyAction::Bind,
                    &expected,
                    &actual,
                    format!("t{} := {}", v.0, sanitize_type_display(&expected)),
                );
                self.bind_type_var(*v, &expected, provenance);
            }

            (Type::Array(e), Type::Array(a)) => {
                self.push_unify_step(
                    UnifyAction::Decompose,
                    &expected,
                    &actual,
                    "array element types".into(),
                );
                self.unify_immediate(e, a, provenance);
            }

            (Type::Object(e), Type::Object(a)) => {
                self.push_unify_step(UnifyAction::UnifyRows, &expected, &actual, String::new());
                self.unify_rows_immediate(e, a, provenance);
            }

            (Type::Function(e), Type::Function(a)) => {
                self.push_unify_step(
                    UnifyAction::Decompose,
                    &expected,
                    &actual,
                    "function parameters and return type".into(),
                );
                self.unify_functions_immediate(e, a, provenance);
            }

            _ => {
                self.push_unify_step(
                    UnifyAction::Error,
                    &expected,
                    &actual,
                    "type mismatch".into(),
                );
                self.errors
                    .push(type_mismatch_diag(&expected, &actual, provenance));
            }
        }
    }

    /// Row unification: common labels unify pairwise; labels present on one
    /// side only are absorbed by the other side's tail, or rejected when that
    /// side is closed.
    fn unify_rows_immediate(
        &mut self,
        expected: &RowType,
        actual: &RowType,
        provenance: &Provenance,
    ) {
        let expected = self.substitution.apply_row(expected);
        let actual = self.substitution.apply_row(actual);

        // Partition fields into common (same label), only-in-expected, only-in-actual.
        let mut common = Vec::new();
        let mut only_expected = Vec::new();
        let mut only_actual = Vec::new();

        let mut ei = 0;
        let mut ai = 0;
        while ei < expected.fields.len() && ai < actual.fields.len() {
            match expected.fields[ei].0.cmp(&actual.fields[ai].0) {
                std::cmp::Ordering::Equal => {
                    common.push((
                        expected.fields[ei].0.clone(),
                        expected.fields[ei].1.clone(),
                        actual.fields[ai].1.clone(),
                    ));
                    ei += 1;
                    ai += 1;
                }
                std::cmp::Ordering::Less => {
                    only_expected.push(expected.fields[ei].clone());
                    ei += 1;
                }
                std::cmp::Ordering::Greater => {
                    only_actual.push(actual.fields[ai].clone());
                    ai += 1;
                }
            }
        }
        only_expected.extend_from_slice(&expected.fields[ei..]);
        only_actual.extend_from_slice(&actual.fields[ai..]);

        for (label, exp_ty, act_ty) in &common {
            let field_prov = Provenance {
                span: provenance.span,
                reason: Reason::RecordField {
                    label: label.clone(),
                },
            };
            self.unify_immediate(exp_ty, act_ty, &field_prov);
        }

        // A common field may have bound one of the tails, as in
        // `{r with a: {r}}`. Unify what is left against the resolved tails.
        let tail_bound = [expected.rest, actual.rest]
            .into_iter()
            .flatten()
            .any(|r| self.substitution.lookup_row(r).is_some());
        if tail_bound {
            let expected = self.residual_row(only_expected, expected.rest, &common);
            let actual = self.residual_row(only_actual, actual.rest, &common);
            self.unify_rows_immediate(&expected, &actual, provenance);
            return;
        }

        match (expected.rest, actual.rest) {
            (None, None) => {
                self.report_missing(&only_expected, &actual, provenance);
                self.report_unexpected(&only_actual, &expected, provenance);
            }

            // Expected is open: its tail absorbs actual's extra fields.
            (Some(r), None) => {
                self.push_unify_step(
                    UnifyAction::BindRowVar,
                    &Type::Object(expected.clone()),
                    &Type::Object(actual.clone()),
                    format!("r{} := closed({})", r.0, only_actual.len()),
                );
                self.bind_row_var(r, RowType::closed(only_actual), provenance);
                self.report_missing(&only_expected, &actual, provenance);
            }

            (None, Some(r)) => {
                self.push_unify_step(
                    UnifyAction::BindRowVar,
                    &Type::Object(expected.clone()),
                    &Type::Object(actual.clone()),
                    format!("r{} := closed({})", r.0, only_expected.len()),
                );
                self.bind_row_var(r, RowType::closed(only_expected), provenance);
                self.report_unexpected(&only_actual, &expected, provenance);
            }

            // Same tail: neither side can absorb the other's extra fields.
            (Some(r1), Some(r2)) if r1 == r2 => {
                self.report_missing(&only_expected, &actual, provenance);
                self.report_unexpected(&only_actual, &expected, provenance);
            }

            (Some(r1), Some(r2)) => {
                let r3 = self.fresh_row_var();
                self.push_unify_step(
                    UnifyAction::RemyDecompose,
                    &Type::Object(expected.clone()),
                    &Type::Object(actual.clone()),
                    format!(
                        "r{} ~ {{r{} with only_actual}}, r{} ~ {{r{} with only_expected}}",
                        r1.0, r3.0, r2.0, r3.0
                    ),
                );
                // r1 ~ {only_actual | r3}
                // r2 ~ {only_expected | r3}
                self.bind_row_var(r1, RowType::open(only_actual, r3), provenance);
                self.bind_row_var(r2, RowType::open(only_expected, r3), provenance);
            }
        }
    }

    /// `{fields | rest}` resolved, minus labels already unified as common.
    /// Those labels shadow whatever the tail resolved to.
    fn residual_row(
        &self,
        fields: Vec<(Label, Type)>,
        rest: Option<RowVarId>,
        common: &[(Label, Type, Type)],
    ) -> RowType {
        let mut row = self.substitution.apply_row(&RowType { fields, rest });
        row.fields
            .retain(|(label, _)| !common.iter().any(|(c, _, _)| c == label));
        row
    }

    fn report_missing(
        &mut self,
        labels: &[(Label, Type)],
        actual: &RowType,
        provenance: &Provenance,
    ) {
        for (label, _) in labels {
            self.errors
                .push(missing_label_diag(label, &actual.fields, provenance));
        }
    }

    fn report_unexpected(
        &mut self,
        labels: &[(Label, Type)],
        expected: &RowType,
        provenance: &Provenance,
    ) {
        for (label, _) in labels {
            self.errors
                .push(unexpected_label_diag(label, &expected.fields, provenance));
        }
    }

    /// Parameter sets are exact: every non-pipe label must appear on both
    /// sides with the same required-ness. Pipe slots unify positionally.
    fn unify_functions_immediate(
        &mut self,
        expected: &FunctionType,
        actual: &FunctionType,
        provenance: &Provenance,
    ) {
        let span = provenance.span;
        match (expected.pipe_param(), actual.pipe_param()) {
            (Some((label, e)), Some((_, a))) => {
                let prov = Provenance {
                    span,
                    reason: Reason::FunctionParam {
                        label: label.clone(),
                    },
                };
                self.unify_immediate(e, a, &prov);
            }
            (Some((label, _)), None) => self.errors.push(
                Diagnostic::error(
                    Category::MissingRequiredLabel,
                    format!("function is missing pipe parameter `<-{label}`"),
                )
                .at(span_to_location(span)),
            ),
            (None, Some((label, _))) => self.errors.push(
                Diagnostic::error(
                    Category::UnexpectedLabel,
                    format!("function has unexpected pipe parameter `<-{label}`"),
                )
                .at(span_to_location(span)),
            ),
            (None, None) => {}
        }

        let actual_params: BTreeMap<&Label, &Type> = actual.labeled_params().collect();
        for (label, e) in expected.labeled_params() {
            match actual_params.get(label) {
                Some(a) => {
                    if expected.is_required(label) != actual.is_required(label) {
                        self.errors.push(
                            Diagnostic::error(
                                Category::TypeMismatch,
                                format!(
                                    "parameter `{label}` is required in one function type but optional in the other"
                                ),
                            )
                            .at(span_to_location(span)),
                        );
                    }
                    let prov = Provenance {
                        span,
                        reason: Reason::FunctionParam {
                            label: label.clone(),
                        },
                    };
                    self.unify_immediate(e, a, &prov);
                }
                None => self.errors.push(
                    Diagnostic::error(
                        Category::MissingRequiredLabel,
                        format!("function is missing parameter `{label}`"),
                    )
                    .at(span_to_location(span)),
                ),
            }
        }
        for (label, _) in actual.labeled_params() {
            if !expected.params.contains_key(label) || expected.pipe.as_ref() == Some(label) {
                self.errors.push(
                    Diagnostic::error(
                        Category::UnexpectedLabel,
                        format!("function has unexpected parameter `{label}`"),
                    )
                    .at(span_to_location(span)),
                );
            }
        }

        let ret_prov = Provenance {
            span,
            reason: Reason::ReturnType,
        };
        self.unify_immediate(&expected.ret, &actual.ret, &ret_prov);
    }

    /// Solve `ty has label: field`, extending an open object if needed.
    fn has_label_immediate(
        &mut self,
        ty: &Type,
        label: &Label,
        field: &Type,
        provenance: &Provenance,
    ) {
        let ty = self.substitution.apply(ty);
        match &ty {
            Type::Object(row) => match row.get(label) {
                Some(declared) => {
                    let prov = Provenance {
                        span: provenance.span,
                        reason: Reason::RecordField {
                            label: label.clone(),
                        },
                    };
                    let declared = declared.clone();
                    self.unify_immediate(&declared, field, &prov);
                }
                None => match row.rest {
                    Some(r) => {
                        let tail = self.fresh_row_var();
                        self.push_unify_step(
                            UnifyAction::BindRowVar,
                            &ty,
                            field,
                            format!("r{} := {{r{} with {label}}}", r.0, tail.0),
                        );
                        self.bind_row_var(
                            r,
                            RowType::open(vec![(label.clone(), field.clone())], tail),
                            provenance,
                        );
                    }
                    None => self
                        .errors
                        .push(missing_label_diag(label, &row.fields, provenance)),
                },
            },
            Type::Var(v) => {
                let tail = self.fresh_row_var();
                let object = Type::Object(RowType::open(vec![(label.clone(), field.clone())], tail));
                self.push_unify_step(
                    UnifyAction::Bind,
                    &ty,
                    &object,
                    format!("t{} := {}", v.0, sanitize_type_display(&object)),
                );
                self.bind_type_var(*v, &object, provenance);
            }
            Type::Error => self.unify_immediate(field, &Type::Error, provenance),
            _ => {
                let tail = self.fresh_row_var();
                let field_ty = self.substitution.apply(field);
                let wanted = Type::Object(RowType::open(vec![(label.clone(), field_ty)], tail));
                let (found, expected) = sanitize_type_pair_display(&ty, &wanted);
                self.push_unify_step(
                    UnifyAction::Error,
                    &ty,
                    field,
                    "property access on non-object".into(),
                );
                self.errors.push(
                    Diagnostic::error(
                        Category::TypeMismatch,
                        format!("cannot access property `{label}` on a value of type `{found}`"),
                    )
                    .at(span_to_location(provenance.span))
                    .with_types(expected, found),
                );
            }
        }
    }

    /// Check `ty` against a kind set. Unresolved variables accumulate the
    /// kinds and are checked when they are bound.
    fn check_kinds(&mut self, ty: &Type, kinds: &KindSet, provenance: &Provenance) {
        if kinds.is_empty() {
            return;
        }
        let ty = self.substitution.apply(ty);
        match &ty {
            Type::Var(v) => {
                self.push_unify_step(
                    UnifyAction::Kind,
                    &ty,
                    &ty,
                    format!("t{}: {}", v.0, display_kinds(kinds)),
                );
                self.type_var_kinds
                    .entry(*v)
                    .or_default()
                    .extend(kinds.iter().copied());
            }
            Type::Error => {}
            Type::Primitive(nature) => {
                let missing: KindSet = kinds
                    .iter()
                    .copied()
                    .filter(|k| !nature.satisfies(*k))
                    .collect();
                if !missing.is_empty() {
                    self.errors.push(kind_diag(&ty, &missing, provenance));
                }
            }
            // Arrays and objects are equatable when their contents are;
            // they satisfy no other kind.
            Type::Array(_) | Type::Object(_) | Type::Function(_) => {
                let missing: KindSet = kinds
                    .iter()
                    .copied()
                    .filter(|k| *k != Kind::Equatable || matches!(ty, Type::Function(_)))
                    .collect();
                if !missing.is_empty() {
                    self.errors.push(kind_diag(&ty, &missing, provenance));
                    return;
                }
                let equatable = KindSet::from([Kind::Equatable]);
                match &ty {
                    Type::Array(elem) => self.check_kinds(elem, &equatable, provenance),
                    Type::Object(row) => {
                        for (_, field) in &row.fields {
                            self.check_kinds(field, &equatable, provenance);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn occurs_in(&self, var: TypeVarId, ty: &Type) -> bool {
        let ty = self.substitution.apply(ty);
        type_mentions(&ty, &|t| matches!(t, Type::Var(v) if *v == var), &|_| false)
    }

    fn row_occurs_in(&self, var: RowVarId, row: &RowType) -> bool {
        let row = self.substitution.apply_row(row);
        row.rest == Some(var)
            || row
                .fields
                .iter()
                .any(|(_, t)| type_mentions(t, &|_| false, &|r| r == var))
    }

    /// Bind a type variable to a type, with occurs check and kind check.
    fn bind_type_var(&mut self, var: TypeVarId, ty: &Type, provenance: &Provenance) {
        if let Type::Var(v) = ty
            && *v == var
        {
            return;
        }
        if let Some(existing) = self.substitution.lookup_type(var).cloned() {
            self.unify_immediate(&existing, ty, provenance);
            return;
        }

        if self.occurs_in(var, ty) {
            self.push_unify_step(
                UnifyAction::OccursCheck,
                &Type::Var(var),
                ty,
                format!("t{} occurs in {}", var.0, sanitize_type_display(ty)),
            );
            let (var_name, ty_name) = sanitize_type_pair_display(&Type::Var(var), ty);
            self.errors.push(
                Diagnostic::error(
                    Category::OccursCheck,
                    format!("infinite type: `{var_name}` cannot be bound to `{ty_name}`, which contains it"),
                )
                .at(span_to_location(provenance.span))
                .with_types(var_name, ty_name),
            );
            self.substitution.bind_type(var, Type::Error);
            return;
        }

        if let Some(kinds) = self.type_var_kinds.get(&var).cloned() {
            self.check_kinds(ty, &kinds, provenance);
        }

        trace!("bind t{} := {}", var.0, ty);
        let resolved = self.substitution.apply(ty);
        self.substitution.bind_type(var, resolved);
    }

    fn bind_row_var(&mut self, var: RowVarId, row: RowType, provenance: &Provenance) {
        if row.fields.is_empty() && row.rest == Some(var) {
            return;
        }
        if let Some(existing) = self.substitution.lookup_row(var).cloned() {
            self.unify_rows_immediate(&existing, &row, provenance);
            return;
        }
        if self.row_occurs_in(var, &row) {
            let object = Type::Object(row.clone());
            self.push_unify_step(
                UnifyAction::OccursCheck,
                &Type::Object(RowType::empty_open(var)),
                &object,
                format!("r{} occurs in {}", var.0, sanitize_type_display(&object)),
            );
            self.errors.push(
                Diagnostic::error(
                    Category::OccursCheck,
                    "infinite type: an object would have to contain itself",
                )
                .at(span_to_location(provenance.span))
                .with_types(
                    sanitize_type_display(&Type::Object(RowType::empty_open(var))),
                    sanitize_type_display(&object),
                ),
            );
            return;
        }
        trace!("bind r{} := {}", var.0, row);
        let resolved = self.substitution.apply_row(&row);
        self.substitution.bind_row(var, resolved);
    }

    fn push_unify_step(&mut self, action: UnifyAction, left: &Type, right: &Type, detail: String) {
        if self.tracing {
            let step = self.unify_trace.len() + 1;
            self.unify_trace.push(UnifyStep {
                step,
                action,
                left: sanitize_type_display(left),
                right: sanitize_type_display(right),
                detail,
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Does any variable in `ty` satisfy one of the predicates?
fn type_mentions(
    ty: &Type,
    is_type_var: &dyn Fn(&Type) -> bool,
    is_row_var: &dyn Fn(RowVarId) -> bool,
) -> bool {
    if is_type_var(ty) {
        return true;
    }
    match ty {
        Type::Array(elem) => type_mentions(elem, is_type_var, is_row_var),
        Type::Object(row) => {
            row.rest.is_some_and(is_row_var)
                || row
                    .fields
                    .iter()
                    .any(|(_, t)| type_mentions(t, is_type_var, is_row_var))
        }
        Type::Function(func) => {
            func.params
                .values()
                .any(|t| type_mentions(t, is_type_var, is_row_var))
                || type_mentions(&func.ret, is_type_var, is_row_var)
        }
        Type::Primitive(_) | Type::Var(_) | Type::Error => false,
    }
}

fn format_label_list(fields: &[(Label, Type)]) -> String {
    fields
        .iter()
        .map(|(l, _)| format!("`{l}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// What the rows being unified stand for, for message wording.
fn row_entity(reason: &Reason) -> &'static str {
    match reason {
        Reason::CallArgument { .. } | Reason::PipeArgument => "argument",
        _ => "object",
    }
}

fn missing_label_diag(label: &Label, present: &[(Label, Type)], provenance: &Provenance) -> Diagnostic {
    let entity = row_entity(&provenance.reason);
    let mut diag = Diagnostic::error(
        Category::MissingRequiredLabel,
        format!("{entity} is missing property `{label}`"),
    )
    .at(span_to_location(provenance.span));
    if !present.is_empty() {
        diag = diag.with_help(format!("available properties: {}", format_label_list(present)));
    }
    diag
}

fn unexpected_label_diag(
    label: &Label,
    allowed: &[(Label, Type)],
    provenance: &Provenance,
) -> Diagnostic {
    let entity = row_entity(&provenance.reason);
    let mut diag = Diagnostic::error(
        Category::UnexpectedLabel,
        format!("{entity} has unexpected property `{label}`"),
    )
    .at(span_to_location(provenance.span));
    if !allowed.is_empty() {
        diag = diag.with_help(format!("expected properties: {}", format_label_list(allowed)));
    }
    diag
}

fn kind_diag(ty: &Type, missing: &KindSet, provenance: &Provenance) -> Diagnostic {
    let found = sanitize_type_display(ty);
    let kinds = display_kinds(missing);
    let message = match &provenance.reason {
        Reason::BinaryOp(op) | Reason::UnaryOp(op) => {
            format!("operator `{op}` is not defined for `{found}`: it is not {kinds}")
        }
        _ => format!("`{found}` is not {kinds}"),
    };
    Diagnostic::error(Category::TypeMismatch, message)
        .at(span_to_location(provenance.span))
        .with_types(kinds, found)
}

fn type_mismatch_diag(expected: &Type, actual: &Type, provenance: &Provenance) -> Diagnostic {
    let (message, help) = type_mismatch_message(expected, actual, &provenance.reason);
    let (e, a) = sanitize_type_pair_display(expected, actual);
    let mut diag = Diagnostic::error(Category::TypeMismatch, message)
        .at(span_to_location(provenance.span))
        .with_types(e, a);
    if let Some(help) = help {
        diag = diag.with_help(help);
    }
    diag
}

/// Produce a contextual type mismatch message using the Reason provenance.
fn type_mismatch_message(
    expected: &Type,
    actual: &Type,
    reason: &Reason,
) -> (String, Option<String>) {
    let (expected, actual) = sanitize_type_pair_display(expected, actual);
    match reason {
        Reason::BinaryOp(op) => (
            format!(
                "both sides of `{op}` must have the same type, but left is `{expected}` and right is `{actual}`"
            ),
            Some("there is no implicit conversion between numeric types".into()),
        ),
        Reason::UnaryOp(op) | Reason::LogicalOp(op) => (
            format!("operand of `{op}` must be `{expected}`, got `{actual}`"),
            None,
        ),
        Reason::CallArgument { label } => (
            format!("argument `{label}` has type `{actual}`, but the function expects `{expected}`"),
            None,
        ),
        Reason::PipeArgument => (
            format!("piped value has type `{actual}`, but the pipe parameter expects `{expected}`"),
            None,
        ),
        Reason::ReturnType => (
            format!("return type mismatch: expected `{expected}`, got `{actual}`"),
            None,
        ),
        Reason::Callee => (
            format!("value of type `{actual}` cannot be called as `{expected}`"),
            None,
        ),
        Reason::FunctionParam { label } => (
            format!("parameter `{label}` has type `{expected}` on one side and `{actual}` on the other"),
            None,
        ),
        Reason::RecordField { label } | Reason::MemberAccess { label } => (
            format!("property `{label}` has type `{expected}`, but got `{actual}`"),
            None,
        ),
        Reason::ObjectExtension => (
            format!("only objects can be extended with `with`, got `{actual}`"),
            None,
        ),
        Reason::IndexAccess => (
            format!("index expression mismatch: expected `{expected}`, got `{actual}`"),
            Some("arrays are indexed with `int` values".into()),
        ),
        Reason::ArrayElements => (
            format!("array elements must share one type: expected `{expected}`, got `{actual}`"),
            None,
        ),
        Reason::ConditionalTest => (
            format!("condition must be `{expected}`, got `{actual}`"),
            None,
        ),
        Reason::ConditionalBranches => (
            format!("`then` and `else` branches have different types: `{expected}` vs `{actual}`"),
            Some("both branches must have the same type".into()),
        ),
        Reason::Interpolation => (
            format!("interpolated value must be `{expected}`, got `{actual}`"),
            Some("convert the value with `string(v: ...)`".into()),
        ),
        Reason::OptionOverride { name } => (
            format!("option `{name}` must keep its type `{expected}`, got `{actual}`"),
            None,
        ),
    }
}

pub(crate) fn span_to_location(span: Span) -> SourceLocation {
    SourceLocation {
        file_id: span.file.0,
        start: span.start,
        end: span.end,
    }
}


#[cfg(test)]
mod typeck_tests;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Constraint generation: one walk over the program tree that assigns every
//! node a type and solves each constraint as soon as it is produced.
//!
//! A node whose own constraint fails is given [`Type::Error`], which unifies
//! with everything, so one mistake produces one diagnostic rather than one
//! per dependent use.

use std::collections::{BTreeMap, BTreeSet};

use flux_ast::{
    BinaryOp, Block, CallExpr, Expr, ExprKind, FunctionBody, FunctionExpr, InterpPart, Lit,
    NodeId, ObjectExpr, Program, Span, Stmt, StmtKind, UnaryOp, VariableDecl,
};
use flux_diag::{Category, Diagnostic};
use flux_types::{
    FunctionType, Kind, KindSet, Label, Nature, RowType, Type, TypeScheme, TypeVarId,
    sanitize_type_display,
};
use log::debug;

use crate::driver::{CancellationFlag, InferConfig};
use crate::env::Environment;
use crate::generalize::{generalize, instantiate, quantified_vars};
use crate::trace::{InferRule, InferStep};
use crate::{Constraint, Provenance, Reason, Unifier, span_to_location};

/// Label given to the pipe slot of a function type synthesized from a call
/// on a value whose type is not yet known.
const SYNTHETIC_PIPE_LABEL: &str = "piped";

/// Why the walk stopped early.
#[derive(Debug)]
pub(crate) enum Abort {
    Cancelled,
    Limit(Diagnostic),
}

pub(crate) type Infer<T> = Result<T, Abort>;

pub(crate) struct Checker<'a> {
    pub(crate) unifier: Unifier,
    config: &'a InferConfig,
    cancel: Option<&'a CancellationFlag>,
    depth: usize,
    /// Unresolved type of every expression, parameter and declaration.
    pub(crate) types: BTreeMap<NodeId, Type>,
    /// Variables quantified by some generalization.
    pub(crate) generic_vars: BTreeSet<TypeVarId>,
    /// Variables standing in for unbound identifiers.
    pub(crate) recovery_vars: BTreeSet<TypeVarId>,
    pub(crate) infer_trace: Vec<InferStep>,
}

impl<'a> Checker<'a> {
    pub(crate) fn new(config: &'a InferConfig, cancel: Option<&'a CancellationFlag>) -> Self {
        let mut unifier = Unifier::new();
        if config.trace {
            unifier.enable_tracing();
        }
        Self {
            unifier,
            config,
            cancel,
            depth: 0,
            types: BTreeMap::new(),
            generic_vars: BTreeSet::new(),
            recovery_vars: BTreeSet::new(),
            infer_trace: Vec::new(),
        }
    }

    /// Check top-level statements in order, returning the final scope.
    pub(crate) fn check_program(
        &mut self,
        program: &Program,
        env: &Environment,
    ) -> Infer<Environment> {
        let mut env = env.clone();
        for stmt in &program.body {
            env = self.check_stmt(stmt, &env)?;
        }
        Ok(env)
    }

    // -----------------------------------------------------------------------
    // Limits and cancellation
    // -----------------------------------------------------------------------

    fn enter(&mut self, span: Span) -> Infer<()> {
        if self.cancel.is_some_and(|c| c.is_cancelled()) {
            return Err(Abort::Cancelled);
        }
        self.depth += 1;
        if self.depth > self.config.max_depth {
            return Err(self.limit(
                span,
                format!(
                    "program nesting exceeds the maximum depth of {}",
                    self.config.max_depth
                ),
            ));
        }
        if self.unifier.var_count() > self.config.max_type_vars {
            return Err(self.limit(
                span,
                format!(
                    "program needs more than {} type variables",
                    self.config.max_type_vars
                ),
            ));
        }
        if self.unifier.constraint_count() > self.config.max_constraints {
            return Err(self.limit(
                span,
                format!(
                    "program generates more than {} constraints",
                    self.config.max_constraints
                ),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn limit(&self, span: Span, message: String) -> Abort {
        Abort::Limit(
            Diagnostic::error(Category::ResourceLimitExceeded, message)
                .at(span_to_location(span))
                .with_help(Category::ResourceLimitExceeded.example_fix()),
        )
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    pub(crate) fn check_stmt(&mut self, stmt: &Stmt, env: &Environment) -> Infer<Environment> {
        self.enter(stmt.span)?;
        let env = match &stmt.kind {
            StmtKind::Variable(decl) => {
                let ty = self.infer_expr(&decl.init, env)?;
                self.bind_generalized(decl, &ty, env, InferRule::Variable)
            }
            StmtKind::Option(decl) => {
                let ty = self.infer_expr(&decl.init, env)?;
                if let Some(existing) = env.lookup(&decl.name.node) {
                    let expected = instantiate(existing, &mut self.unifier);
                    self.unifier.constrain_equal(
                        expected,
                        ty.clone(),
                        Provenance {
                            span: decl.init.span,
                            reason: Reason::OptionOverride {
                                name: decl.name.node.clone(),
                            },
                        },
                    );
                }
                self.bind_generalized(decl, &ty, env, InferRule::Option)
            }
            StmtKind::Expression(expr) => {
                let ty = self.infer_expr(expr, env)?;
                // A bare polymorphic value is generic, not ambiguous.
                let scheme = generalize(&ty, env, &self.unifier);
                self.generic_vars.extend(quantified_vars(&scheme));
                if self.config.trace && !scheme.is_mono() {
                    self.infer_trace.push(InferStep {
                        expr: expr.id.to_string(),
                        ty: scheme.to_string(),
                        rule: InferRule::Generalize,
                        detail: "expression statement generalized".into(),
                        span: Some((expr.span.start, expr.span.end)),
                    });
                }
                env.clone()
            }
        };
        self.leave();
        Ok(env)
    }

    /// Generalize `ty` against the scope *before* the binding and bind it.
    fn bind_generalized(
        &mut self,
        decl: &VariableDecl,
        ty: &Type,
        env: &Environment,
        rule: InferRule,
    ) -> Environment {
        let scheme = generalize(ty, env, &self.unifier);
        debug!("{} : {}", decl.name.node, scheme);
        self.generic_vars.extend(quantified_vars(&scheme));
        self.types.insert(decl.id, ty.clone());
        if self.config.trace {
            self.infer_trace.push(InferStep {
                expr: decl.id.to_string(),
                ty: scheme.to_string(),
                rule,
                detail: format!("`{}` generalized", decl.name.node),
                span: Some((decl.name.span.start, decl.name.span.end)),
            });
        }
        env.bind(decl.name.node.clone(), scheme)
    }

    fn infer_block(&mut self, block: &Block, env: &Environment) -> Infer<Type> {
        let mut env = env.clone();
        for stmt in &block.statements {
            env = self.check_stmt(stmt, &env)?;
        }
        self.infer_expr(&block.result, &env)
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    pub(crate) fn infer_expr(&mut self, expr: &Expr, env: &Environment) -> Infer<Type> {
        self.infer_node(expr, env, None)
    }

    /// `piped` is the type of the left side of `|>` when `expr` is the call
    /// on its right side.
    fn infer_node(&mut self, expr: &Expr, env: &Environment, piped: Option<Type>) -> Infer<Type> {
        self.enter(expr.span)?;
        let (ty, rule) = self.infer_kind(expr, env, piped)?;
        self.leave();

        self.types.insert(expr.id, ty.clone());
        if self.config.trace {
            let resolved = self.unifier.substitution.apply(&ty);
            self.infer_trace.push(InferStep {
                expr: expr.id.to_string(),
                ty: sanitize_type_display(&resolved),
                rule,
                detail: describe(&expr.kind),
                span: Some((expr.span.start, expr.span.end)),
            });
        }
        Ok(ty)
    }

    fn infer_kind(
        &mut self,
        expr: &Expr,
        env: &Environment,
        piped: Option<Type>,
    ) -> Infer<(Type, InferRule)> {
        let span = expr.span;
        let typed = match &expr.kind {
            ExprKind::Lit(lit) => (Type::Primitive(lit_nature(lit)), InferRule::Literal),

            ExprKind::Identifier(name) => match env.lookup(name) {
                Some(scheme) => {
                    let rule = if scheme.is_mono() {
                        InferRule::Identifier
                    } else {
                        InferRule::Instantiate
                    };
                    (instantiate(scheme, &mut self.unifier), rule)
                }
                None => {
                    let mut diag = Diagnostic::error(
                        Category::UnboundIdentifier,
                        format!("undefined identifier `{name}`"),
                    )
                    .at(span_to_location(span));
                    if let Some(similar) = similar_name(name, env) {
                        diag = diag.with_help(format!("did you mean `{similar}`?"));
                    }
                    self.unifier.push_error(diag);
                    let var = self.unifier.fresh_type_var();
                    self.recovery_vars.insert(var);
                    (Type::Var(var), InferRule::Identifier)
                }
            },

            ExprKind::Array(elements) => {
                let elem = self.unifier.fresh_type();
                let mut ok = true;
                for e in elements {
                    let t = self.infer_expr(e, env)?;
                    ok &= self.unifier.constrain_equal(
                        elem.clone(),
                        t,
                        Provenance {
                            span: e.span,
                            reason: Reason::ArrayElements,
                        },
                    );
                }
                (or_error(ok, Type::array(elem)), InferRule::Array)
            }

            ExprKind::Function(func) => (self.infer_function(func, env)?, InferRule::Function),

            ExprKind::Call(call) => (self.infer_call(call, span, env, piped)?, InferRule::Call),

            ExprKind::Pipe { argument, call } => {
                let arg_ty = self.infer_expr(argument, env)?;
                if matches!(call.kind, ExprKind::Call(_)) {
                    (self.infer_node(call, env, Some(arg_ty))?, InferRule::Pipe)
                } else {
                    self.infer_expr(call, env)?;
                    self.unifier.push_error(
                        Diagnostic::error(
                            Category::TypeMismatch,
                            "the right side of `|>` must be a function call",
                        )
                        .at(span_to_location(call.span)),
                    );
                    (Type::Error, InferRule::Pipe)
                }
            }

            ExprKind::Member { object, property } => {
                let obj = self.infer_expr(object, env)?;
                let field = self.unifier.fresh_type();
                let label = Label::new(property.node.as_str());
                let ok = self.unifier.constrain(Constraint::HasLabel {
                    ty: obj,
                    label: label.clone(),
                    field: field.clone(),
                    provenance: Provenance {
                        span,
                        reason: Reason::MemberAccess { label },
                    },
                });
                (or_error(ok, field), InferRule::Member)
            }

            ExprKind::Index { array, index } => {
                let arr = self.infer_expr(array, env)?;
                let idx = self.infer_expr(index, env)?;
                let elem = self.unifier.fresh_type();
                let index_ok = self.unifier.constrain_equal(
                    Type::INT,
                    idx,
                    Provenance {
                        span: index.span,
                        reason: Reason::IndexAccess,
                    },
                );
                let array_ok = self.unifier.constrain_equal(
                    Type::array(elem.clone()),
                    arr,
                    Provenance {
                        span: array.span,
                        reason: Reason::IndexAccess,
                    },
                );
                (or_error(index_ok && array_ok, elem), InferRule::Index)
            }

            ExprKind::Object(obj) => (self.infer_object(obj, env)?, InferRule::Object),

            ExprKind::Binary { op, left, right } => {
                let l = self.infer_expr(left, env)?;
                let r = self.infer_expr(right, env)?;
                (self.binary(*op, l, r, span, left.span, right.span), InferRule::Binary)
            }

            ExprKind::Logical { op, left, right } => {
                let mut ok = true;
                for operand in [left, right] {
                    let t = self.infer_expr(operand, env)?;
                    ok &= self.unifier.constrain_equal(
                        Type::BOOL,
                        t,
                        Provenance {
                            span: operand.span,
                            reason: Reason::LogicalOp(op.symbol()),
                        },
                    );
                }
                (or_error(ok, Type::BOOL), InferRule::Logical)
            }

            ExprKind::Unary { op, argument } => {
                let t = self.infer_expr(argument, env)?;
                let prov = Provenance {
                    span,
                    reason: Reason::UnaryOp(op.symbol()),
                };
                let ty = match op {
                    UnaryOp::Not => {
                        let ok = self.unifier.constrain_equal(Type::BOOL, t, prov);
                        or_error(ok, Type::BOOL)
                    }
                    UnaryOp::Exists => Type::BOOL,
                    UnaryOp::Neg | UnaryOp::Pos => {
                        let kind = if *op == UnaryOp::Neg {
                            Kind::Subtractable
                        } else {
                            Kind::Addable
                        };
                        let ok = self.unifier.constrain(Constraint::Kinds {
                            ty: t.clone(),
                            kinds: KindSet::from([kind]),
                            provenance: prov,
                        });
                        or_error(ok, t)
                    }
                };
                (ty, InferRule::Unary)
            }

            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let test_ty = self.infer_expr(test, env)?;
                let then_ty = self.infer_expr(consequent, env)?;
                let else_ty = self.infer_expr(alternate, env)?;
                let test_ok = self.unifier.constrain_equal(
                    Type::BOOL,
                    test_ty,
                    Provenance {
                        span: test.span,
                        reason: Reason::ConditionalTest,
                    },
                );
                let branches_ok = self.unifier.constrain_equal(
                    then_ty.clone(),
                    else_ty,
                    Provenance {
                        span: alternate.span,
                        reason: Reason::ConditionalBranches,
                    },
                );
                (or_error(test_ok && branches_ok, then_ty), InferRule::Conditional)
            }

            ExprKind::StringInterp(parts) => {
                let mut ok = true;
                for part in parts {
                    if let InterpPart::Expr(e) = part {
                        let t = self.infer_expr(e, env)?;
                        ok &= self.unifier.constrain_equal(
                            Type::STRING,
                            t,
                            Provenance {
                                span: e.span,
                                reason: Reason::Interpolation,
                            },
                        );
                    }
                }
                (or_error(ok, Type::STRING), InferRule::Interpolation)
            }
        };
        Ok(typed)
    }

    fn infer_function(&mut self, func: &FunctionExpr, env: &Environment) -> Infer<Type> {
        let mut params = BTreeMap::new();
        let mut required = BTreeSet::new();
        let mut pipe: Option<Label> = None;
        let mut scope = Vec::with_capacity(func.params.len());
        let mut ok = true;

        for param in &func.params {
            let label = Label::new(param.name.node.as_str());
            if params.contains_key(&label) {
                self.unifier.push_error(
                    Diagnostic::error(
                        Category::UnexpectedLabel,
                        format!("duplicate parameter `{label}`"),
                    )
                    .at(span_to_location(param.name.span)),
                );
                ok = false;
                continue;
            }
            if param.is_pipe && pipe.is_some() {
                self.unifier.push_error(
                    Diagnostic::error(
                        Category::UnexpectedLabel,
                        format!("`{label}` is a second pipe parameter"),
                    )
                    .at(span_to_location(param.name.span))
                    .with_help("a function accepts at most one `<-` parameter"),
                );
                ok = false;
                continue;
            }

            // Defaults are evaluated in the defining scope, not the body's.
            let ty = match &param.default {
                Some(default) => self.infer_expr(default, env)?,
                None => self.unifier.fresh_type(),
            };
            if param.is_pipe {
                pipe = Some(label.clone());
            } else if param.default.is_none() {
                required.insert(label.clone());
            }
            self.types.insert(param.id, ty.clone());
            scope.push((param.name.node.clone(), TypeScheme::mono(ty.clone())));
            params.insert(label, ty);
        }

        let body_env = env.bind_all(scope);
        let ret = match &func.body {
            FunctionBody::Expr(body) => self.infer_expr(body, &body_env)?,
            FunctionBody::Block(block) => self.infer_block(block, &body_env)?,
        };

        let ty = Type::Function(FunctionType {
            params,
            required,
            pipe,
            ret: Box::new(ret),
        });
        Ok(or_error(ok, ty))
    }

    fn infer_call(
        &mut self,
        call: &CallExpr,
        span: Span,
        env: &Environment,
        piped: Option<Type>,
    ) -> Infer<Type> {
        let callee_ty = self.infer_expr(&call.callee, env)?;

        let mut ok = true;
        let mut args: Vec<(Label, Type, Span)> = Vec::with_capacity(call.arguments.len());
        for arg in &call.arguments {
            let ty = self.infer_expr(&arg.value, env)?;
            let label = Label::new(arg.key.node.as_str());
            if args.iter().any(|(l, _, _)| *l == label) {
                self.unifier.push_error(
                    Diagnostic::error(
                        Category::UnexpectedLabel,
                        format!("argument `{label}` is given more than once"),
                    )
                    .at(span_to_location(arg.key.span)),
                );
                ok = false;
                continue;
            }
            args.push((label, ty, arg.value.span));
        }

        let ret = self.unifier.fresh_type();
        match self.unifier.substitution.apply(&callee_ty) {
            Type::Function(func) => {
                ok &= self.check_call(&func, &args, piped, &ret, span);
            }
            Type::Var(_) => {
                // Unknown callee: it must accept exactly these arguments.
                let mut params = BTreeMap::new();
                let mut required = BTreeSet::new();
                for (label, ty, _) in &args {
                    params.insert(label.clone(), ty.clone());
                    required.insert(label.clone());
                }
                let pipe = piped.map(|ty| {
                    let label = Label::new(SYNTHETIC_PIPE_LABEL);
                    params.insert(label.clone(), ty);
                    label
                });
                let expected = Type::Function(FunctionType {
                    params,
                    required,
                    pipe,
                    ret: Box::new(ret.clone()),
                });
                ok &= self.unifier.constrain_equal(
                    expected,
                    callee_ty,
                    Provenance {
                        span: call.callee.span,
                        reason: Reason::Callee,
                    },
                );
            }
            Type::Error => return Ok(Type::Error),
            other => {
                let found = sanitize_type_display(&other);
                self.unifier.push_error(
                    Diagnostic::error(
                        Category::TypeMismatch,
                        format!("cannot call a value of type `{found}`"),
                    )
                    .at(span_to_location(call.callee.span))
                    .with_types("function", found),
                );
                ok = false;
            }
        }
        Ok(or_error(ok, ret))
    }

    /// Match call-site arguments against a known function type.
    fn check_call(
        &mut self,
        func: &FunctionType,
        args: &[(Label, Type, Span)],
        piped: Option<Type>,
        ret: &Type,
        span: Span,
    ) -> bool {
        let mut ok = true;
        let is_piped = piped.is_some();

        for (label, ty, arg_span) in args {
            let Some(param_ty) = func.params.get(label) else {
                let mut diag = Diagnostic::error(
                    Category::UnexpectedLabel,
                    format!("unexpected argument `{label}`"),
                )
                .at(span_to_location(*arg_span));
                let accepted: Vec<String> = func.params.keys().map(|l| format!("`{l}`")).collect();
                if !accepted.is_empty() {
                    diag = diag.with_help(format!("this function accepts {}", accepted.join(", ")));
                }
                self.unifier.push_error(diag);
                ok = false;
                continue;
            };
            if is_piped && func.pipe.as_ref() == Some(label) {
                self.unifier.push_error(
                    Diagnostic::error(
                        Category::UnexpectedLabel,
                        format!("argument `{label}` is already supplied by `|>`"),
                    )
                    .at(span_to_location(*arg_span)),
                );
                ok = false;
                continue;
            }
            ok &= self.unifier.constrain_equal(
                param_ty.clone(),
                ty.clone(),
                Provenance {
                    span: *arg_span,
                    reason: Reason::CallArgument {
                        label: label.clone(),
                    },
                },
            );
        }

        let supplied = |label: &Label| args.iter().any(|(l, _, _)| l == label);
        match (func.pipe_param(), piped) {
            (Some((_, pipe_ty)), Some(piped_ty)) => {
                ok &= self.unifier.constrain_equal(
                    pipe_ty.clone(),
                    piped_ty,
                    Provenance {
                        span,
                        reason: Reason::PipeArgument,
                    },
                );
            }
            (None, Some(_)) => {
                self.unifier.push_error(
                    Diagnostic::error(
                        Category::UnexpectedLabel,
                        "function does not accept a piped argument",
                    )
                    .at(span_to_location(span))
                    .with_help("only functions with a `<-` parameter can follow `|>`"),
                );
                ok = false;
            }
            (Some((label, _)), None) if !supplied(label) => {
                self.unifier.push_error(
                    Diagnostic::error(
                        Category::MissingRequiredLabel,
                        format!("missing pipe argument `{label}`"),
                    )
                    .at(span_to_location(span))
                    .with_help(format!("pipe a value into the call or pass `{label}` by name")),
                );
                ok = false;
            }
            _ => {}
        }

        for label in &func.required {
            if !supplied(label) {
                self.unifier.push_error(
                    Diagnostic::error(
                        Category::MissingRequiredLabel,
                        format!("missing required argument `{label}`"),
                    )
                    .at(span_to_location(span)),
                );
                ok = false;
            }
        }

        ok &= self.unifier.constrain_equal(
            ret.clone(),
            (*func.ret).clone(),
            Provenance {
                span,
                reason: Reason::ReturnType,
            },
        );
        ok
    }

    fn infer_object(&mut self, obj: &ObjectExpr, env: &Environment) -> Infer<Type> {
        let mut ok = true;
        let mut fields: Vec<(Label, Type)> = Vec::with_capacity(obj.properties.len());
        for prop in &obj.properties {
            let ty = self.infer_expr(&prop.value, env)?;
            let label = Label::new(prop.key.node.as_str());
            if fields.iter().any(|(l, _)| *l == label) {
                self.unifier.push_error(
                    Diagnostic::error(
                        Category::UnexpectedLabel,
                        format!("duplicate property `{label}`"),
                    )
                    .at(span_to_location(prop.key.span)),
                );
                ok = false;
                continue;
            }
            fields.push((label, ty));
        }

        let Some(base) = &obj.with else {
            return Ok(or_error(ok, Type::Object(RowType::closed(fields))));
        };

        // `{base with a: x}`: the base must be an object; its fields live on
        // in the tail, where the explicit fields shadow them.
        let base_ty = self.infer_expr(base, env)?;
        if self.unifier.substitution.apply(&base_ty).is_error() {
            return Ok(Type::Error);
        }
        let tail = self.unifier.fresh_row_var();
        ok &= self.unifier.constrain_equal(
            Type::Object(RowType::empty_open(tail)),
            base_ty,
            Provenance {
                span: base.span,
                reason: Reason::ObjectExtension,
            },
        );
        Ok(or_error(ok, Type::Object(RowType::open(fields, tail))))
    }

    fn binary(
        &mut self,
        op: BinaryOp,
        left: Type,
        right: Type,
        span: Span,
        left_span: Span,
        right_span: Span,
    ) -> Type {
        let prov = |span| Provenance {
            span,
            reason: Reason::BinaryOp(op.symbol()),
        };

        let (kind, result) = match op {
            BinaryOp::RegexMatch | BinaryOp::NotRegexMatch => {
                let string_ok = self
                    .unifier
                    .constrain_equal(Type::STRING, left, prov(left_span));
                let regexp_ok = self
                    .unifier
                    .constrain_equal(Type::REGEXP, right, prov(right_span));
                return or_error(string_ok && regexp_ok, Type::BOOL);
            }
            BinaryOp::Add => (Kind::Addable, left.clone()),
            BinaryOp::Sub => (Kind::Subtractable, left.clone()),
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Pow => {
                (Kind::Divisible, left.clone())
            }
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                (Kind::Comparable, Type::BOOL)
            }
            BinaryOp::Eq | BinaryOp::Ne => (Kind::Equatable, Type::BOOL),
        };

        // Kinds are only worth checking once the operands agree.
        let ok = self.unifier.constrain_equal(left.clone(), right, prov(span))
            && self.unifier.constrain(Constraint::Kinds {
                ty: left,
                kinds: KindSet::from([kind]),
                provenance: prov(span),
            });
        or_error(ok, result)
    }
}

fn or_error(ok: bool, ty: Type) -> Type {
    if ok { ty } else { Type::Error }
}

fn lit_nature(lit: &Lit) -> Nature {
    match lit {
        Lit::Bool(_) => Nature::Bool,
        Lit::Int(_) => Nature::Int,
        Lit::UInt(_) => Nature::UInt,
        Lit::Float(_) => Nature::Float,
        Lit::String(_) => Nature::String,
        Lit::Time(_) => Nature::Time,
        Lit::Duration(_) => Nature::Duration,
        Lit::Regexp(_) => Nature::Regexp,
    }
}

/// Short description of a node for traces.
fn describe(kind: &ExprKind) -> String {
    match kind {
        ExprKind::Lit(_) => "literal".into(),
        ExprKind::Identifier(name) => format!("identifier `{name}`"),
        ExprKind::Array(elements) => format!("array of {}", elements.len()),
        ExprKind::Function(func) => format!("function of {} parameters", func.params.len()),
        ExprKind::Call(call) => format!("call with {} arguments", call.arguments.len()),
        ExprKind::Pipe { .. } => "pipe".into(),
        ExprKind::Member { property, .. } => format!("member `{}`", property.node),
        ExprKind::Index { .. } => "index".into(),
        ExprKind::Object(obj) if obj.with.is_some() => "object extension".into(),
        ExprKind::Object(_) => "object".into(),
        ExprKind::Binary { op, .. } => format!("binary `{}`", op.symbol()),
        ExprKind::Logical { op, .. } => format!("logical `{}`", op.symbol()),
        ExprKind::Unary { op, .. } => format!("unary `{}`", op.symbol()),
        ExprKind::Conditional { .. } => "conditional".into(),
        ExprKind::StringInterp(_) => "string interpolation".into(),
    }
}

/// The closest visible name to `name`, if any is within two edits.
fn similar_name<'e>(name: &str, env: &'e Environment) -> Option<&'e str> {
    let mut best: Option<(&str, usize)> = None;
    for candidate in env.names() {
        let dist = edit_distance(name, candidate);
        if best.is_none_or(|(_, current)| dist < current) {
            best = Some((candidate, dist));
        }
    }
    match best {
        Some((candidate, dist)) if dist <= 2 => Some(candidate),
        _ => None,
    }
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

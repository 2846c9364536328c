//! Type representations for the Flux type checker.
//!
//! Monotypes ([`Type`]), type schemes ([`TypeScheme`]), the substitution the
//! unifier builds up, and free-variable computation. Rendering goes through
//! one printer so that raw (`t3`, `r1`) and user-facing (`A`, `B`) output
//! stay consistent.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier for a type variable within one compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarId(pub u32);

/// Unique identifier for a row (object tail) variable within one compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowVarId(pub u32);

/// An object property or function parameter name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub String);

impl Label {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Natures and kinds
// ---------------------------------------------------------------------------

/// The primitive types of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Nature {
    Bool,
    Int,
    UInt,
    Float,
    String,
    Time,
    Duration,
    Regexp,
}

impl Nature {
    pub const ALL: [Nature; 8] = [
        Nature::Bool,
        Nature::Int,
        Nature::UInt,
        Nature::Float,
        Nature::String,
        Nature::Time,
        Nature::Duration,
        Nature::Regexp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Nature::Bool => "bool",
            Nature::Int => "int",
            Nature::UInt => "uint",
            Nature::Float => "float",
            Nature::String => "string",
            Nature::Time => "time",
            Nature::Duration => "duration",
            Nature::Regexp => "regexp",
        }
    }

    /// The kinds this nature satisfies.
    pub fn kinds(self) -> &'static [Kind] {
        use Kind::*;
        match self {
            Nature::Bool => &[Equatable, Nullable],
            Nature::Int | Nature::UInt | Nature::Float => &[
                Addable,
                Subtractable,
                Divisible,
                Comparable,
                Equatable,
                Nullable,
            ],
            Nature::String => &[Addable, Comparable, Equatable, Nullable],
            Nature::Time | Nature::Duration => &[Comparable, Equatable, Nullable],
            Nature::Regexp => &[],
        }
    }

    pub fn satisfies(self, kind: Kind) -> bool {
        self.kinds().contains(&kind)
    }
}

impl fmt::Display for Nature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A constraint on what a type variable may be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Addable,
    Subtractable,
    Divisible,
    Comparable,
    Equatable,
    Nullable,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Addable => "Addable",
            Kind::Subtractable => "Subtractable",
            Kind::Divisible => "Divisible",
            Kind::Comparable => "Comparable",
            Kind::Equatable => "Equatable",
            Kind::Nullable => "Nullable",
        };
        f.write_str(name)
    }
}

pub type KindSet = BTreeSet<Kind>;

/// Render a kind set as `Addable + Comparable`.
pub fn display_kinds(kinds: &KindSet) -> String {
    kinds
        .iter()
        .map(Kind::to_string)
        .collect::<Vec<_>>()
        .join(" + ")
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A monotype, possibly containing unresolved variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Primitive(Nature),
    Array(Box<Type>),
    Object(RowType),
    Function(FunctionType),
    Var(TypeVarId),
    /// Stands in for the type of an expression that already failed to check.
    /// Unifies with everything, so one mistake is reported once.
    Error,
}

impl Type {
    pub const BOOL: Type = Type::Primitive(Nature::Bool);
    pub const INT: Type = Type::Primitive(Nature::Int);
    pub const UINT: Type = Type::Primitive(Nature::UInt);
    pub const FLOAT: Type = Type::Primitive(Nature::Float);
    pub const STRING: Type = Type::Primitive(Nature::String);
    pub const TIME: Type = Type::Primitive(Nature::Time);
    pub const DURATION: Type = Type::Primitive(Nature::Duration);
    pub const REGEXP: Type = Type::Primitive(Nature::Regexp);

    pub fn array(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }
}

impl From<FunctionType> for Type {
    fn from(f: FunctionType) -> Self {
        Type::Function(f)
    }
}

impl From<RowType> for Type {
    fn from(row: RowType) -> Self {
        Type::Object(row)
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// The shape of an object: known properties plus an optional tail.
///
/// - Closed: `fields` contains all labels, `rest` is `None`.
/// - Open: `fields` contains known labels, `rest` is `Some(var)` for the unknown tail.
///
/// Fields are kept sorted by label and free of duplicates so that row
/// unification can merge two rows in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowType {
    /// Known fields, sorted by label.
    pub fields: Vec<(Label, Type)>,
    /// `None` = closed row. `Some(var)` = open row with tail variable.
    pub rest: Option<RowVarId>,
}

impl RowType {
    /// Create a closed row. Sorts by label; the first of duplicate labels wins.
    pub fn closed(fields: Vec<(Label, Type)>) -> Self {
        Self {
            fields: canonical_fields(fields),
            rest: None,
        }
    }

    /// Create an open row with a tail variable. Sorts by label; the first of
    /// duplicate labels wins.
    pub fn open(fields: Vec<(Label, Type)>, rest: RowVarId) -> Self {
        Self {
            fields: canonical_fields(fields),
            rest: Some(rest),
        }
    }

    /// Create an empty open row (just a row variable).
    pub fn empty_open(rest: RowVarId) -> Self {
        Self {
            fields: Vec::new(),
            rest: Some(rest),
        }
    }

    pub fn empty_closed() -> Self {
        Self {
            fields: Vec::new(),
            rest: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.rest.is_none()
    }

    pub fn is_open(&self) -> bool {
        self.rest.is_some()
    }

    /// Look up a field by label.
    pub fn get(&self, label: &Label) -> Option<&Type> {
        self.fields
            .binary_search_by(|(l, _)| l.cmp(label))
            .ok()
            .map(|idx| &self.fields[idx].1)
    }

    pub fn has(&self, label: &Label) -> bool {
        self.fields.binary_search_by(|(l, _)| l.cmp(label)).is_ok()
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.fields.iter().map(|(l, _)| l)
    }
}

fn canonical_fields(mut fields: Vec<(Label, Type)>) -> Vec<(Label, Type)> {
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));
    fields.dedup_by(|(later, _), (earlier, _)| later == earlier);
    fields
}

// ---------------------------------------------------------------------------
// Function types
// ---------------------------------------------------------------------------

/// A function with labeled parameters.
///
/// `required` is a subset of the keys of `params`. The pipe parameter, when
/// present, is one of `params` and never in `required`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    pub params: BTreeMap<Label, Type>,
    pub required: BTreeSet<Label>,
    pub pipe: Option<Label>,
    pub ret: Box<Type>,
}

impl FunctionType {
    pub fn builder() -> FunctionTypeBuilder {
        FunctionTypeBuilder::default()
    }

    /// Parameters other than the pipe parameter.
    pub fn labeled_params(&self) -> impl Iterator<Item = (&Label, &Type)> {
        self.params
            .iter()
            .filter(move |(label, _)| self.pipe.as_ref() != Some(*label))
    }

    /// The pipe parameter and its type.
    pub fn pipe_param(&self) -> Option<(&Label, &Type)> {
        let label = self.pipe.as_ref()?;
        self.params.get_key_value(label)
    }

    pub fn is_required(&self, label: &Label) -> bool {
        self.required.contains(label)
    }
}

#[derive(Debug, Default)]
pub struct FunctionTypeBuilder {
    params: BTreeMap<Label, Type>,
    required: BTreeSet<Label>,
    pipe: Option<Label>,
}

impl FunctionTypeBuilder {
    pub fn required(mut self, label: &str, ty: Type) -> Self {
        self.params.insert(Label::new(label), ty);
        self.required.insert(Label::new(label));
        self
    }

    pub fn optional(mut self, label: &str, ty: Type) -> Self {
        self.params.insert(Label::new(label), ty);
        self
    }

    pub fn pipe(mut self, label: &str, ty: Type) -> Self {
        self.params.insert(Label::new(label), ty);
        self.pipe = Some(Label::new(label));
        self
    }

    pub fn returns(self, ret: Type) -> FunctionType {
        FunctionType {
            params: self.params,
            required: self.required,
            pipe: self.pipe,
            ret: Box::new(ret),
        }
    }
}

// ---------------------------------------------------------------------------
// Type schemes
// ---------------------------------------------------------------------------

/// A polymorphic type: `forall type_vars row_vars. ty`, with kind
/// constraints on the quantified type variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeScheme {
    pub type_vars: Vec<TypeVarId>,
    pub row_vars: Vec<RowVarId>,
    pub kinds: BTreeMap<TypeVarId, KindSet>,
    pub ty: Type,
}

impl TypeScheme {
    /// A scheme with no quantified variables.
    pub fn mono(ty: Type) -> Self {
        Self {
            type_vars: Vec::new(),
            row_vars: Vec::new(),
            kinds: BTreeMap::new(),
            ty,
        }
    }

    pub fn is_mono(&self) -> bool {
        self.type_vars.is_empty() && self.row_vars.is_empty()
    }

    /// Type variables of the body not bound by this scheme.
    pub fn free_type_vars(&self) -> BTreeSet<TypeVarId> {
        let mut vars = free_type_vars(&self.ty);
        for v in &self.type_vars {
            vars.remove(v);
        }
        vars
    }

    /// Row variables of the body not bound by this scheme.
    pub fn free_row_vars(&self) -> BTreeSet<RowVarId> {
        let mut vars = free_row_vars(&self.ty);
        for v in &self.row_vars {
            vars.remove(v);
        }
        vars
    }
}

impl fmt::Display for TypeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&sanitize_scheme_display(self))
    }
}

// ---------------------------------------------------------------------------
// Free variables
// ---------------------------------------------------------------------------

pub fn free_type_vars(ty: &Type) -> BTreeSet<TypeVarId> {
    let mut vars = BTreeSet::new();
    collect_free_type_vars(ty, &mut vars);
    vars
}

fn collect_free_type_vars(ty: &Type, vars: &mut BTreeSet<TypeVarId>) {
    match ty {
        Type::Var(v) => {
            vars.insert(*v);
        }
        Type::Array(elem) => collect_free_type_vars(elem, vars),
        Type::Object(row) => {
            for (_, t) in &row.fields {
                collect_free_type_vars(t, vars);
            }
        }
        Type::Function(func) => {
            for t in func.params.values() {
                collect_free_type_vars(t, vars);
            }
            collect_free_type_vars(&func.ret, vars);
        }
        Type::Primitive(_) | Type::Error => {}
    }
}

pub fn free_row_vars(ty: &Type) -> BTreeSet<RowVarId> {
    let mut vars = BTreeSet::new();
    collect_free_row_vars(ty, &mut vars);
    vars
}

fn collect_free_row_vars(ty: &Type, vars: &mut BTreeSet<RowVarId>) {
    match ty {
        Type::Array(elem) => collect_free_row_vars(elem, vars),
        Type::Object(row) => {
            for (_, t) in &row.fields {
                collect_free_row_vars(t, vars);
            }
            if let Some(rest) = row.rest {
                vars.insert(rest);
            }
        }
        Type::Function(func) => {
            for t in func.params.values() {
                collect_free_row_vars(t, vars);
            }
            collect_free_row_vars(&func.ret, vars);
        }
        Type::Primitive(_) | Type::Var(_) | Type::Error => {}
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Names for variables during rendering. Unmapped variables print raw.
#[derive(Default)]
struct VarNames {
    types: BTreeMap<TypeVarId, String>,
    rows: BTreeMap<RowVarId, String>,
}

impl VarNames {
    /// Assign `A`, `B`, ... to type variables, then continue the sequence
    /// for row variables.
    fn alphabetic(types: BTreeSet<TypeVarId>, rows: BTreeSet<RowVarId>) -> Self {
        let type_count = types.len();
        let types = types
            .into_iter()
            .enumerate()
            .map(|(i, v)| (v, alphabetic_var_name(i)))
            .collect();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, v)| (v, alphabetic_var_name(type_count + i)))
            .collect();
        Self { types, rows }
    }

    fn type_var(&self, v: TypeVarId) -> String {
        self.types
            .get(&v)
            .cloned()
            .unwrap_or_else(|| format!("t{}", v.0))
    }

    fn row_var(&self, v: RowVarId) -> String {
        self.rows
            .get(&v)
            .cloned()
            .unwrap_or_else(|| format!("r{}", v.0))
    }
}

/// Generate variable names: A, B, ..., Z, A1, B1, ...
fn alphabetic_var_name(index: usize) -> String {
    let letter = (b'A' + (index % 26) as u8) as char;
    let suffix = index / 26;
    if suffix == 0 {
        letter.to_string()
    } else {
        format!("{letter}{suffix}")
    }
}

fn render(ty: &Type, names: &VarNames, out: &mut String) {
    match ty {
        Type::Primitive(n) => out.push_str(n.name()),
        Type::Var(v) => out.push_str(&names.type_var(*v)),
        Type::Error => out.push_str("<error>"),
        Type::Array(elem) => {
            out.push('[');
            render(elem, names, out);
            out.push(']');
        }
        Type::Object(row) => {
            out.push('{');
            if let Some(rest) = row.rest {
                out.push_str(&names.row_var(rest));
                if !row.fields.is_empty() {
                    out.push_str(" with ");
                }
            }
            for (i, (label, t)) in row.fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(label.as_str());
                out.push_str(": ");
                render(t, names, out);
            }
            out.push('}');
        }
        Type::Function(func) => {
            out.push('(');
            let mut first = true;
            let mut sep = |out: &mut String| {
                if !first {
                    out.push_str(", ");
                }
                first = false;
            };
            if let Some((label, t)) = func.pipe_param() {
                sep(out);
                out.push_str("<-");
                out.push_str(label.as_str());
                out.push_str(": ");
                render(t, names, out);
            }
            for want_required in [true, false] {
                for (label, t) in func.labeled_params() {
                    if func.is_required(label) != want_required {
                        continue;
                    }
                    sep(out);
                    if !want_required {
                        out.push('?');
                    }
                    out.push_str(label.as_str());
                    out.push_str(": ");
                    render(t, names, out);
                }
            }
            out.push_str(") => ");
            render(&func.ret, names, out);
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        render(self, &VarNames::default(), &mut out);
        f.write_str(&out)
    }
}

impl fmt::Display for RowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Type::Object(self.clone()), f)
    }
}

impl serde::Serialize for Type {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&sanitize_type_display(self))
    }
}

/// Display a type with alphabetic names for variables instead of `t0`, `r1`.
pub fn sanitize_type_display(ty: &Type) -> String {
    let names = VarNames::alphabetic(free_type_vars(ty), free_row_vars(ty));
    let mut out = String::new();
    render(ty, &names, &mut out);
    out
}

/// Display two types with one shared variable namespace.
///
/// The same source variable gets the same name on both sides of a mismatch.
pub fn sanitize_type_pair_display(left: &Type, right: &Type) -> (String, String) {
    let mut types = free_type_vars(left);
    types.extend(free_type_vars(right));
    let mut rows = free_row_vars(left);
    rows.extend(free_row_vars(right));
    let names = VarNames::alphabetic(types, rows);

    let mut l = String::new();
    render(left, &names, &mut l);
    let mut r = String::new();
    render(right, &names, &mut r);
    (l, r)
}

/// Display a scheme, with kind constraints in a trailing `where` clause.
pub fn sanitize_scheme_display(scheme: &TypeScheme) -> String {
    let names = VarNames::alphabetic(free_type_vars(&scheme.ty), free_row_vars(&scheme.ty));
    let mut out = String::new();
    render(&scheme.ty, &names, &mut out);
    let constraints: Vec<String> = scheme
        .kinds
        .iter()
        .filter(|(_, kinds)| !kinds.is_empty())
        .filter(|(v, _)| names.types.contains_key(v))
        .map(|(v, kinds)| format!("{}: {}", names.type_var(*v), display_kinds(kinds)))
        .collect();
    if !constraints.is_empty() {
        out.push_str(" where ");
        out.push_str(&constraints.join(", "));
    }
    out
}

// ---------------------------------------------------------------------------
// Substitution
// ---------------------------------------------------------------------------

/// Maps type variables and row variables to their resolved types/rows.
///
/// Bindings are kept fully resolved: no right-hand side mentions a bound
/// variable. Binding a variable rewrites every earlier binding that
/// mentions it, so `apply` is idempotent and resolves a variable with a
/// single lookup.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    type_map: BTreeMap<TypeVarId, Type>,
    row_map: BTreeMap<RowVarId, RowType>,
    /// Bound variables whose binding mentions the key.
    type_users: BTreeMap<TypeVarId, BTreeSet<BoundVar>>,
    row_users: BTreeMap<RowVarId, BTreeSet<BoundVar>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum BoundVar {
    Type(TypeVarId),
    Row(RowVarId),
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an unbound `var`. `var` must not occur in `ty`.
    pub fn bind_type(&mut self, var: TypeVarId, ty: Type) {
        let ty = self.apply(&ty);
        self.record_uses(BoundVar::Type(var), &ty);
        self.type_map.insert(var, ty);
        if let Some(users) = self.type_users.remove(&var) {
            self.rewrite(users);
        }
    }

    /// Bind an unbound row `var`. `var` must not occur in `row`.
    pub fn bind_row(&mut self, var: RowVarId, row: RowType) {
        let row = self.apply_row(&row);
        self.record_uses(BoundVar::Row(var), &Type::Object(row.clone()));
        self.row_map.insert(var, row);
        if let Some(users) = self.row_users.remove(&var) {
            self.rewrite(users);
        }
    }

    /// How many bindings mention `var`. Binding `var` rewrites each of them.
    pub fn type_var_uses(&self, var: TypeVarId) -> usize {
        self.type_users.get(&var).map_or(0, BTreeSet::len)
    }

    fn record_uses(&mut self, user: BoundVar, ty: &Type) {
        for v in free_type_vars(ty) {
            self.type_users.entry(v).or_default().insert(user);
        }
        for r in free_row_vars(ty) {
            self.row_users.entry(r).or_default().insert(user);
        }
    }

    fn rewrite(&mut self, users: BTreeSet<BoundVar>) {
        for user in users {
            match user {
                BoundVar::Type(v) => {
                    if let Some(old) = self.type_map.get(&v) {
                        let new = self.apply(old);
                        self.record_uses(user, &new);
                        self.type_map.insert(v, new);
                    }
                }
                BoundVar::Row(r) => {
                    if let Some(old) = self.row_map.get(&r) {
                        let new = self.apply_row(old);
                        self.record_uses(user, &Type::Object(new.clone()));
                        self.row_map.insert(r, new);
                    }
                }
            }
        }
    }

    pub fn lookup_type(&self, var: TypeVarId) -> Option<&Type> {
        self.type_map.get(&var)
    }

    pub fn lookup_row(&self, var: RowVarId) -> Option<&RowType> {
        self.row_map.get(&var)
    }

    pub fn type_bindings(&self) -> &BTreeMap<TypeVarId, Type> {
        &self.type_map
    }

    pub fn row_bindings(&self) -> &BTreeMap<RowVarId, RowType> {
        &self.row_map
    }

    /// Apply this substitution to a type, replacing all bound variables.
    pub fn apply(&self, ty: &Type) -> Type {
        match ty {
            Type::Var(v) => match self.lookup_type(*v) {
                Some(resolved) => resolved.clone(),
                None => ty.clone(),
            },
            Type::Array(elem) => Type::Array(Box::new(self.apply(elem))),
            Type::Object(row) => Type::Object(self.apply_row(row)),
            Type::Function(func) => Type::Function(FunctionType {
                params: func
                    .params
                    .iter()
                    .map(|(l, t)| (l.clone(), self.apply(t)))
                    .collect(),
                required: func.required.clone(),
                pipe: func.pipe.clone(),
                ret: Box::new(self.apply(&func.ret)),
            }),
            Type::Primitive(_) | Type::Error => ty.clone(),
        }
    }

    /// Apply this substitution to a row type.
    ///
    /// When the tail resolves to a row that repeats one of our labels, our
    /// field shadows the tail's (object extension overrides the base).
    pub fn apply_row(&self, row: &RowType) -> RowType {
        let fields: Vec<(Label, Type)> = row
            .fields
            .iter()
            .map(|(l, t)| (l.clone(), self.apply(t)))
            .collect();

        match row.rest {
            None => RowType { fields, rest: None },
            Some(var) => match self.lookup_row(var) {
                Some(resolved) => {
                    let mut all_fields = fields;
                    all_fields.extend(resolved.fields.iter().cloned());
                    RowType {
                        fields: canonical_fields(all_fields),
                        rest: resolved.rest,
                    }
                }
                None => RowType {
                    fields,
                    rest: Some(var),
                },
            },
        }
    }

    /// Apply to the body of a scheme. Quantified variables are never bound,
    /// so they pass through untouched.
    pub fn apply_scheme(&self, scheme: &TypeScheme) -> TypeScheme {
        TypeScheme {
            ty: self.apply(&scheme.ty),
            ..scheme.clone()
        }
    }
}

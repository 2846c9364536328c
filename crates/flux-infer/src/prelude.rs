//! The built-in scope every program is checked in.
//!
//! [`build_prelude`] is called once by the host; the resulting [`Prelude`]
//! is immutable and cheap to clone, so it can be shared by any number of
//! concurrent compilations. Libraries contribute signatures through
//! [`PreludeBuilder::register`] before the prelude is frozen.

use std::collections::BTreeMap;

use flux_types::{
    FunctionType, FunctionTypeBuilder, Kind, KindSet, Label, RowType, RowVarId, Type, TypeScheme,
    TypeVarId,
};

use crate::env::Environment;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreludeError {
    #[error("`{0}` is already registered in the prelude")]
    Duplicate(String),
    #[error("signature of `{0}` has free type variables; prelude schemes must be closed")]
    OpenScheme(String),
}

/// A frozen, shareable prelude scope.
#[derive(Debug, Clone)]
pub struct Prelude {
    env: Environment,
}

impl Prelude {
    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeScheme> {
        self.env.lookup(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.env.names()
    }
}

/// Build the standard prelude.
pub fn build_prelude() -> Prelude {
    PreludeBuilder::with_builtins().build()
}

#[derive(Debug, Default)]
pub struct PreludeBuilder {
    bindings: BTreeMap<String, TypeScheme>,
}

impl PreludeBuilder {
    /// A builder with no bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder pre-loaded with the built-in functions.
    pub fn with_builtins() -> Self {
        let mut builder = Self::new();
        for (name, scheme) in builtins() {
            builder.bindings.insert(name.to_string(), scheme);
        }
        builder
    }

    /// Add a binding. Names are unique and schemes must quantify every
    /// variable they mention.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        scheme: TypeScheme,
    ) -> Result<(), PreludeError> {
        let name = name.into();
        if self.bindings.contains_key(&name) {
            return Err(PreludeError::Duplicate(name));
        }
        if !scheme.free_type_vars().is_empty() || !scheme.free_row_vars().is_empty() {
            return Err(PreludeError::OpenScheme(name));
        }
        self.bindings.insert(name, scheme);
        Ok(())
    }

    pub fn build(self) -> Prelude {
        Prelude {
            env: Environment::new().bind_all(self.bindings),
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in signatures
// ---------------------------------------------------------------------------

/// Allocates the quantified variables of one signature.
#[derive(Default)]
struct Quantifier {
    type_vars: Vec<TypeVarId>,
    row_vars: Vec<RowVarId>,
    kinds: BTreeMap<TypeVarId, KindSet>,
}

impl Quantifier {
    fn var(&mut self) -> Type {
        let id = TypeVarId(self.type_vars.len() as u32);
        self.type_vars.push(id);
        Type::Var(id)
    }

    fn kinded(&mut self, kind: Kind) -> Type {
        let ty = self.var();
        if let Type::Var(id) = ty {
            self.kinds.insert(id, KindSet::from([kind]));
        }
        ty
    }

    fn row(&mut self) -> RowVarId {
        let id = RowVarId(self.row_vars.len() as u32);
        self.row_vars.push(id);
        id
    }

    fn scheme(self, func: FunctionType) -> TypeScheme {
        TypeScheme {
            type_vars: self.type_vars,
            row_vars: self.row_vars,
            kinds: self.kinds,
            ty: Type::Function(func),
        }
    }
}

fn mono(func: FunctionType) -> TypeScheme {
    TypeScheme::mono(Type::Function(func))
}

/// `(<-tables: [A], extra...) => [A]` transformations share one shape.
fn table_transform(extra: impl FnOnce(FunctionTypeBuilder) -> FunctionTypeBuilder) -> TypeScheme {
    let mut q = Quantifier::default();
    let row = q.var();
    let builder = FunctionType::builder().pipe("tables", Type::array(row.clone()));
    let func = extra(builder).returns(Type::array(row));
    q.scheme(func)
}

fn builtins() -> Vec<(&'static str, TypeScheme)> {
    let mut out = Vec::new();

    // from(bucket: string, ?host: string, ?org: string)
    //   => [{A with _measurement: string, _field: string, _time: time, _value: float}]
    let mut q = Quantifier::default();
    let rest = q.row();
    let record = Type::Object(RowType::open(
        vec![
            (Label::new("_measurement"), Type::STRING),
            (Label::new("_field"), Type::STRING),
            (Label::new("_time"), Type::TIME),
            (Label::new("_value"), Type::FLOAT),
        ],
        rest,
    ));
    out.push((
        "from",
        q.scheme(
            FunctionType::builder()
                .required("bucket", Type::STRING)
                .optional("host", Type::STRING)
                .optional("org", Type::STRING)
                .returns(Type::array(record)),
        ),
    ));

    out.push((
        "range",
        table_transform(|b| {
            b.required("start", Type::DURATION)
                .optional("stop", Type::DURATION)
        }),
    ));

    let mut q = Quantifier::default();
    let row = q.var();
    let predicate = FunctionType::builder()
        .required("r", row.clone())
        .returns(Type::BOOL);
    out.push((
        "filter",
        q.scheme(
            FunctionType::builder()
                .pipe("tables", Type::array(row.clone()))
                .required("fn", Type::Function(predicate))
                .returns(Type::array(row)),
        ),
    ));

    let mut q = Quantifier::default();
    let input = q.var();
    let output = q.var();
    let mapper = FunctionType::builder()
        .required("r", input.clone())
        .returns(output.clone());
    out.push((
        "map",
        q.scheme(
            FunctionType::builder()
                .pipe("tables", Type::array(input))
                .required("fn", Type::Function(mapper))
                .returns(Type::array(output)),
        ),
    ));

    let mut q = Quantifier::default();
    let tables = q.var();
    out.push((
        "yield",
        q.scheme(
            FunctionType::builder()
                .pipe("tables", tables.clone())
                .optional("name", Type::STRING)
                .returns(tables),
        ),
    ));

    out.push((
        "limit",
        table_transform(|b| b.required("n", Type::INT).optional("offset", Type::INT)),
    ));
    out.push((
        "sort",
        table_transform(|b| {
            b.optional("columns", Type::array(Type::STRING))
                .optional("desc", Type::BOOL)
        }),
    ));

    let mut q = Quantifier::default();
    let elem = q.kinded(Kind::Addable);
    out.push((
        "sum",
        q.scheme(
            FunctionType::builder()
                .pipe("values", Type::array(elem.clone()))
                .returns(elem),
        ),
    ));

    let mut q = Quantifier::default();
    let elem = q.var();
    out.push((
        "length",
        q.scheme(
            FunctionType::builder()
                .pipe("arr", Type::array(elem))
                .returns(Type::INT),
        ),
    ));

    let mut q = Quantifier::default();
    let elem = q.kinded(Kind::Equatable);
    out.push((
        "contains",
        q.scheme(
            FunctionType::builder()
                .required("value", elem.clone())
                .required("set", Type::array(elem))
                .returns(Type::BOOL),
        ),
    ));

    for (name, target) in [
        ("string", Type::STRING),
        ("int", Type::INT),
        ("uint", Type::UINT),
        ("float", Type::FLOAT),
        ("bool", Type::BOOL),
        ("duration", Type::DURATION),
        ("time", Type::TIME),
    ] {
        let mut q = Quantifier::default();
        let value = q.var();
        out.push((
            name,
            q.scheme(FunctionType::builder().required("v", value).returns(target)),
        ));
    }

    // Overridable with `option now = ...`.
    out.push(("now", mono(FunctionType::builder().returns(Type::TIME))));

    out
}

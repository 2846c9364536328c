//! Tests for program-level inference.
//!
//! Each test builds a program tree with `AstBuilder` and checks either the
//! inferred schemes of its top-level bindings or the diagnostics it yields.

use flux_ast::build::AstBuilder;
use flux_ast::*;
use flux_types::Type;

use crate::{
    CancellationFlag, Category, InferConfig, InferError, TypedProgram, build_prelude,
    infer_program,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn infer(build: impl FnOnce(&mut AstBuilder) -> Vec<Stmt>) -> Result<TypedProgram, InferError> {
    infer_with(&InferConfig::default(), build)
}

fn infer_with(
    config: &InferConfig,
    build: impl FnOnce(&mut AstBuilder) -> Vec<Stmt>,
) -> Result<TypedProgram, InferError> {
    let mut b = AstBuilder::new(FileId(0));
    let body = build(&mut b);
    let program = b.program(body);
    infer_program(&program, &build_prelude(), config, None)
}

fn ok(result: Result<TypedProgram, InferError>) -> TypedProgram {
    match result {
        Ok(typed) => typed,
        Err(err) => panic!("unexpected inference failure:\n{err}"),
    }
}

fn scheme(typed: &TypedProgram, name: &str) -> String {
    typed
        .binding(name)
        .map(ToString::to_string)
        .unwrap_or_else(|| panic!("no binding `{name}`"))
}

fn categories(result: &Result<TypedProgram, InferError>) -> Vec<Category> {
    match result {
        Ok(_) => Vec::new(),
        Err(err) => err.diagnostics().iter().map(|d| d.category).collect(),
    }
}

fn messages(result: &Result<TypedProgram, InferError>) -> Vec<String> {
    match result {
        Ok(_) => Vec::new(),
        Err(err) => err.diagnostics().iter().map(|d| d.message.clone()).collect(),
    }
}

/// `name = (params) => body` with plain required parameters.
fn define(b: &mut AstBuilder, name: &str, params: &[&str], body: Expr) -> Stmt {
    let params = params.iter().map(|p| b.param(p)).collect();
    let f = b.lambda(params, body);
    b.var(name, f)
}

// ---------------------------------------------------------------------------
// Literals and operators
// ---------------------------------------------------------------------------

#[test]
fn int_addition_is_int() {
    let typed = ok(infer(|b| {
        let one = b.int(1);
        let two = b.int(2);
        let sum = b.binary(BinaryOp::Add, one, two);
        vec![b.var("x", sum)]
    }));
    assert_eq!(scheme(&typed, "x"), "int");
}

#[test]
fn no_implicit_numeric_coercion() {
    let result = infer(|b| {
        let one = b.int(1);
        let half = b.float(1.0);
        let sum = b.binary(BinaryOp::Add, one, half);
        vec![b.expr_stmt(sum)]
    });
    assert_eq!(categories(&result), vec![Category::TypeMismatch]);
    let err = result.unwrap_err();
    let diag = &err.diagnostics()[0];
    assert_eq!(diag.expected.as_deref(), Some("int"));
    assert_eq!(diag.found.as_deref(), Some("float"));
}

#[test]
fn comparison_yields_bool_and_string_concatenation_is_allowed() {
    let typed = ok(infer(|b| {
        let a = b.string("a");
        let c = b.string("b");
        let lt = b.binary(BinaryOp::Lt, a, c);
        let x = b.string("x");
        let y = b.string("y");
        let cat = b.binary(BinaryOp::Add, x, y);
        vec![b.var("lt", lt), b.var("cat", cat)]
    }));
    assert_eq!(scheme(&typed, "lt"), "bool");
    assert_eq!(scheme(&typed, "cat"), "string");
}

#[test]
fn operator_kinds_are_enforced() {
    let result = infer(|b| {
        let t = b.bool(true);
        let f = b.bool(false);
        let sum = b.binary(BinaryOp::Add, t, f);
        vec![b.expr_stmt(sum)]
    });
    assert_eq!(categories(&result), vec![Category::TypeMismatch]);
    assert!(messages(&result)[0].contains("Addable"));
}

#[test]
fn regex_match_requires_string_and_regexp() {
    let typed = ok(infer(|b| {
        let s = b.string("abc");
        let re = b.regexp("a.c");
        let m = b.binary(BinaryOp::RegexMatch, s, re);
        vec![b.var("m", m)]
    }));
    assert_eq!(scheme(&typed, "m"), "bool");

    let result = infer(|b| {
        let s = b.string("abc");
        let re = b.string("a.c");
        let m = b.binary(BinaryOp::NotRegexMatch, s, re);
        vec![b.expr_stmt(m)]
    });
    assert_eq!(categories(&result), vec![Category::TypeMismatch]);
}

#[test]
fn logical_and_unary_operators() {
    let typed = ok(infer(|b| {
        let t = b.bool(true);
        let not = b.unary(UnaryOp::Not, t);
        let f = b.bool(false);
        let and = b.logical(LogicalOp::And, not, f);
        let s = b.string("s");
        let exists = b.unary(UnaryOp::Exists, s);
        let d = b.float(2.5);
        let neg = b.unary(UnaryOp::Neg, d);
        vec![b.var("and", and), b.var("exists", exists), b.var("neg", neg)]
    }));
    assert_eq!(scheme(&typed, "and"), "bool");
    assert_eq!(scheme(&typed, "exists"), "bool");
    assert_eq!(scheme(&typed, "neg"), "float");
}

#[test]
fn negating_a_string_fails() {
    let result = infer(|b| {
        let s = b.string("s");
        let neg = b.unary(UnaryOp::Neg, s);
        vec![b.expr_stmt(neg)]
    });
    assert_eq!(categories(&result), vec![Category::TypeMismatch]);
}

#[test]
fn logical_operands_must_be_bool() {
    let result = infer(|b| {
        let one = b.int(1);
        let t = b.bool(true);
        let or = b.logical(LogicalOp::Or, one, t);
        vec![b.expr_stmt(or)]
    });
    assert_eq!(categories(&result), vec![Category::TypeMismatch]);
}

#[test]
fn conditional_branches_must_agree() {
    let typed = ok(infer(|b| {
        let t = b.bool(true);
        let one = b.int(1);
        let two = b.int(2);
        let c = b.conditional(t, one, two);
        vec![b.var("c", c)]
    }));
    assert_eq!(scheme(&typed, "c"), "int");

    let result = infer(|b| {
        let t = b.bool(true);
        let one = b.int(1);
        let a = b.string("a");
        let c = b.conditional(t, one, a);
        vec![b.expr_stmt(c)]
    });
    assert_eq!(categories(&result), vec![Category::TypeMismatch]);
}

#[test]
fn interpolated_parts_must_be_strings() {
    let result = infer(|b| {
        let one = b.int(1);
        let s = b.interp(vec![InterpPart::Text("n = ".into()), InterpPart::Expr(one)]);
        vec![b.expr_stmt(s)]
    });
    assert_eq!(categories(&result), vec![Category::TypeMismatch]);
    let err = result.unwrap_err();
    assert_eq!(
        err.diagnostics()[0].help.as_deref(),
        Some("convert the value with `string(v: ...)`")
    );
}

// ---------------------------------------------------------------------------
// Arrays and indexing
// ---------------------------------------------------------------------------

#[test]
fn array_indexing() {
    let typed = ok(infer(|b| {
        let one = b.int(1);
        let two = b.int(2);
        let arr = b.array(vec![one, two]);
        let zero = b.int(0);
        let first = b.index(arr, zero);
        vec![b.var("first", first)]
    }));
    assert_eq!(scheme(&typed, "first"), "int");
}

#[test]
fn array_index_must_be_int() {
    let result = infer(|b| {
        let one = b.int(1);
        let arr = b.array(vec![one]);
        let idx = b.float(0.0);
        let e = b.index(arr, idx);
        vec![b.expr_stmt(e)]
    });
    assert_eq!(categories(&result), vec![Category::TypeMismatch]);
}

#[test]
fn heterogeneous_array_fails_once() {
    let result = infer(|b| {
        let one = b.int(1);
        let s = b.string("a");
        let t = b.bool(true);
        let arr = b.array(vec![one, s, t]);
        vec![b.expr_stmt(arr)]
    });
    assert_eq!(
        categories(&result),
        vec![Category::TypeMismatch, Category::TypeMismatch]
    );
}

// ---------------------------------------------------------------------------
// Let-polymorphism
// ---------------------------------------------------------------------------

#[test]
fn identity_is_generalized_and_instantiated_independently() {
    let typed = ok(infer(|b| {
        let body = b.ident("x");
        let id = define(b, "id", &["x"], body);
        let callee = b.ident("id");
        let one = b.int(1);
        let a = b.call(callee, vec![("x", one)]);
        let callee = b.ident("id");
        let s = b.string("a");
        let c = b.call(callee, vec![("x", s)]);
        vec![id, b.var("a", a), b.var("c", c)]
    }));
    assert_eq!(scheme(&typed, "id"), "(x: A) => A");
    assert_eq!(scheme(&typed, "a"), "int");
    assert_eq!(scheme(&typed, "c"), "string");
}

#[test]
fn instantiations_record_their_own_types() {
    let mut ids = Vec::new();
    let typed = ok(infer(|b| {
        let body = b.ident("x");
        let id = define(b, "id", &["x"], body);
        let mut stmts = vec![id];
        for arg in [b.int(1), b.string("a")] {
            let callee = b.ident("id");
            ids.push(callee.id);
            let call = b.call(callee, vec![("x", arg)]);
            stmts.push(b.expr_stmt(call));
        }
        stmts
    }));
    assert_eq!(typed.type_of(ids[0]).map(ToString::to_string).as_deref(), Some("(x: int) => int"));
    assert_eq!(
        typed.type_of(ids[1]).map(ToString::to_string).as_deref(),
        Some("(x: string) => string")
    );
}

#[test]
fn kind_constraints_are_generalized() {
    let result = infer(|b| {
        let l = b.ident("a");
        let r = b.ident("b");
        let sum = b.binary(BinaryOp::Add, l, r);
        let add = define(b, "add", &["a", "b"], sum);

        let callee = b.ident("add");
        let (one, two) = (b.int(1), b.int(2));
        let ints = b.call(callee, vec![("a", one), ("b", two)]);
        let callee = b.ident("add");
        let (x, y) = (b.string("x"), b.string("y"));
        let strings = b.call(callee, vec![("a", x), ("b", y)]);
        vec![add, b.var("ints", ints), b.var("strings", strings)]
    });
    let typed = ok(result);
    assert_eq!(scheme(&typed, "add"), "(a: A, b: A) => A where A: Addable");
    assert_eq!(scheme(&typed, "ints"), "int");
    assert_eq!(scheme(&typed, "strings"), "string");
}

#[test]
fn kinded_instantiation_rejects_unsupported_type() {
    let result = infer(|b| {
        let l = b.ident("a");
        let r = b.ident("b");
        let sum = b.binary(BinaryOp::Add, l, r);
        let add = define(b, "add", &["a", "b"], sum);
        let callee = b.ident("add");
        let (t, f) = (b.bool(true), b.bool(false));
        let call = b.call(callee, vec![("a", t), ("b", f)]);
        vec![add, b.expr_stmt(call)]
    });
    assert_eq!(categories(&result), vec![Category::TypeMismatch]);
    assert_eq!(messages(&result), vec!["`bool` is not Addable"]);
}

#[test]
fn lambda_parameters_are_monomorphic_inside_the_body() {
    // (f) => [f(x: 1), f(x: "a")] must fail: f is not generalized.
    let result = infer(|b| {
        let callee = b.ident("f");
        let one = b.int(1);
        let first = b.call(callee, vec![("x", one)]);
        let callee = b.ident("f");
        let s = b.string("a");
        let second = b.call(callee, vec![("x", s)]);
        let arr = b.array(vec![first, second]);
        vec![define(b, "g", &["f"], arr)]
    });
    assert!(categories(&result).contains(&Category::TypeMismatch));
}

#[test]
fn block_bodies_bind_in_order() {
    let typed = ok(infer(|b| {
        let x = b.param("x");
        let xr = b.ident("x");
        let two = b.int(2);
        let doubled = b.binary(BinaryOp::Mul, xr, two);
        let y = b.var("y", doubled);
        let yr = b.ident("y");
        let one = b.int(1);
        let result = b.binary(BinaryOp::Add, yr, one);
        let f = b.lambda_block(vec![x], vec![y], result);
        vec![b.var("f", f)]
    }));
    assert_eq!(scheme(&typed, "f"), "(x: int) => int");
}

// ---------------------------------------------------------------------------
// Calls, labels and pipes
// ---------------------------------------------------------------------------

#[test]
fn missing_required_argument_is_named() {
    let result = infer(|b| {
        let a = b.param("a");
        let default = b.int(1);
        let bp = b.param_default("b", default);
        let l = b.ident("a");
        let r = b.ident("b");
        let sum = b.binary(BinaryOp::Add, l, r);
        let f = b.lambda(vec![a, bp], sum);
        let decl = b.var("f", f);
        let callee = b.ident("f");
        let two = b.int(2);
        let call = b.call(callee, vec![("b", two)]);
        vec![decl, b.expr_stmt(call)]
    });
    assert_eq!(categories(&result), vec![Category::MissingRequiredLabel]);
    assert_eq!(messages(&result), vec!["missing required argument `a`"]);
}

#[test]
fn optional_parameters_may_be_omitted() {
    let typed = ok(infer(|b| {
        let a = b.param("a");
        let default = b.int(1);
        let bp = b.param_default("b", default);
        let l = b.ident("a");
        let r = b.ident("b");
        let sum = b.binary(BinaryOp::Add, l, r);
        let f = b.lambda(vec![a, bp], sum);
        let decl = b.var("f", f);
        let callee = b.ident("f");
        let two = b.int(2);
        let call = b.call(callee, vec![("a", two)]);
        vec![decl, b.var("x", call)]
    }));
    assert_eq!(scheme(&typed, "f"), "(a: int, ?b: int) => int");
    assert_eq!(scheme(&typed, "x"), "int");
}

#[test]
fn unknown_argument_is_rejected() {
    let result = infer(|b| {
        let callee = b.ident("string");
        let one = b.int(1);
        let two = b.int(2);
        let call = b.call(callee, vec![("v", one), ("w", two)]);
        vec![b.expr_stmt(call)]
    });
    assert_eq!(categories(&result), vec![Category::UnexpectedLabel]);
    assert_eq!(messages(&result), vec!["unexpected argument `w`"]);
}

#[test]
fn duplicate_argument_is_rejected() {
    let result = infer(|b| {
        let callee = b.ident("string");
        let one = b.int(1);
        let two = b.int(2);
        let call = b.call(callee, vec![("v", one), ("v", two)]);
        vec![b.expr_stmt(call)]
    });
    assert_eq!(categories(&result), vec![Category::UnexpectedLabel]);
}

#[test]
fn calling_a_non_function_fails() {
    let result = infer(|b| {
        let callee = b.int(3);
        let call = b.call(callee, vec![]);
        vec![b.expr_stmt(call)]
    });
    assert_eq!(categories(&result), vec![Category::TypeMismatch]);
    assert_eq!(messages(&result), vec!["cannot call a value of type `int`"]);
}

#[test]
fn pipeline_through_builtins() {
    // data = from(bucket: "b") |> range(start: 1h) |> filter(fn: (r) => r._value > 0.0)
    let typed = ok(infer(|b| {
        let from = b.ident("from");
        let bucket = b.string("b");
        let source = b.call(from, vec![("bucket", bucket)]);

        let range = b.ident("range");
        let start = b.duration(3_600_000_000_000);
        let ranged = b.call(range, vec![("start", start)]);
        let piped = b.pipe(source, ranged);

        let r = b.param("r");
        let rr = b.ident("r");
        let value = b.member(rr, "_value");
        let zero = b.float(0.0);
        let gt = b.binary(BinaryOp::Gt, value, zero);
        let predicate = b.lambda(vec![r], gt);
        let filter = b.ident("filter");
        let filtered = b.call(filter, vec![("fn", predicate)]);
        let data = b.pipe(piped, filtered);
        vec![b.var("data", data)]
    }));
    assert_eq!(
        scheme(&typed, "data"),
        "[{A with _field: string, _measurement: string, _time: time, _value: float}]"
    );
}

#[test]
fn filter_predicate_field_type_must_match() {
    let result = infer(|b| {
        let from = b.ident("from");
        let bucket = b.string("b");
        let source = b.call(from, vec![("bucket", bucket)]);
        let r = b.param("r");
        let rr = b.ident("r");
        let value = b.member(rr, "_value");
        let s = b.string("x");
        let eq = b.binary(BinaryOp::Eq, value, s);
        let predicate = b.lambda(vec![r], eq);
        let filter = b.ident("filter");
        let filtered = b.call(filter, vec![("fn", predicate)]);
        let data = b.pipe(source, filtered);
        vec![b.expr_stmt(data)]
    });
    assert_eq!(categories(&result), vec![Category::TypeMismatch]);
}

#[test]
fn user_defined_pipe_function() {
    let typed = ok(infer(|b| {
        let tables = b.pipe_param("tables");
        let n = b.param("n");
        let t = b.ident("tables");
        let nr = b.ident("n");
        let body = b.index(t, nr);
        let f = b.lambda(vec![tables, n], body);
        let decl = b.var("nth", f);

        let one = b.int(1);
        let two = b.int(2);
        let arr = b.array(vec![one, two]);
        let callee = b.ident("nth");
        let zero = b.int(0);
        let call = b.call(callee, vec![("n", zero)]);
        let piped = b.pipe(arr, call);
        vec![decl, b.var("x", piped)]
    }));
    assert_eq!(scheme(&typed, "nth"), "(<-tables: [A], n: int) => A");
    assert_eq!(scheme(&typed, "x"), "int");
}

#[test]
fn pipe_argument_may_be_passed_by_name() {
    let typed = ok(infer(|b| {
        let callee = b.ident("length");
        let one = b.int(1);
        let arr = b.array(vec![one]);
        let call = b.call(callee, vec![("arr", arr)]);
        vec![b.var("n", call)]
    }));
    assert_eq!(scheme(&typed, "n"), "int");
}

#[test]
fn missing_pipe_argument_is_reported() {
    let result = infer(|b| {
        let callee = b.ident("length");
        let call = b.call(callee, vec![]);
        vec![b.expr_stmt(call)]
    });
    assert_eq!(categories(&result), vec![Category::MissingRequiredLabel]);
    assert_eq!(messages(&result), vec!["missing pipe argument `arr`"]);
}

#[test]
fn piping_into_a_function_without_pipe_parameter_fails() {
    let result = infer(|b| {
        let one = b.int(1);
        let callee = b.ident("string");
        let two = b.int(2);
        let call = b.call(callee, vec![("v", two)]);
        let piped = b.pipe(one, call);
        vec![b.expr_stmt(piped)]
    });
    assert_eq!(categories(&result), vec![Category::UnexpectedLabel]);
}

#[test]
fn piping_and_naming_the_pipe_parameter_conflict() {
    let result = infer(|b| {
        let one = b.int(1);
        let arr = b.array(vec![one]);
        let two = b.int(2);
        let other = b.array(vec![two]);
        let callee = b.ident("length");
        let call = b.call(callee, vec![("arr", other)]);
        let piped = b.pipe(arr, call);
        vec![b.expr_stmt(piped)]
    });
    assert_eq!(categories(&result), vec![Category::UnexpectedLabel]);
}

#[test]
fn pipe_into_non_call_fails() {
    let result = infer(|b| {
        let one = b.int(1);
        let f = b.ident("now");
        let piped = b.pipe(one, f);
        vec![b.expr_stmt(piped)]
    });
    assert_eq!(categories(&result), vec![Category::TypeMismatch]);
}

#[test]
fn sum_requires_addable_elements() {
    let result = infer(|b| {
        let t = b.bool(true);
        let arr = b.array(vec![t]);
        let callee = b.ident("sum");
        let call = b.call(callee, vec![]);
        let piped = b.pipe(arr, call);
        vec![b.expr_stmt(piped)]
    });
    assert_eq!(categories(&result), vec![Category::TypeMismatch]);
}

#[test]
fn second_pipe_parameter_is_rejected() {
    let result = infer(|b| {
        let a = b.pipe_param("a");
        let c = b.pipe_param("c");
        let body = b.ident("a");
        let f = b.lambda(vec![a, c], body);
        vec![b.expr_stmt(f)]
    });
    assert_eq!(categories(&result), vec![Category::UnexpectedLabel]);
}

#[test]
fn higher_order_call_on_unknown_function() {
    let typed = ok(infer(|b| {
        let callee = b.ident("f");
        let vr = b.ident("v");
        let call = b.call(callee, vec![("x", vr)]);
        vec![define(b, "apply", &["f", "v"], call)]
    }));
    assert_eq!(scheme(&typed, "apply"), "(f: (x: A) => B, v: A) => B");
}

#[test]
fn self_application_is_an_infinite_type() {
    let result = infer(|b| {
        let callee = b.ident("x");
        let arg = b.ident("x");
        let call = b.call(callee, vec![("x", arg)]);
        vec![define(b, "f", &["x"], call)]
    });
    assert_eq!(categories(&result), vec![Category::OccursCheck]);
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

#[test]
fn member_access_on_closed_object() {
    let typed = ok(infer(|b| {
        let one = b.int(1);
        let obj = b.object(vec![("a", one)]);
        let decl = b.var("o", obj);
        let o = b.ident("o");
        let m = b.member(o, "a");
        vec![decl, b.var("a", m)]
    }));
    assert_eq!(scheme(&typed, "o"), "{a: int}");
    assert_eq!(scheme(&typed, "a"), "int");
}

#[test]
fn missing_member_is_reported() {
    let result = infer(|b| {
        let one = b.int(1);
        let obj = b.object(vec![("a", one)]);
        let decl = b.var("o", obj);
        let o = b.ident("o");
        let m = b.member(o, "b");
        vec![decl, b.expr_stmt(m)]
    });
    assert_eq!(categories(&result), vec![Category::MissingRequiredLabel]);
    let err = result.unwrap_err();
    assert_eq!(err.diagnostics()[0].message, "object is missing property `b`");
}

#[test]
fn member_access_makes_parameter_row_polymorphic() {
    let typed = ok(infer(|b| {
        let body_obj = b.ident("r");
        let body = b.member(body_obj, "name");
        let get = define(b, "getName", &["r"], body);

        let callee = b.ident("getName");
        let s = b.string("n");
        let one = b.int(1);
        let obj = b.object(vec![("name", s), ("age", one)]);
        let call = b.call(callee, vec![("r", obj)]);
        vec![get, b.var("n", call)]
    }));
    assert_eq!(scheme(&typed, "getName"), "(r: {B with name: A}) => A");
    assert_eq!(scheme(&typed, "n"), "string");
}

#[test]
fn object_extension_overrides_base_fields() {
    let typed = ok(infer(|b| {
        let one = b.int(1);
        let x = b.string("x");
        let base = b.object(vec![("a", one), ("b", x)]);
        let decl = b.var("o", base);
        let o = b.ident("o");
        let two = b.int(2);
        let t = b.bool(true);
        let ext = b.object_with(o, vec![("b", two), ("c", t)]);
        vec![decl, b.var("p", ext)]
    }));
    assert_eq!(scheme(&typed, "p"), "{a: int, b: int, c: bool}");
}

#[test]
fn extending_a_parameter_keeps_its_tail() {
    let typed = ok(infer(|b| {
        let r = b.ident("r");
        let one = b.int(1);
        let ext = b.object_with(r, vec![("x", one)]);
        vec![define(b, "addX", &["r"], ext)]
    }));
    assert_eq!(scheme(&typed, "addX"), "(r: {A}) => {A with x: int}");
}

#[test]
fn extending_a_non_object_fails() {
    let result = infer(|b| {
        let one = b.int(1);
        let two = b.int(2);
        let ext = b.object_with(one, vec![("x", two)]);
        vec![b.expr_stmt(ext)]
    });
    assert_eq!(categories(&result), vec![Category::TypeMismatch]);
}

/// `f = (x) => { y = {x with a: x}  return y == {a: {<inner>: 1}, b: 2} }`
fn compare_self_extension(b: &mut AstBuilder, inner: &str) -> Stmt {
    let x = b.param("x");
    let base = b.ident("x");
    let field = b.ident("x");
    let ext = b.object_with(base, vec![("a", field)]);
    let y = b.var("y", ext);
    let one = b.int(1);
    let nested = b.object(vec![(inner, one)]);
    let two = b.int(2);
    let other = b.object(vec![("a", nested), ("b", two)]);
    let yr = b.ident("y");
    let eq = b.binary(BinaryOp::Eq, yr, other);
    let f = b.lambda_block(vec![x], vec![y], eq);
    b.var("f", f)
}

#[test]
fn extension_tail_is_fixed_by_its_own_field() {
    let typed = ok(infer(|b| vec![compare_self_extension(b, "b")]));
    assert_eq!(scheme(&typed, "f"), "(x: {b: int}) => bool");
}

#[test]
fn extension_tail_conflict_is_reported() {
    // `a` forces x to {c: int}, so `y` is {a: {c: int}, c: int}, not {.., b: int}.
    let result = infer(|b| vec![compare_self_extension(b, "c")]);
    let cats = categories(&result);
    assert!(cats.contains(&Category::MissingRequiredLabel), "{cats:?}");
    assert!(cats.contains(&Category::UnexpectedLabel), "{cats:?}");
}

#[test]
fn duplicate_object_property_is_rejected() {
    let result = infer(|b| {
        let one = b.int(1);
        let two = b.int(2);
        let obj = b.object(vec![("a", one), ("a", two)]);
        vec![b.expr_stmt(obj)]
    });
    assert_eq!(categories(&result), vec![Category::UnexpectedLabel]);
}

// ---------------------------------------------------------------------------
// Error recovery
// ---------------------------------------------------------------------------

#[test]
fn unbound_identifier_suggests_similar_name() {
    let result = infer(|b| {
        let callee = b.ident("flot");
        let one = b.int(1);
        let call = b.call(callee, vec![("v", one)]);
        vec![b.var("x", call)]
    });
    assert_eq!(categories(&result), vec![Category::UnboundIdentifier]);
    let err = result.unwrap_err();
    assert_eq!(err.diagnostics()[0].message, "undefined identifier `flot`");
    assert_eq!(
        err.diagnostics()[0].help.as_deref(),
        Some("did you mean `float`?")
    );
}

#[test]
fn errors_do_not_cascade_through_dependents() {
    // x = 1 + "a"; y = x + 1; z = y * 2
    let result = infer(|b| {
        let one = b.int(1);
        let a = b.string("a");
        let bad = b.binary(BinaryOp::Add, one, a);
        let x = b.var("x", bad);
        let xr = b.ident("x");
        let one = b.int(1);
        let y_init = b.binary(BinaryOp::Add, xr, one);
        let y = b.var("y", y_init);
        let yr = b.ident("y");
        let two = b.int(2);
        let z_init = b.binary(BinaryOp::Mul, yr, two);
        vec![x, y, b.var("z", z_init)]
    });
    assert_eq!(categories(&result), vec![Category::TypeMismatch]);
}

#[test]
fn independent_errors_are_all_reported_in_order() {
    let result = infer(|b| {
        let u = b.ident("nope");
        let s1 = b.expr_stmt(u);
        let one = b.int(1);
        let f = b.float(1.0);
        let bad = b.binary(BinaryOp::Sub, one, f);
        let s2 = b.expr_stmt(bad);
        let callee = b.ident("length");
        let call = b.call(callee, vec![]);
        vec![s1, s2, b.expr_stmt(call)]
    });
    assert_eq!(
        categories(&result),
        vec![
            Category::UnboundIdentifier,
            Category::TypeMismatch,
            Category::MissingRequiredLabel,
        ]
    );
}

#[test]
fn unresolved_variable_is_ambiguous() {
    // [] |> length()
    let mut empty_span = None;
    let result = infer(|b| {
        let empty = b.array(vec![]);
        empty_span = Some(empty.span);
        let callee = b.ident("length");
        let call = b.call(callee, vec![]);
        let piped = b.pipe(empty, call);
        vec![b.expr_stmt(piped)]
    });
    assert_eq!(categories(&result), vec![Category::AmbiguousType]);
    let err = result.unwrap_err();
    let span = empty_span.unwrap();
    let loc = err.diagnostics()[0].location.unwrap();
    assert_eq!((loc.start, loc.end), (span.start, span.end));
    assert_eq!(
        err.diagnostics()[0].message,
        "cannot infer a concrete type here: found `[A]`"
    );
}

#[test]
fn generic_bindings_are_not_ambiguous() {
    let typed = ok(infer(|b| {
        let empty = b.array(vec![]);
        let x = b.param("x");
        let xr = b.ident("x");
        let f = b.lambda(vec![x], xr);
        vec![b.var("e", empty), b.expr_stmt(f)]
    }));
    assert_eq!(scheme(&typed, "e"), "[A]");
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[test]
fn option_override_keeps_type() {
    let typed = ok(infer(|b| {
        let t = b.time(1_577_836_800_000_000_000);
        let f = b.lambda(vec![], t);
        vec![b.option("now", f)]
    }));
    assert_eq!(scheme(&typed, "now"), "() => time");

    let result = infer(|b| {
        let one = b.int(1);
        let f = b.lambda(vec![], one);
        vec![b.option("now", f)]
    });
    assert_eq!(categories(&result), vec![Category::TypeMismatch]);
}

#[test]
fn new_option_behaves_like_a_variable() {
    let typed = ok(infer(|b| {
        let s = b.string("db");
        vec![b.option("bucket", s)]
    }));
    assert_eq!(scheme(&typed, "bucket"), "string");
}

// ---------------------------------------------------------------------------
// Limits, cancellation, determinism, traces
// ---------------------------------------------------------------------------

#[test]
fn depth_limit_aborts_with_resource_diagnostic() {
    let config = InferConfig {
        max_depth: 8,
        ..InferConfig::default()
    };
    let result = infer_with(&config, |b| {
        let mut e = b.bool(true);
        for _ in 0..20 {
            e = b.unary(UnaryOp::Not, e);
        }
        vec![b.expr_stmt(e)]
    });
    assert_eq!(categories(&result), vec![Category::ResourceLimitExceeded]);
}

#[test]
fn thousands_of_unified_parameters_stay_flat() {
    const PARAMS: usize = 5_000;
    let typed = ok(infer(|b| {
        let names: Vec<String> = (0..PARAMS).map(|i| format!("p{i}")).collect();
        let params = names.iter().map(|n| b.param(n)).collect();
        let elements = names.iter().map(|n| b.ident(n)).collect();
        let arr = b.array(elements);
        let f = b.lambda(params, arr);
        vec![b.var("f", f)]
    }));
    let f = scheme(&typed, "f");
    assert!(f.starts_with("(p0: A, p1: A, p10: A"), "{f}");
    assert!(f.ends_with("p999: A) => [A]"), "{f}");
}

#[test]
fn limit_keeps_earlier_diagnostics() {
    let config = InferConfig {
        max_type_vars: 4,
        ..InferConfig::default()
    };
    let result = infer_with(&config, |b| {
        let u = b.ident("missing");
        let first = b.expr_stmt(u);
        let arrays: Vec<Expr> = (0..8).map(|_| b.array(vec![])).collect();
        let outer = b.array(arrays);
        vec![first, b.expr_stmt(outer)]
    });
    assert_eq!(
        categories(&result),
        vec![Category::UnboundIdentifier, Category::ResourceLimitExceeded]
    );
}

#[test]
fn constraint_limit_aborts() {
    let config = InferConfig {
        max_constraints: 3,
        ..InferConfig::default()
    };
    let result = infer_with(&config, |b| {
        let elems: Vec<Expr> = (0..10).map(|i| b.int(i)).collect();
        let arr = b.array(elems);
        vec![b.expr_stmt(arr)]
    });
    assert_eq!(categories(&result), vec![Category::ResourceLimitExceeded]);
}

#[test]
fn cancelled_before_start() {
    let mut b = AstBuilder::new(FileId(0));
    let one = b.int(1);
    let stmt = b.expr_stmt(one);
    let program = b.program(vec![stmt]);

    let flag = CancellationFlag::new();
    flag.cancel();
    let result = infer_program(&program, &build_prelude(), &InferConfig::default(), Some(&flag));
    assert!(matches!(result, Err(InferError::Cancelled)));
}

fn mixed_program(b: &mut AstBuilder) -> Vec<Stmt> {
    let body = b.ident("x");
    let id = define(b, "id", &["x"], body);
    let callee = b.ident("id");
    let one = b.int(1);
    let call = b.call(callee, vec![("x", one)]);
    let half = b.float(0.5);
    let bad = b.binary(BinaryOp::Add, call, half);
    let o = b.ident("unknown");
    let m = b.member(o, "field");
    vec![id, b.expr_stmt(bad), b.expr_stmt(m)]
}

#[test]
fn identical_input_gives_identical_diagnostics() {
    let first = infer(mixed_program).unwrap_err();
    let second = infer(mixed_program).unwrap_err();
    assert_eq!(first.diagnostics(), second.diagnostics());
    assert_eq!(first.diagnostics().len(), 2);
}

#[test]
fn identical_input_gives_identical_types() {
    let build = |b: &mut AstBuilder| {
        let body = b.ident("x");
        let id = define(b, "id", &["x"], body);
        let callee = b.ident("id");
        let s = b.string("a");
        let call = b.call(callee, vec![("x", s)]);
        vec![id, b.var("s", call)]
    };
    let first = ok(infer(build));
    let second = ok(infer(build));
    assert_eq!(first.node_types(), second.node_types());
    assert_eq!(first.bindings(), second.bindings());
}

#[test]
fn every_node_is_annotated() {
    let mut b = AstBuilder::new(FileId(0));
    let x = b.param("x");
    let xr = b.ident("x");
    let one = b.int(1);
    let sum = b.binary(BinaryOp::Add, xr, one);
    let f = b.lambda(vec![x], sum);
    let decl = b.var("inc", f);
    let program = b.program(vec![decl]);
    let typed = ok(infer_program(&program, &build_prelude(), &InferConfig::default(), None));
    assert_eq!(typed.node_types().len() as u32, b.node_count());
    assert!(typed.node_types().values().all(|t| !matches!(t, Type::Var(_))));
}

#[test]
fn traces_are_captured_on_request() {
    let config = InferConfig {
        trace: true,
        ..InferConfig::default()
    };
    let typed = ok(infer_with(&config, |b| {
        let one = b.int(1);
        let two = b.int(2);
        let sum = b.binary(BinaryOp::Add, one, two);
        vec![b.var("x", sum)]
    }));
    let rules: Vec<_> = typed.infer_trace().iter().map(|s| s.rule).collect();
    assert_eq!(
        rules,
        vec![
            crate::trace::InferRule::Literal,
            crate::trace::InferRule::Literal,
            crate::trace::InferRule::Binary,
            crate::trace::InferRule::Variable,
        ]
    );
    assert!(!typed.unify_trace().is_empty());

    let quiet = ok(infer(|b| {
        let one = b.int(1);
        vec![b.var("x", one)]
    }));
    assert!(quiet.infer_trace().is_empty());
    assert!(quiet.unify_trace().is_empty());
}

#[test]
fn generic_expression_statements_are_traced() {
    let config = InferConfig {
        trace: true,
        ..InferConfig::default()
    };
    let typed = ok(infer_with(&config, |b| {
        let x = b.param("x");
        let xr = b.ident("x");
        let f = b.lambda(vec![x], xr);
        vec![b.expr_stmt(f)]
    }));
    let last = typed.infer_trace().last().expect("trace is empty");
    assert_eq!(last.rule, crate::trace::InferRule::Generalize);
    assert_eq!(last.ty, "(x: A) => A");
}

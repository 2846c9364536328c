//! Generated inference workloads shared by the benchmarks and the metrics
//! binary. Every generator produces a well-typed program whose size grows
//! linearly with its argument.

use flux_ast::build::AstBuilder;
use flux_ast::{BinaryOp, Expr, FileId, Program, Stmt};

/// `x0 = 0`, then `xi = x(i-1) + i`.
pub fn numeric_chain(len: usize) -> Program {
    let mut b = AstBuilder::new(FileId(0));
    let mut body = Vec::with_capacity(len);
    let zero = b.int(0);
    body.push(b.var("x0", zero));
    for i in 1..len {
        let prev = b.ident(&format!("x{}", i - 1));
        let step = b.int(i as i64);
        let sum = b.binary(BinaryOp::Add, prev, step);
        body.push(b.var(&format!("x{i}"), sum));
    }
    b.program(body)
}

/// One query: `from |> range`, then `stages` alternating `filter` and
/// `map` steps, then `yield`.
pub fn pipeline(stages: usize) -> Program {
    let mut b = AstBuilder::new(FileId(0));

    let from = b.ident("from");
    let bucket = b.string("telegraf");
    let source = b.call(from, vec![("bucket", bucket)]);
    let range = b.ident("range");
    let start = b.duration(3_600_000_000_000);
    let ranged = b.call(range, vec![("start", start)]);
    let mut query = b.pipe(source, ranged);

    for i in 0..stages {
        let step = if i % 2 == 0 {
            filter_stage(&mut b, i)
        } else {
            map_stage(&mut b, i)
        };
        query = b.pipe(query, step);
    }

    let yield_fn = b.ident("yield");
    let name = b.string("out");
    let sink = b.call(yield_fn, vec![("name", name)]);
    let query = b.pipe(query, sink);
    let stmt = b.var("data", query);
    b.program(vec![stmt])
}

/// `filter(fn: (r) => r._value > i.0)`
fn filter_stage(b: &mut AstBuilder, i: usize) -> Expr {
    let r = b.param("r");
    let rr = b.ident("r");
    let value = b.member(rr, "_value");
    let bound = b.float(i as f64);
    let test = b.binary(BinaryOp::Gt, value, bound);
    let predicate = b.lambda(vec![r], test);
    let filter = b.ident("filter");
    b.call(filter, vec![("fn", predicate)])
}

/// `map(fn: (r) => ({r with si: r._value * 2.0}))`
fn map_stage(b: &mut AstBuilder, i: usize) -> Expr {
    let r = b.param("r");
    let rr = b.ident("r");
    let value = b.member(rr, "_value");
    let two = b.float(2.0);
    let scaled = b.binary(BinaryOp::Mul, value, two);
    let base = b.ident("r");
    let field = format!("s{i}");
    let extended = b.object_with(base, vec![(field.as_str(), scaled)]);
    let mapper = b.lambda(vec![r], extended);
    let map = b.ident("map");
    b.call(map, vec![("fn", mapper)])
}

/// Generic `id` and `pair` helpers, then `calls` instantiations of both at
/// alternating types.
pub fn polymorphic_calls(calls: usize) -> Program {
    let mut b = AstBuilder::new(FileId(0));
    let mut body = Vec::with_capacity(calls + 2);

    let x = b.param("x");
    let xr = b.ident("x");
    let id = b.lambda(vec![x], xr);
    body.push(b.var("id", id));

    let a = b.param("a");
    let c = b.param("b");
    let ar = b.ident("a");
    let cr = b.ident("b");
    let obj = b.object(vec![("fst", ar), ("snd", cr)]);
    let pair = b.lambda(vec![a, c], obj);
    body.push(b.var("pair", pair));

    for i in 0..calls {
        let first = if i % 2 == 0 {
            b.int(i as i64)
        } else {
            b.string("s")
        };
        let id_callee = b.ident("id");
        let first = b.call(id_callee, vec![("x", first)]);
        let second = b.bool(i % 3 == 0);
        let pair_callee = b.ident("pair");
        let call = b.call(pair_callee, vec![("a", first), ("b", second)]);
        body.push(b.var(&format!("p{i}"), call));
    }
    b.program(body)
}

/// `o0 = {a: 0}`, then `oi = {o(i-1) with fi: i}`, then a read of `a`
/// through the whole chain.
pub fn record_extensions(len: usize) -> Program {
    let mut b = AstBuilder::new(FileId(0));
    let mut body: Vec<Stmt> = Vec::with_capacity(len + 1);
    let zero = b.int(0);
    let base = b.object(vec![("a", zero)]);
    body.push(b.var("o0", base));
    for i in 1..len.max(1) {
        let prev = b.ident(&format!("o{}", i - 1));
        let value = b.int(i as i64);
        let field = format!("f{i}");
        let ext = b.object_with(prev, vec![(field.as_str(), value)]);
        body.push(b.var(&format!("o{i}"), ext));
    }
    let last = b.ident(&format!("o{}", len.max(1) - 1));
    let read = b.member(last, "a");
    body.push(b.var("a", read));
    b.program(body)
}

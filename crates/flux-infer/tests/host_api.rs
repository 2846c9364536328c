//! The surface a host embeds: shared preludes, configuration and
//! cancellation.

use std::thread;

use flux_ast::build::AstBuilder;
use flux_ast::{BinaryOp, FileId, Program};
use flux_infer::{
    CancellationFlag, Category, InferConfig, InferError, PreludeBuilder, TypeScheme,
    build_prelude, infer_program,
};
use flux_types::{FunctionType, Type};

/// `x{n} = n + {n}` followed by `s{n} = string(v: x{n})`.
fn numbered_program(file: u32, n: i64) -> Program {
    let mut b = AstBuilder::new(FileId(file));
    let l = b.int(n);
    let r = b.int(n);
    let sum = b.binary(BinaryOp::Add, l, r);
    let x = b.var(&format!("x{n}"), sum);
    let callee = b.ident("string");
    let arg = b.ident(&format!("x{n}"));
    let call = b.call(callee, vec![("v", arg)]);
    let s = b.var(&format!("s{n}"), call);
    b.program(vec![x, s])
}

#[test]
fn one_prelude_serves_many_threads() {
    let prelude = build_prelude();
    let config = InferConfig::default();

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let prelude = &prelude;
                let config = &config;
                scope.spawn(move || {
                    let program = numbered_program(n as u32, n);
                    infer_program(&program, prelude, config, None)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("inference thread panicked"))
            .collect()
    });

    for (n, result) in results.into_iter().enumerate() {
        let typed = result.unwrap_or_else(|e| panic!("program {n} failed:\n{e}"));
        assert_eq!(
            typed.binding(&format!("x{n}")).map(ToString::to_string).as_deref(),
            Some("int")
        );
        assert_eq!(
            typed.binding(&format!("s{n}")).map(ToString::to_string).as_deref(),
            Some("string")
        );
    }
}

#[test]
fn concurrent_runs_match_sequential_runs() {
    let prelude = build_prelude();
    let config = InferConfig::default();
    let sequential: Vec<_> = (0..4)
        .map(|n| {
            infer_program(&numbered_program(0, n), &prelude, &config, None)
                .map(|t| t.node_types().clone())
                .ok()
        })
        .collect();

    let concurrent: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let prelude = &prelude;
                let config = &config;
                scope.spawn(move || {
                    infer_program(&numbered_program(0, n), prelude, config, None)
                        .map(|t| t.node_types().clone())
                        .ok()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(sequential, concurrent);
}

#[test]
fn config_fills_missing_fields_with_defaults() {
    let config: InferConfig = serde_json::from_str(r#"{ "max_depth": 64 }"#).unwrap();
    assert_eq!(config.max_depth, 64);
    assert_eq!(config.max_type_vars, InferConfig::default().max_type_vars);
    assert_eq!(config.max_constraints, InferConfig::default().max_constraints);
    assert!(!config.trace);

    let empty: InferConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(empty, InferConfig::default());
}

#[test]
fn config_round_trips_through_json() {
    let config = InferConfig {
        max_depth: 32,
        trace: true,
        ..InferConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let back: InferConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn cancellation_from_another_handle() {
    let flag = CancellationFlag::new();
    let host_side = flag.clone();
    thread::scope(|scope| {
        scope.spawn(move || host_side.cancel());
    });

    let program = numbered_program(0, 1);
    let result = infer_program(&program, &build_prelude(), &InferConfig::default(), Some(&flag));
    assert!(matches!(result, Err(InferError::Cancelled)));
}

#[test]
fn untriggered_flag_does_not_interfere() {
    let flag = CancellationFlag::new();
    let program = numbered_program(0, 1);
    let result = infer_program(&program, &build_prelude(), &InferConfig::default(), Some(&flag));
    assert!(result.is_ok());
}

#[test]
fn library_signatures_are_visible_to_programs() {
    let mut builder = PreludeBuilder::with_builtins();
    builder
        .register(
            "percentile",
            TypeScheme::mono(Type::from(
                FunctionType::builder()
                    .pipe("values", Type::array(Type::FLOAT))
                    .required("q", Type::FLOAT)
                    .returns(Type::FLOAT),
            )),
        )
        .unwrap();
    let prelude = builder.build();

    let mut b = AstBuilder::new(FileId(0));
    let half = b.float(0.5);
    let values = b.array(vec![half]);
    let callee = b.ident("percentile");
    let q = b.float(0.99);
    let call = b.call(callee, vec![("q", q)]);
    let piped = b.pipe(values, call);
    let p = b.var("p", piped);
    let program = b.program(vec![p]);

    let typed = infer_program(&program, &prelude, &InferConfig::default(), None).unwrap();
    assert_eq!(typed.binding("p").map(ToString::to_string).as_deref(), Some("float"));

    // The stock prelude does not know it.
    let err = infer_program(&program, &build_prelude(), &InferConfig::default(), None)
        .unwrap_err();
    assert_eq!(err.diagnostics()[0].category, Category::UnboundIdentifier);
}

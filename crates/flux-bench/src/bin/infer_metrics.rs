//! Runs every workload with tracing enabled and reports how much solver
//! work each one takes, as JSON on stdout or in the file given as the first
//! argument.

use std::path::PathBuf;
use std::time::Instant;

use flux_ast::Program;
use flux_bench::{numeric_chain, pipeline, polymorphic_calls, record_extensions};
use flux_infer::{InferConfig, Prelude, build_prelude, infer_program};
use serde::Serialize;

#[derive(Serialize)]
struct WorkloadMetric {
    name: &'static str,
    size: usize,
    statements: usize,
    typed_nodes: usize,
    unify_steps: usize,
    infer_steps: usize,
    micros: u128,
}

#[derive(Serialize)]
struct Report {
    workloads: Vec<WorkloadMetric>,
    total_unify_steps: usize,
}

type Generator = fn(usize) -> Program;

const WORKLOADS: [(&str, Generator, &[usize]); 4] = [
    ("numeric_chain", numeric_chain, &[16, 64, 256]),
    ("pipeline", pipeline, &[4, 16, 64]),
    ("polymorphic_calls", polymorphic_calls, &[16, 64, 256]),
    ("record_extensions", record_extensions, &[8, 32, 128]),
];

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let prelude = build_prelude();
    let config = InferConfig {
        trace: true,
        ..InferConfig::default()
    };

    let mut workloads = Vec::new();
    for (name, generate, sizes) in WORKLOADS {
        for &size in sizes {
            workloads.push(measure(name, size, &generate(size), &prelude, &config)?);
        }
    }
    let total_unify_steps = workloads.iter().map(|w| w.unify_steps).sum();
    let report = Report {
        workloads,
        total_unify_steps,
    };

    let json = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("failed to serialize metrics: {err}"))?;

    if let Some(path) = std::env::args().nth(1) {
        let path = PathBuf::from(path);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|err| format!("failed to create `{}`: {err}", parent.display()))?;
        }
        std::fs::write(&path, json)
            .map_err(|err| format!("failed to write `{}`: {err}", path.display()))?;
    } else {
        println!("{json}");
    }

    Ok(())
}

fn measure(
    name: &'static str,
    size: usize,
    program: &Program,
    prelude: &Prelude,
    config: &InferConfig,
) -> Result<WorkloadMetric, String> {
    let started = Instant::now();
    let typed = infer_program(program, prelude, config, None)
        .map_err(|err| format!("workload `{name}` ({size}) failed to check: {err}"))?;
    let micros = started.elapsed().as_micros();

    Ok(WorkloadMetric {
        name,
        size,
        statements: program.body.len(),
        typed_nodes: typed.node_types().len(),
        unify_steps: typed.unify_trace().len(),
        infer_steps: typed.infer_trace().len(),
        micros,
    })
}

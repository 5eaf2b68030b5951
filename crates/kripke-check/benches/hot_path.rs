//! Exploration hot-path benchmarks

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use kripke_check::{StructureIndex, Verifier, VerifyConfig};
use kripke_core::{Cost, Edge, Expr, Node, PathExpr, PathOp, Quantity, Structure, Value};

fn ring(n: usize) -> Structure {
    let nodes: Vec<Node> = (0..n)
        .map(|i| Node::read(format!("S{i}"), false, [("ok", Value::Bool(true))]))
        .collect();
    let cost = Cost::new(Quantity::new(1, -6), Quantity::zero());
    let edges = nodes
        .iter()
        .enumerate()
        .map(|(i, from)| {
            (
                from.clone(),
                vec![Edge::new(nodes[(i + 1) % n].clone(), cost.clone())],
            )
        })
        .collect();
    Structure::new(edges, vec![nodes[0].clone()])
}

fn bench_index_build(c: &mut Criterion) {
    let structure = ring(1000);
    c.bench_function("index_build_1000", |b| {
        b.iter(|| StructureIndex::build(&structure).unwrap())
    });
}

fn bench_globally_over_ring(c: &mut Criterion) {
    let mut group = c.benchmark_group("ag_ring");
    for n in [10usize, 100, 1000] {
        let structure = ring(n);
        let requirement = Expr::always(PathExpr::new(PathOp::Globally(Expr::var_eq("ok", true))));
        group.bench_with_input(BenchmarkId::from_parameter(n), &structure, |b, s| {
            let verifier = Verifier::new(VerifyConfig::default());
            b.iter(|| verifier.verify(s, std::slice::from_ref(&requirement)).unwrap())
        });
    }
    group.finish();
}

fn bench_finally_over_ring(c: &mut Criterion) {
    // the goal sits at the last node of the ring, forcing a full unroll
    let n = 500;
    let nodes: Vec<Node> = (0..n)
        .map(|i| Node::read(format!("S{i}"), false, [("ok", Value::Bool(i == n - 1))]))
        .collect();
    let cost = Cost::new(Quantity::new(1, -6), Quantity::zero());
    let edges = nodes
        .iter()
        .enumerate()
        .map(|(i, from)| {
            (
                from.clone(),
                vec![Edge::new(nodes[(i + 1) % n].clone(), cost.clone())],
            )
        })
        .collect();
    let structure = Structure::new(edges, vec![nodes[0].clone()]);
    let requirement = Expr::always(PathExpr::new(PathOp::Finally(Expr::var_eq("ok", true))));
    c.bench_function("af_ring_500", |b| {
        let verifier = Verifier::new(VerifyConfig::default());
        b.iter(|| verifier.verify(&structure, std::slice::from_ref(&requirement)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_index_build,
    bench_globally_over_ring,
    bench_finally_over_ring
);
criterion_main!(benches);

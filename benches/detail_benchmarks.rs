//! Benchmarks for detailing synthetic modules.
//!
//! Each workload builds its tree once per iteration in a fresh arena, so the
//! numbers include tree construction; `build_only` measures that part alone.
//!
//! ```bash
//! cargo bench --bench detail_benchmarks
//! cargo bench --bench detail_benchmarks --features profiling
//! ```

use bumpalo::Bump;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use tessera::core::{BinaryOperator, NativeType};
use tessera::syntax::{RootNode, Stmt};
use tessera::{AstBuilder, Session};

/// `count` classes, each deriving from the previous one and adding three
/// overloads of its own `mix` method, plus a driver calling every overload.
fn class_hierarchy<'ast>(b: &AstBuilder<'ast>, count: usize) -> &'ast RootNode<'ast> {
    let mut statements: Vec<Stmt<'ast>> = Vec::with_capacity(count + 1);
    let mut calls = Vec::new();
    for index in 0..count {
        let name = format!("Node{index}");
        let method = format!("mix{index}");
        let parents = if index == 0 {
            Vec::new()
        } else {
            vec![b.ty_named(&format!("Node{}", index - 1))]
        };
        let members = [
            b.field_member(b.field("weight", Some(b.ty_int()), Some(b.int(index as i64)))),
            b.method_member(b.function(
                &method,
                &[b.param("v", b.ty_int())],
                Some(b.ty_int()),
                &[b.ret(Some(b.fetch("v")))],
            )),
            b.method_member(b.function(
                &method,
                &[b.param("v", b.ty_native(NativeType::Double))],
                Some(b.ty_native(NativeType::Double)),
                &[b.ret(Some(b.fetch("v")))],
            )),
            b.method_member(b.function(
                &method,
                &[b.param("a", b.ty_int()), b.param("b", b.ty_int())],
                Some(b.ty_int()),
                &[b.ret(Some(b.binary(b.fetch("a"), BinaryOperator::Add, b.fetch("b"))))],
            )),
        ];
        statements.push(b.class_stmt(b.class(&name, &parents, &members)));

        let local = format!("n{index}");
        calls.push(b.var(&local, Some(b.ty_named(&name)), None));
        calls.push(b.expr_stmt(b.call(b.member(b.fetch(&local), &method), &[b.int(2)])));
        calls.push(b.expr_stmt(b.call(b.member(b.fetch(&local), &method), &[b.double(2.5)])));
        calls.push(b.expr_stmt(b.call(b.member(b.fetch(&local), &method), &[b.int(2), b.int(3)])));
    }
    statements.push(b.function_stmt(b.function("drive", &[], None, &calls)));
    b.root(&statements)
}

/// `count` free functions summing their arguments, called in a chain.
fn function_chain<'ast>(b: &AstBuilder<'ast>, count: usize) -> &'ast RootNode<'ast> {
    let mut statements = Vec::with_capacity(count);
    for index in 0..count {
        let body = if index == 0 {
            vec![b.ret(Some(b.fetch("x")))]
        } else {
            let previous = b.call(b.fetch(&format!("f{}", index - 1)), &[b.fetch("x")]);
            vec![b.ret(Some(b.binary(previous, BinaryOperator::Mul, b.int(2))))]
        };
        statements.push(b.function_stmt(b.function(
            &format!("f{index}"),
            &[b.param("x", b.ty_int())],
            Some(b.ty_int()),
            &body,
        )));
    }
    b.root(&statements)
}

fn bench_class_hierarchy(c: &mut Criterion) {
    let mut group = c.benchmark_group("class_hierarchy");
    for count in [10usize, 50, 200] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |bench, &count| {
            bench.iter(|| {
                let arena = Bump::new();
                let b = AstBuilder::new(&arena);
                let root = class_hierarchy(&b, count);
                let program = Session::new(&arena).detail_root(root).expect("detailing succeeds");
                black_box(program.graph.item_count())
            });
        });
    }
    group.finish();
}

fn bench_function_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("function_chain");
    for count in [100usize, 1000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |bench, &count| {
            bench.iter(|| {
                let arena = Bump::new();
                let b = AstBuilder::new(&arena);
                let root = function_chain(&b, count);
                let program = Session::new(&arena).detail_root(root).expect("detailing succeeds");
                Session::validate(&program).expect("valid");
                black_box(program.handles.len())
            });
        });
    }
    group.finish();
}

fn bench_build_only(c: &mut Criterion) {
    c.bench_function("build_only/class_hierarchy_200", |bench| {
        bench.iter(|| {
            let arena = Bump::new();
            let b = AstBuilder::new(&arena);
            black_box(class_hierarchy(&b, 200).statements.len())
        });
    });
}

criterion_group!(benches, bench_class_hierarchy, bench_function_chain, bench_build_only);
criterion_main!(benches);

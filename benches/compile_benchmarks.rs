//! Performance benchmarks for the tern compilation pipeline.
//!
//! Programs are generated directly as trees, so only registration and
//! code generation are measured:
//! - Size-based: many small functions
//! - Class-heavy: deep and wide hierarchies with overriding methods
//! - Control flow: nested loops and switches
//!
//! ## Profiling with Puffin
//!
//! Run with the `profile-with-puffin` feature to collect per-pass timings:
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use tern::ast::{AstBuilder, BinaryOp, Item, Program};
use tern::{Bump, CompilerOptions, Unit};

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

/// Call at the end of each benchmark iteration to flush profiling data.
#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

// ============================================================================
// Program generators
// ============================================================================

/// `count` functions `f_i(a, b) int`, each calling the previous one.
fn functions_program<'a>(b: &AstBuilder<'a>, count: usize) -> Program<'a> {
    let mut items: Vec<Item<'a>> = Vec::with_capacity(count + 1);
    for i in 0..count {
        let params = vec![b.param("a", b.ty("int")), b.param("c", b.ty("int"))];
        let sum = b.binary(
            b.binary(b.name("a"), BinaryOp::Mul, b.int(i as i64)),
            BinaryOp::Add,
            b.name("c"),
        );
        let value = if i == 0 {
            sum
        } else {
            b.call_named(&format!("f_{}", i - 1), vec![sum, b.name("c")])
        };
        items.push(b.function(
            &format!("f_{i}"),
            params,
            Some(b.ty("int")),
            vec![
                b.var("t", Some(b.ty("float")), Some(value)),
                b.ret(Some(b.cast(b.name("t"), b.ty("int")))),
            ],
        ));
    }
    items.push(b.function("main", vec![], None, vec![]));
    b.program(vec![b.module("functions.tn", items)])
}

/// A chain of `depth` classes, each overriding `step` and adding a field.
fn hierarchy_program<'a>(b: &AstBuilder<'a>, depth: usize) -> Program<'a> {
    let mut items: Vec<Item<'a>> = Vec::with_capacity(depth + 1);
    for i in 0..depth {
        let name = format!("C{i}");
        let base = format!("C{}", i.saturating_sub(1));
        let bases: Vec<&str> = if i == 0 { vec![] } else { vec![base.as_str()] };
        let step = b.method(
            "step",
            vec![b.param("n", b.ty("int"))],
            Some(b.ty("int")),
            vec![b.ret(Some(b.binary(b.name("n"), BinaryOp::Add, b.int(i as i64))))],
        );
        items.push(b.class(
            &name,
            &bases,
            vec![b.field(&format!("x{i}"), b.ty("int"))],
            vec![step],
        ));
    }
    let last = format!("C{}", depth.saturating_sub(1));
    items.push(b.function(
        "main",
        vec![b.param("args", b.array_ty(b.array_ty(b.ty("char"))))],
        Some(b.ty("int")),
        vec![
            b.var("o", Some(b.ptr(b.ty(&last))), Some(b.new_object(b.ty(&last), vec![]))),
            b.ret(Some(b.method_call(b.name("o"), "step", vec![b.int(1)]))),
        ],
    ));
    b.program(vec![b.module("classes.tn", items)])
}

/// Nested `for` loops around a `switch`, `count` times over.
fn control_flow_program<'a>(b: &AstBuilder<'a>, count: usize) -> Program<'a> {
    let mut body = vec![b.var("total", Some(b.ty("int")), Some(b.int(0)))];
    for _ in 0..count {
        let switch = b.switch_stmt(
            b.name("j"),
            vec![
                b.case(vec![b.int(0), b.int(1)], vec![b.fallthrough()]),
                b.case(
                    vec![b.int(2)],
                    vec![b.expr_stmt(b.assign(
                        b.name("total"),
                        b.binary(b.name("total"), BinaryOp::Add, b.name("i")),
                    ))],
                ),
            ],
            Some(vec![b.brk()]),
        );
        let inner = b.for_stmt(
            Some(b.var("j", Some(b.ty("int")), Some(b.int(0)))),
            Some(b.binary(b.name("j"), BinaryOp::Less, b.int(4))),
            Some(b.assign(b.name("j"), b.binary(b.name("j"), BinaryOp::Add, b.int(1)))),
            vec![switch],
        );
        body.push(b.for_stmt(
            Some(b.var("i", Some(b.ty("int")), Some(b.int(0)))),
            Some(b.binary(b.name("i"), BinaryOp::Less, b.int(10))),
            Some(b.assign(b.name("i"), b.binary(b.name("i"), BinaryOp::Add, b.int(1)))),
            vec![inner],
        ));
    }
    body.push(b.ret(Some(b.name("total"))));
    b.program(vec![b.module(
        "loops.tn",
        vec![b.function("main", vec![], Some(b.ty("int")), body)],
    )])
}

fn build(program: &Program<'_>) -> usize {
    let mut unit = Unit::new(CompilerOptions::default());
    for module in program.modules {
        unit.add_module(*module).unwrap();
    }
    unit.build().unwrap();
    end_profiling_frame();
    unit.text().map_or(0, str::len)
}

// ============================================================================
// Benchmarks
// ============================================================================

fn size_based_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let mut group = c.benchmark_group("compile/functions");
    for count in [10, 100, 1000] {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let program = functions_program(&b, count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &program, |bench, program| {
            bench.iter(|| black_box(build(black_box(program))));
        });
    }
    group.finish();
}

fn class_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let mut group = c.benchmark_group("compile/hierarchy_depth");
    for depth in [4, 32, 128] {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let program = hierarchy_program(&b, depth);
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &program, |bench, program| {
            bench.iter(|| black_box(build(black_box(program))));
        });
    }
    group.finish();
}

fn control_flow_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let program = control_flow_program(&b, 50);
    c.bench_function("compile/nested_loops_50", |bench| {
        bench.iter(|| black_box(build(black_box(&program))));
    });
}

criterion_group!(
    benches,
    size_based_benchmarks,
    class_benchmarks,
    control_flow_benchmarks
);
criterion_main!(benches);

//! Trampoline dispatch benchmarks.
//!
//! # Benchmark Categories
//!
//! 1. **Direct call**: the implementation called without a trampoline
//! 2. **Warm dispatch**: trampoline with the signature already cached
//! 3. **Polymorphic dispatch**: trampoline alternating between signatures
//! 4. **Cold dispatch**: every call misses and runs the pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lumen_interp::ReferenceFrontend;
use lumen_ir::{Callable, FunctionDef, IrLevel, Node, Value};
use lumen_pipeline::{Pass, PassOutput};
use lumen_specialize::{Annotated, Optimizer};
use std::sync::Arc;

// =============================================================================
// Benchmark Helpers
// =============================================================================

fn annotated_add() -> (Optimizer, Annotated) {
    let frontend = Arc::new(ReferenceFrontend::new());
    let optimizer = Optimizer::new(frontend);
    optimizer
        .register(Pass::new("identity", IrLevel::UntypedAnalyzed, |_, f| {
            Ok(PassOutput::Fragment(f))
        }))
        .expect("register");
    let def = FunctionDef::new("add", &["a", "b"], Node::call("+", vec![Node::local("a"), Node::local("b")]));
    let annotated = optimizer.annotate_function_definition(&def, None).expect("annotate");
    (optimizer, annotated)
}

fn call(callable: &Callable, args: &[Value]) -> Value {
    callable.call(black_box(args)).expect("call")
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    let (optimizer, annotated) = annotated_add();
    let ints = [Value::Int(1), Value::Int(2)];
    let floats = [Value::Float(1.0), Value::Float(2.0)];

    // Warm the cache for both signatures.
    call(annotated.public(), &ints);
    call(annotated.public(), &floats);

    group.bench_function("direct", |b| {
        b.iter(|| call(annotated.implementation(), &ints))
    });

    group.bench_function("warm", |b| b.iter(|| call(annotated.public(), &ints)));

    group.bench_function("polymorphic", |b| {
        b.iter(|| {
            call(annotated.public(), &ints);
            call(annotated.public(), &floats)
        })
    });

    group.bench_function("cold", |b| {
        b.iter(|| {
            optimizer.cache().clear();
            call(annotated.public(), &ints)
        })
    });

    group.finish();
}

fn bench_arity(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_arity");
    let frontend = Arc::new(ReferenceFrontend::new());
    let optimizer = Optimizer::new(frontend);
    optimizer
        .register(Pass::new("identity", IrLevel::Lowered, |_, f| Ok(PassOutput::Fragment(f))))
        .expect("register");

    for arity in [1usize, 2, 4, 8] {
        let params: Vec<String> = (0..arity).map(|i| format!("p{}", i)).collect();
        let params: Vec<&str> = params.iter().map(String::as_str).collect();
        let def = FunctionDef::new(&format!("f{}", arity), &params, Node::local("p0"));
        let annotated = optimizer.annotate_function_definition(&def, None).expect("annotate");
        let args: Vec<Value> = (0..arity as i64).map(Value::Int).collect();
        call(annotated.public(), &args);

        group.bench_with_input(BenchmarkId::from_parameter(arity), &args, |b, args| {
            b.iter(|| call(annotated.public(), args))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dispatch, bench_arity);
criterion_main!(benches);

//! Benchmarks for lockup boundary costs
//!
//! Measures the overhead the boundary adds to calls which succeed, which are
//! rejected at binding, and which are apprehended, plus sealed attribute
//! access and error production through the registry.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lockup::{
    arguments, create_namespace, definitions, Descriptor, ExtraData, Fault, Interceptor,
    Invocable, MutableAttributeGuard, Registry, Routine, Signature, Subject, Value,
};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
struct Overflow;

impl fmt::Display for Overflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("overflow")
    }
}

impl Error for Overflow {}

fn add() -> Routine {
    Routine::new(
        Descriptor::function("bench", "add")
            .with_signature(Signature::new().positional("a").positional("b")),
        |arguments| {
            let a = arguments.positional()[0].as_integer().unwrap_or_default();
            let b = arguments.positional()[1].as_integer().unwrap_or_default();
            a.checked_add(b).map(Value::Integer).ok_or_else(|| Fault::new(Overflow))
        },
    )
}

// ============================================================================
// Interception
// ============================================================================

fn bench_interception(c: &mut Criterion) {
    let mut group = c.benchmark_group("interception");
    let bare = add();
    let wrapped = Interceptor::ours().intercept(add()).unwrap();

    group.bench_function("bare_call", |b| {
        b.iter(|| black_box(bare.call(arguments![black_box(2), black_box(3)])))
    });

    group.bench_function("returned", |b| {
        b.iter(|| black_box(wrapped.invoke(arguments![black_box(2), black_box(3)])))
    });

    group.bench_function("rejected_at_binding", |b| {
        b.iter(|| black_box(wrapped.invoke(arguments![1, 2, 3])))
    });

    group.bench_function("apprehended", |b| {
        b.iter(|| black_box(wrapped.invoke(arguments![i64::MAX, 1])))
    });

    group.finish();
}

fn bench_nesting(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_interception");
    for depth in [1usize, 2, 4, 8] {
        let mut wrapped: Arc<dyn Invocable> = Arc::new(add());
        for _ in 0..depth {
            wrapped = Arc::new(Interceptor::ours().intercept(wrapped).unwrap());
        }
        group.bench_with_input(BenchmarkId::from_parameter(depth), &wrapped, |b, wrapped| {
            b.iter(|| black_box(wrapped.call(arguments![2, 3])))
        });
    }
    group.finish();
}

// ============================================================================
// Sealed Entities
// ============================================================================

fn bench_sealed_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("sealed_access");
    let namespace = create_namespace([("answer", 42), ("limit", 1024)]).unwrap();

    group.bench_function("read", |b| {
        b.iter(|| black_box(namespace.attribute(black_box("limit"))))
    });

    group.bench_function("assign_rejected", |b| {
        b.iter(|| black_box(namespace.assign_attribute(black_box("limit"), Value::Integer(1))))
    });

    group.bench_function("directory", |b| b.iter(|| black_box(namespace.directory())));

    group.finish();
}

// ============================================================================
// Registry
// ============================================================================

fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");
    let registry = Registry::ours();

    group.bench_function("raise", |b| {
        b.iter(|| {
            black_box(registry.raise(
                &definitions::ATTRIBUTE_IMMUTABILITY,
                arguments!["limit", Subject::module("bench")],
            ))
        })
    });

    group.bench_function("produce_with_extra_data", |b| {
        b.iter(|| {
            black_box(registry.produce(
                "attribute_indelibility",
                arguments!["limit", Subject::module("bench")],
                ExtraData::new().with_label("ticket", "BENCH-1"),
            ))
        })
    });

    group.bench_function("diagnostic_log", |b| {
        let error = registry.raise(&definitions::INVALID_STATE, arguments!["Bench."]);
        b.iter(|| {
            let mut buffer = String::with_capacity(256);
            error.diagnostic_log().write_to(&mut buffer).ok();
            black_box(buffer)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_interception,
    bench_nesting,
    bench_sealed_access,
    bench_registry
);
criterion_main!(benches);

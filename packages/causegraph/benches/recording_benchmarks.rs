//! Recording-hook throughput
//!
//! The hooks sit on the analysis hot path, so the interesting numbers are
//! the first-insert cost, the dedup-hit cost, and the context push/pop.

use causegraph::{EdgeRecorder, Fact, FlowId, MethodId, TypeId};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn m(i: u32) -> Fact {
    Fact::MethodReachable(MethodId(i))
}

fn bench_register_edge(c: &mut Criterion) {
    let mut group = c.benchmark_group("register_edge");

    group.bench_function("fresh_insert", |b| {
        let recorder = EdgeRecorder::new();
        let mut i = 0u32;
        b.iter(|| {
            i = i.wrapping_add(1);
            recorder.register_edge(black_box(Some(m(i))), black_box(m(i.wrapping_add(1))));
        });
    });

    group.bench_function("dedup_hit", |b| {
        let recorder = EdgeRecorder::new();
        recorder.register_edge(Some(m(1)), m(2));
        b.iter(|| {
            recorder.register_edge(black_box(Some(m(1))), black_box(m(2)));
        });
    });

    group.bench_function("conjunctive", |b| {
        let recorder = EdgeRecorder::new();
        let mut i = 0u32;
        b.iter(|| {
            i = i.wrapping_add(1);
            recorder.register_conjunctive_edge(
                black_box(Some(m(i))),
                black_box(Some(Fact::TypeInstantiated(TypeId(i)))),
                black_box(Fact::MethodImplementationInvoked(MethodId(i))),
            );
        });
    });

    group.finish();
}

fn bench_context(c: &mut Criterion) {
    let mut group = c.benchmark_group("context");

    group.bench_function("push_and_release", |b| {
        let recorder = EdgeRecorder::new();
        recorder.reset_cause();
        b.iter(|| {
            let scope = recorder.push_cause(black_box(m(7)));
            black_box(recorder.current_cause());
            drop(scope);
        });
    });

    group.bench_function("null_cause_resolution", |b| {
        let recorder = EdgeRecorder::new();
        recorder.reset_cause();
        let _scope = recorder.push_cause(m(1));
        let mut i = 0u32;
        b.iter(|| {
            i = i.wrapping_add(1);
            recorder.register_edge(black_box(None), black_box(m(i)));
        });
    });

    group.finish();
}

fn bench_heap_flow(c: &mut Criterion) {
    c.bench_function("register_heap_flow", |b| {
        let recorder = EdgeRecorder::new();
        let cause = Fact::UnknownHeapObject(TypeId(3));
        let mut i = 0u32;
        b.iter(|| {
            i = i.wrapping_add(1);
            recorder.register_heap_flow(
                black_box(cause.clone()),
                black_box(FlowId(i % 64)),
                black_box(TypeId(i % 512)),
            );
        });
    });
}

criterion_group!(benches, bench_register_edge, bench_context, bench_heap_flow);
criterion_main!(benches);

//! Benchmarks for clock and delivery hot paths

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use causa_clock::{LogicalClock, ProcessRegistry, ScalarClock, VectorClock};
use causa_core::{Envelope, ProcessId, ScalarTimestamp, Sequence, VectorTimestamp};
use causa_fifo::FifoBroadcast;
use causa_runtime::{SystemConfig, VectorSystem};
use causa_test::{ChaosBus, ChaosSystem};

fn registry(count: usize) -> ProcessRegistry {
    let mut registry = ProcessRegistry::new();
    for i in 0..count {
        // Ids are unique by construction
        let _ = registry.register(ProcessId::new(format!("P{}", i)));
    }
    registry
}

fn bench_scalar_merge(c: &mut Criterion) {
    let mut clock = ScalarClock::new(ProcessId::new("P0"));
    let received = ScalarTimestamp::new(42);

    c.bench_function("scalar_merge", |b| {
        b.iter(|| black_box(clock.merge_on_receive(black_box(received))))
    });
}

fn bench_vector_merge(c: &mut Criterion) {
    let registry = registry(16);
    let mut clock = VectorClock::new(ProcessId::new("P0"), &registry);
    let received = VectorTimestamp::from_entries(registry.ids().map(|id| (id.clone(), 7)));

    c.bench_function("vector_merge_16", |b| {
        b.iter(|| black_box(clock.merge_on_receive(black_box(&received))))
    });
}

fn bench_vector_compare(c: &mut Criterion) {
    let registry = registry(16);
    let mut p0 = VectorClock::for_process(ProcessId::new("P0"), &registry);
    let mut p1 = VectorClock::for_process(ProcessId::new("P1"), &registry);
    let a = p0.tick();
    let b = p1.tick();

    c.bench_function("vector_compare_16", |bench| {
        bench.iter(|| black_box(a.compare(black_box(&b))))
    });
}

fn bench_fifo_reversed_window(c: &mut Criterion) {
    let sender = ProcessId::new("P1");
    let envelopes: Vec<Envelope<ScalarTimestamp, u64>> = (1..=64)
        .rev()
        .map(|seq| Envelope::new(sender.clone(), Sequence::new(seq), seq, ScalarTimestamp::new(seq)))
        .collect();

    c.bench_function("fifo_reversed_64", |b| {
        b.iter_batched(
            || (FifoBroadcast::new(ProcessId::new("P2")), envelopes.clone()),
            |(mut fifo, envelopes)| {
                let mut delivered = 0;
                for envelope in envelopes {
                    if let Ok(ready) = fifo.on_receive(envelope) {
                        delivered += ready.len();
                    }
                }
                black_box(delivered)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_system_broadcast_round(c: &mut Criterion) {
    c.bench_function("system_broadcast_8x8", |b| {
        b.iter(|| {
            let mut system: VectorSystem<u32> = VectorSystem::new();
            let ids: Vec<ProcessId> = (0..8).map(|i| ProcessId::new(format!("P{}", i))).collect();
            for id in &ids {
                let _ = system.create_process(id.clone());
            }
            for id in &ids {
                let _ = system.broadcast_message(id, 1);
            }
            black_box(system.run_until_idle())
        })
    });
}

fn bench_chaos_broadcast_round(c: &mut Criterion) {
    c.bench_function("chaos_broadcast_8x8", |b| {
        b.iter(|| {
            let mut system: ChaosSystem<VectorClock, u32> =
                ChaosSystem::with_bus(SystemConfig::default(), ChaosBus::hostile(5));
            let ids: Vec<ProcessId> = (0..8).map(|i| ProcessId::new(format!("P{}", i))).collect();
            for id in &ids {
                let _ = system.create_process(id.clone());
            }
            for id in &ids {
                let _ = system.broadcast_message(id, 1);
            }
            black_box(system.run_until_idle())
        })
    });
}

criterion_group!(
    benches,
    bench_scalar_merge,
    bench_vector_merge,
    bench_vector_compare,
    bench_fifo_reversed_window,
    bench_system_broadcast_round,
    bench_chaos_broadcast_round,
);
criterion_main!(benches);

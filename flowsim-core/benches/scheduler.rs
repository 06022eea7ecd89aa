use criterion::{
    BenchmarkGroup, Criterion, Throughput, black_box, criterion_group, criterion_main,
    measurement::WallTime,
};
use flowsim_core::{scheduler::Scheduler, time::SimTime};
use std::time::Duration;

fn schedule_then_drain(group: &mut BenchmarkGroup<'_, WallTime>, size: u64) {
    group.throughput(Throughput::Elements(size));
    group.bench_function(format!("{size} events"), |b| {
        b.iter(|| {
            let mut scheduler = Scheduler::new();
            // spread over 1s with plenty of simultaneous events
            for i in 0..size {
                scheduler.schedule_at(SimTime::from_micros((i * 7_919) % 1_000_000 / 10), i);
            }
            while let Some(fired) = scheduler.pop() {
                black_box(fired.event);
            }
        })
    });
}

fn drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain");

    for size in [1_000, 10_000, 100_000] {
        schedule_then_drain(&mut group, size);
    }

    group.finish();
}

fn cancel(c: &mut Criterion) {
    c.bench_function("schedule and cancel half", |b| {
        b.iter(|| {
            let mut scheduler = Scheduler::new();
            let ids: Vec<_> = (0..10_000u64)
                .map(|i| scheduler.schedule_after(Duration::from_micros(i), i))
                .collect();
            for id in ids.iter().step_by(2) {
                scheduler.cancel(*id);
            }
            while let Some(fired) = scheduler.pop() {
                black_box(fired.event);
            }
        })
    });
}

criterion_group!(benches, drain, cancel);
criterion_main!(benches);

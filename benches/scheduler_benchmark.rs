//! Scheduler benchmarks for diffdeck
//!
//! This benchmark suite measures:
//! - Cost of one `iterate()` call as the number of queues grows
//! - Draining many small tasks from a single queue
//! - Queue registration and removal churn

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use diffdeck::document::DocumentId;
use diffdeck::domain::task::{AggregateScheduler, OnceTask, SchedulerQueue, Step, TaskFn};

fn scheduler_with_queues(queues: usize) -> AggregateScheduler {
    let mut scheduler = AggregateScheduler::new();
    for _ in 0..queues {
        let queue = SchedulerQueue::new().shared();
        queue
            .borrow_mut()
            .add_task(TaskFn::new("spin", || Ok(Step::progress("working"))));
        scheduler
            .add_queue(DocumentId::new(), queue)
            .expect("fresh ids never collide");
    }
    scheduler
}

/// Benchmark a single step against a growing number of queues
fn bench_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");

    for queues in [1, 10, 100, 1000] {
        let mut scheduler = scheduler_with_queues(queues);
        group.bench_with_input(BenchmarkId::from_parameter(queues), &queues, |b, _| {
            b.iter(|| black_box(scheduler.iterate()));
        });
    }

    group.finish();
}

/// Benchmark draining a queue of one-step tasks
fn bench_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain");

    for tasks in [100u64, 1000, 10_000] {
        group.throughput(Throughput::Elements(tasks));
        group.bench_with_input(BenchmarkId::from_parameter(tasks), &tasks, |b, &tasks| {
            b.iter(|| {
                let mut scheduler = AggregateScheduler::new();
                let queue = SchedulerQueue::new().shared();
                for _ in 0..tasks {
                    queue.borrow_mut().add_task(OnceTask::new("unit", || Ok(())));
                }
                scheduler
                    .add_queue(DocumentId::new(), queue)
                    .expect("fresh ids never collide");
                while scheduler.has_pending() {
                    scheduler.iterate();
                }
                black_box(scheduler.statistics())
            });
        });
    }

    group.finish();
}

/// Benchmark registering and removing queues
fn bench_registration(c: &mut Criterion) {
    c.bench_function("add_remove_queue", |b| {
        let mut scheduler = scheduler_with_queues(50);
        b.iter(|| {
            let id = DocumentId::new();
            scheduler
                .add_queue(id, SchedulerQueue::new().shared())
                .expect("fresh ids never collide");
            black_box(scheduler.remove_queue(id).is_ok())
        });
    });
}

criterion_group!(benches, bench_iterate, bench_drain, bench_registration);
criterion_main!(benches);

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use status_updater::sender::{Envelope, form_body};
use status_updater::{BatchMode, Event, EventKind, EventQueue};
use std::sync::Arc;
use std::thread;

fn benchmark_push_then_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_push_drain");

    for size in [16usize, 256, 4096] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("drain_all", size), &size, |b, &size| {
            let queue = EventQueue::new();
            b.iter(|| {
                for i in 0..size {
                    queue.push(Event::new(EventKind::ProgressUpdated, i.to_string()));
                }
                std::hint::black_box(queue.take_batch(BatchMode::Drain { max_events: 0 }))
            });
        });

        group.bench_with_input(BenchmarkId::new("single", size), &size, |b, &size| {
            let queue = EventQueue::new();
            b.iter(|| {
                for i in 0..size {
                    queue.push(Event::new(EventKind::Message, i.to_string()));
                }
                while !queue.take_batch(BatchMode::Single).is_empty() {}
            });
        });
    }

    group.finish();
}

fn benchmark_contended_producers(c: &mut Criterion) {
    c.bench_function("four_producers_1k_events", |b| {
        b.iter(|| {
            let queue = Arc::new(EventQueue::new());
            let producers: Vec<_> = (0..4)
                .map(|_| {
                    let queue = Arc::clone(&queue);
                    thread::spawn(move || {
                        for i in 0..250 {
                            queue.push(Event::new(EventKind::Message, i.to_string()));
                        }
                    })
                })
                .collect();

            let mut received = 0;
            while received < 1000 {
                received += queue.take_batch(BatchMode::Drain { max_events: 64 }).len();
            }
            for producer in producers {
                producer.join().ok();
            }
            std::hint::black_box(received)
        });
    });
}

fn benchmark_envelope_encoding(c: &mut Criterion) {
    let posts: Vec<Event> = (0..32)
        .map(|i| Event::new(EventKind::FileModified, format!("/var/data/run/output_{i}.dat")))
        .collect();
    let client_key = "k".repeat(40);

    c.bench_function("envelope_32_events", |b| {
        b.iter(|| {
            let json = Envelope::new("item-1", &client_key, std::hint::black_box(&posts))
                .to_json()
                .unwrap_or_default();
            form_body(&json)
        });
    });
}

criterion_group!(
    benches,
    benchmark_push_then_drain,
    benchmark_contended_producers,
    benchmark_envelope_encoding
);
criterion_main!(benches);

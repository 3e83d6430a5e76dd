use std::{cell::Cell, hint::black_box, rc::Rc, time::Duration};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use potok::{Publisher, Subscription};

/// Подвешивает `fan_out` слушателей-счётчиков на издатель.
fn build_fan_out(
    publisher: &Publisher<i64>,
    fan_out: usize,
) -> (Vec<Subscription<i64>>, Rc<Cell<u64>>) {
    let counter = Rc::new(Cell::new(0u64));
    let subs = (0..fan_out)
        .map(|_| {
            let counter = counter.clone();
            publisher.subscribe(false).consume(move |v: &i64| {
                counter.set(counter.get() + *v as u64);
                Ok(())
            })
        })
        .collect();
    (subs, counter)
}

/// Строит цепочку filter -> map глубины `depth` с хвостовым счётчиком.
fn build_chain(
    publisher: &Publisher<i64>,
    depth: usize,
) -> (Subscription<i64>, Rc<Cell<u64>>) {
    let counter = Rc::new(Cell::new(0u64));
    let root = publisher.subscribe(false);
    let mut tail = root.filter(|_| Ok(true));
    for _ in 0..depth {
        tail = tail.map(|v: &i64| Ok(v + 1));
    }
    let tail = {
        let counter = counter.clone();
        tail.consume(move |v| {
            counter.set(counter.get() + *v as u64);
            Ok(())
        })
    };
    (tail, counter)
}

pub fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish");
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(80);

    // --- Fan-out: одна публикация на N корневых подписок ---
    for fan_out in [1usize, 8, 64, 256] {
        group.throughput(Throughput::Elements(fan_out as u64));
        group.bench_with_input(
            BenchmarkId::new("fan_out", fan_out),
            &fan_out,
            |b, &fan_out| {
                let publisher = Publisher::new();
                let (_subs, counter) = build_fan_out(&publisher, fan_out);
                b.iter(|| {
                    publisher.publish(black_box(1));
                    black_box(counter.get());
                });
            },
        );
    }

    // --- Глубина цепочки операторов (с мостами map) ---
    for depth in [1usize, 4, 16] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("chain_depth", depth),
            &depth,
            |b, &depth| {
                let publisher = Publisher::new();
                let (_tail, counter) = build_chain(&publisher, depth);
                b.iter(|| {
                    publisher.publish(black_box(1));
                    black_box(counter.get());
                });
            },
        );
    }

    group.finish();
}

pub fn bench_teardown(c: &mut Criterion) {
    let mut group = c.benchmark_group("teardown");
    group.sample_size(60);

    // Каскадная отписка листа под цепочкой глубины N
    for depth in [4usize, 16, 64] {
        group.bench_with_input(
            BenchmarkId::new("cascade_depth", depth),
            &depth,
            |b, &depth| {
                b.iter(|| {
                    let publisher = Publisher::<i64>::new();
                    let root = publisher.subscribe(false);
                    let mut tail = root.filter(|_| Ok(true));
                    for _ in 0..depth {
                        tail = tail.filter(|_| Ok(true));
                    }
                    tail.unsubscribe();
                    black_box(publisher.subscriber_count());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_publish, bench_teardown);
criterion_main!(benches);

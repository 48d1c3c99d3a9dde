//! Atomic strategy benchmarks.
//!
//! Compares the lock-free and trivial strategies on the operations the
//! thread lifecycle leans on.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use strand_core::atomic::{AtomicOps, FlagOps, Ordering, lockfree, trivial};

/// Per-batch ns/op figures, summarised once criterion is done with a bench.
#[derive(Default)]
struct OpSamples(Vec<f64>);

impl OpSamples {
    fn push(&mut self, iters: u64, elapsed: Duration) {
        self.0.push(elapsed.as_nanos() as f64 / iters.max(1) as f64);
    }

    fn print(mut self, strategy: &str, op: &str) {
        if self.0.is_empty() {
            return;
        }
        self.0.sort_by(f64::total_cmp);
        let fastest = self.0[0];
        let median = self.0[self.0.len() / 2];
        let slowest = self.0[self.0.len() - 1];
        println!(
            "ATOMIC_BENCH strategy={strategy} op={op} batches={} min_ns={fastest:.2} median_ns={median:.2} max_ns={slowest:.2}",
            self.0.len()
        );
    }
}

/// Times `op` under `iter_custom`, then prints its ns/op spread.
fn bench_op<V>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    name: &str,
    strategy: &str,
    value: &V,
    op: impl Fn(&V),
) {
    let samples = RefCell::new(OpSamples::default());
    group.bench_function(BenchmarkId::new(name, strategy), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                op(black_box(value));
            }
            let elapsed = start.elapsed().max(Duration::from_nanos(1));
            samples.borrow_mut().push(iters, elapsed);
            elapsed
        });
    });
    samples.into_inner().print(strategy, name);
}

fn bench_atomics(c: &mut Criterion) {
    let mut group = c.benchmark_group("atomic");
    group.throughput(Throughput::Elements(1));

    let lf = lockfree::AtomicValue::<u64>::new(0);
    let tv = trivial::AtomicValue::<u64>::new(0);

    bench_op(&mut group, "increment", "lockfree", &lf, |v| {
        black_box(v.increment(Ordering::AcqRel));
    });
    bench_op(&mut group, "increment", "trivial", &tv, |v| {
        black_box(v.increment(Ordering::AcqRel));
    });

    bench_op(&mut group, "compare_exchange", "lockfree", &lf, |v| {
        let seen = v.load(Ordering::Relaxed);
        let _ = black_box(v.compare_exchange(seen, seen.wrapping_add(1), Ordering::AcqRel));
    });
    bench_op(&mut group, "compare_exchange", "trivial", &tv, |v| {
        let seen = v.load(Ordering::Relaxed);
        let _ = black_box(v.compare_exchange(seen, seen.wrapping_add(1), Ordering::AcqRel));
    });

    let lf_flag = lockfree::AtomicFlag::new();
    let tv_flag = trivial::AtomicFlag::new();
    bench_op(&mut group, "flag_test_and_set", "lockfree", &lf_flag, |f| {
        black_box(f.test_and_set(Ordering::AcqRel));
        f.clear(Ordering::Release);
    });
    bench_op(&mut group, "flag_test_and_set", "trivial", &tv_flag, |f| {
        black_box(f.test_and_set(Ordering::AcqRel));
        f.clear(Ordering::Release);
    });

    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(1))
        .measurement_time(Duration::from_secs(2))
        .sample_size(100);
    targets = bench_atomics
);
criterion_main!(benches);

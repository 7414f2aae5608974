use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use std::time::{Duration, Instant};
use tacho_core::{EncoderConfig, EstimatorCfg, EstimatorState, IntervalLimits, RpmEstimator};

// Jittered pulse gaps around a nominal period, with an occasional glitch
fn synth_intervals(n: usize, nominal_s: f64, seed: u32) -> Vec<f64> {
    let mut state = seed.max(1);
    let mut next_f64 = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0)
    };
    (0..n)
        .map(|i| {
            let jitter = (next_f64() * 2.0 - 1.0) * 0.02 * nominal_s;
            if i % 37 == 0 { nominal_s * 10.0 } else { nominal_s + jitter }
        })
        .collect()
}

pub fn bench_estimate(c: &mut Criterion) {
    let mut g = c.benchmark_group("estimator");
    //   BENCH_SAMPLE_SIZE=10 cargo bench -p tacho_core --bench estimator
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }

    let enc = EncoderConfig::new(1000, 0.0, 3000.0).unwrap();
    let cfg = EstimatorCfg::default();
    let intervals = synth_intervals(50, 0.001, 0xC0FFEE);

    g.bench_function("estimate_window", |b| {
        let mut est = RpmEstimator::new(&enc, &cfg);
        b.iter(|| black_box(est.estimate(black_box(&intervals))));
    });

    // Full capture burst then one tick, as the workers see it
    g.bench_function("capture_and_tick", |b| {
        let limits = IntervalLimits::new(&enc, cfg.stall_timeout);
        let mut est = RpmEstimator::new(&enc, &cfg);
        b.iter_batched(
            || EstimatorState::from_cfg(&cfg),
            |mut st| {
                let mut t = Instant::now();
                for &dt in &intervals {
                    t += Duration::from_secs_f64(dt);
                    st.record_pulse(t, &limits);
                }
                black_box(est.tick(&mut st, t));
            },
            BatchSize::SmallInput,
        )
    });
    g.finish();
}

criterion_group!(estimator, bench_estimate);
criterion_main!(estimator);

//! Criterion benchmarks for the hot paths: the bar loop, the ledger, and
//! indicator computation.

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tapelab_core::domain::{Bar, Portfolio, RiskLimits, Side};
use tapelab_core::engine::{BacktestEngine, EngineConfig, ExecutionConfig};
use tapelab_core::indicators::{rolling_std, rsi, sma};
use tapelab_core::strategy::SmaCrossover;

fn make_bars(n: usize) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            Bar {
                timestamp: start + Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000.0 + (i % 500_000) as f64,
            }
        })
        .collect()
}

fn bench_bar_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("bar_loop");

    for &bar_count in &[252, 1260, 2520] {
        let bars = make_bars(bar_count);
        group.bench_with_input(
            BenchmarkId::new("sma_crossover", bar_count),
            &bar_count,
            |b, _| {
                b.iter(|| {
                    let mut strategy = SmaCrossover::new(10, 30).unwrap();
                    let mut engine = BacktestEngine::new(EngineConfig::with_execution(
                        100_000.0,
                        ExecutionConfig::new(0.005, 0.001),
                    ));
                    engine
                        .run(&mut strategy, black_box(&bars), "BENCH", None, None)
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_ledger(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger");
    let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let limits = RiskLimits {
        max_position_notional: f64::MAX,
        max_portfolio_risk: 0.02,
    };

    group.bench_function("open_close_1000_round_trips", |b| {
        b.iter(|| {
            let mut portfolio = Portfolio::new(1_000_000.0, limits.clone());
            for i in 0..1000u32 {
                let price = 100.0 + (i % 10) as f64;
                portfolio
                    .open_or_add("BENCH", Side::Long, 10.0, price, t0)
                    .unwrap();
                portfolio.mark("BENCH", price + 1.0);
                portfolio.close("BENCH", price + 1.0, t0);
            }
            black_box(&portfolio);
        });
    });

    group.finish();
}

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");

    for &n in &[252, 2520] {
        let closes: Vec<f64> = make_bars(n).iter().map(|b| b.close).collect();
        group.bench_with_input(BenchmarkId::new("sma_20", n), &n, |b, _| {
            b.iter(|| sma(black_box(&closes), 20));
        });
        group.bench_with_input(BenchmarkId::new("rolling_std_20", n), &n, |b, _| {
            b.iter(|| rolling_std(black_box(&closes), 20));
        });
        group.bench_with_input(BenchmarkId::new("rsi_14", n), &n, |b, _| {
            b.iter(|| rsi(black_box(&closes), 14));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_bar_loop, bench_ledger, bench_indicators);
criterion_main!(benches);

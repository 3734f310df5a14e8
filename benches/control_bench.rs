// Benchmark for power quantization and the per-tick control path
// Run with: cargo bench

use criterion::{criterion_group, criterion_main, Criterion};
use kettle_rs::actuator::PowerActuator;
use kettle_rs::controller::{HysteresisController, PhaseThreshold, PhaseThresholds};
use kettle_rs::hardware::Polarity;
use kettle_rs::notify::TracingNotifier;
use kettle_rs::power::PowerLevel;
use kettle_rs::registry::SharedActuator;
use kettle_rs::sensor::Setpoint;
use kettle_simulator::{SimVessel, VesselParams};
use std::hint::black_box;
use std::sync::Arc;

fn thresholds() -> PhaseThresholds {
    PhaseThresholds::new(&[
        PhaseThreshold::new(5.0, 2.0),
        PhaseThreshold::new(10.0, 5.0),
        PhaseThreshold::new(15.0, 8.0),
    ])
    .unwrap()
}

fn bench_quantize(c: &mut Criterion) {
    let requests: Vec<f64> = (0..10_000).map(|i| f64::from(i % 120) - 10.0).collect();
    c.bench_function("quantize 10k requests", |b| {
        b.iter(|| {
            let mut max = PowerLevel::Off;
            for r in &requests {
                max = max.max(PowerLevel::quantize(Some(black_box(*r))));
            }
            assert_eq!(max, PowerLevel::Max);
        });
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let thresholds = thresholds();
    c.bench_function("evaluate 10k offsets", |b| {
        b.iter(|| {
            let mut active = 0;
            for i in 0..10_000 {
                let offset = f64::from(i % 40) - 10.0;
                active += thresholds.evaluate(black_box(offset)).iter().filter(|on| **on).count();
            }
            black_box(active);
        });
    });
}

fn bench_tick(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let vessel = SimVessel::new(VesselParams::default(), 60.0, &[1, 2, 3], false);
    let mut actuator = PowerActuator::new(
        "bench",
        &[1, 2, 3],
        Polarity::High,
        Box::new(vessel.clone()),
        Arc::new(TracingNotifier),
    )
    .unwrap();
    actuator.init();
    let shared: SharedActuator = Arc::new(tokio::sync::Mutex::new(actuator));
    let mut controller = HysteresisController::new("bench", thresholds(), shared, vessel, Setpoint::new(72.0));
    c.bench_function("controller tick", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(controller.tick().await);
            });
        });
    });
}

criterion_group!(benches, bench_quantize, bench_evaluate, bench_tick);
criterion_main!(benches);

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use delaycomp::{
    base::{Epoch, ObservationSettings},
    coords::J2000Converter,
    engine::DelayCalculator,
};
use std::{hint::black_box, time::Duration};

const NR_EPOCHS: u64 = 128;

fn benchmark_calculator(c: &mut Criterion) {
    let settings =
        ObservationSettings::from_json_str(include_str!("../demos/observation.json")).unwrap();

    let calculator = DelayCalculator::new(&settings, "DE601", J2000Converter::new()).unwrap();

    calculator.session().prepare().unwrap();

    let mut snapshot = calculator.template();

    let mut group = c.benchmark_group("calculator_bench");

    group
        .significance_level(0.05)
        .sample_size(50)
        .measurement_time(Duration::from_secs(5));

    group.throughput(Throughput::Elements(NR_EPOCHS));
    group.bench_function("calc_delays", |b| {
        b.iter(|| {
            for idx in 0..NR_EPOCHS {
                black_box(
                    calculator
                        .calc_delays(Epoch::new(idx * settings.block_size))
                        .unwrap(),
                );
            }
        })
    });

    group.bench_function("calc_delays_session", |b| {
        b.iter(|| {
            let mut session = calculator.session();

            for idx in 0..NR_EPOCHS {
                session
                    .compute(Epoch::new(idx * settings.block_size), &mut snapshot)
                    .unwrap();

                black_box(&snapshot);
            }
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_calculator);
criterion_main!(benches);

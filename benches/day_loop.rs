use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, Criterion};
use episim::prelude::*;
use episim::Intervention;

fn initialize() -> Context {
    let nr_ages = 100;
    let top = (nr_ages - 1) as u8;
    let mut rng = RandomPool::new(42);
    let population = Population::new(&vec![1000; nr_ages], &mut rng).unwrap();
    let rows = vec![
        ContactRow::new((0, top), (0, top), ContactPlace::Home, 4.0),
        ContactRow::new((0, top), (0, top), ContactPlace::Leisure, 3.0),
        ContactRow::new((0, 19), (0, 19), ContactPlace::School, 6.0),
        ContactRow::new((20, 64), (20, 64), ContactPlace::Work, 5.0),
    ];
    let contacts = ContactMatrix::new(&rows, nr_ages).unwrap();
    let disease = Disease::new(DiseaseParams::default(), Vec::new()).unwrap();
    let healthcare = HealthcareSystem::new(1000, 100);
    let start_date = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
    let mut context = Context::new(population, contacts, disease, healthcare, start_date, rng);
    context
        .add_intervention_on_day(
            0,
            Intervention::ImportInfections {
                amount: 100,
                variant: None,
            },
        )
        .unwrap();
    context
}

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("day loop 100k people 30 days", |bencher| {
        bencher.iter_with_large_drop(|| {
            let mut context = initialize();
            for _ in 0..30 {
                context.iterate().unwrap();
            }
            context
        });
    });
}

criterion_group!(day_loop_benches, criterion_benchmark);
criterion_main!(day_loop_benches);

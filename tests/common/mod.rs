//! Shared builders for the end-to-end tests.

use chrono::NaiveDate;
use episim::prelude::*;

pub const START_DATE: &str = "2020-03-01";

pub fn start_date() -> NaiveDate {
    START_DATE.parse().unwrap()
}

pub fn date_on_day(day: u32) -> NaiveDate {
    start_date() + chrono::Duration::days(i64::from(day))
}

/// A plausible venue mix over `nr_ages` one-year age classes.
pub fn contact_rows(nr_ages: usize) -> Vec<ContactRow> {
    let top = (nr_ages - 1) as u8;
    let mut rows = vec![
        ContactRow::new((0, top), (0, top), ContactPlace::Home, 4.0),
        ContactRow::new((0, top), (0, top), ContactPlace::Leisure, 2.0),
        ContactRow::new((0, top), (0, top), ContactPlace::Transport, 1.0),
        ContactRow::new((0, top), (0, top), ContactPlace::Other, 1.0),
    ];
    if nr_ages > 20 {
        rows.push(ContactRow::new((0, 19), (0, 19), ContactPlace::School, 6.0));
        rows.push(ContactRow::new(
            (20, top.min(64)),
            (20, top.min(64)),
            ContactPlace::Work,
            5.0,
        ));
    }
    rows
}

/// Uniform population, default wild-type disease, no interventions.
pub fn build_context(per_age: u32, nr_ages: usize, beds: u32, icu: u32, seed: u64) -> Context {
    let mut rng = RandomPool::new(seed);
    let population = Population::new(&vec![per_age; nr_ages], &mut rng).unwrap();
    let contacts = ContactMatrix::new(&contact_rows(nr_ages), nr_ages).unwrap();
    let disease = Disease::new(DiseaseParams::default(), Vec::new()).unwrap();
    let healthcare = HealthcareSystem::new(beds, icu);
    Context::new(population, contacts, disease, healthcare, start_date(), rng)
}

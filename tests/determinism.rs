//! Fixed-seed reproducibility of the per-day state sequence.

mod common;

use common::{build_context, date_on_day};
use episim::prelude::*;

fn run_days(seed: u64, days: u32) -> Vec<String> {
    let mut ctx = build_context(100, 50, 100, 10, seed);
    ctx.add_intervention(
        date_on_day(0),
        Intervention::ImportInfections {
            amount: 10,
            variant: None,
        },
    )
    .unwrap();
    ctx.add_intervention(date_on_day(3), Intervention::TestAllWithSymptoms)
        .unwrap();

    let mut states = Vec::new();
    for _ in 0..days {
        ctx.iterate().unwrap();
        states.push(serde_json::to_string(&ctx.generate_state()).unwrap());
    }
    states
}

#[test]
fn same_seed_same_day_by_day_states() {
    let first = run_days(42, 30);
    let second = run_days(42, 30);
    assert_eq!(first, second);
}

#[test]
fn different_seed_different_course() {
    let first = run_days(42, 30);
    let second = run_days(43, 30);
    assert_ne!(first, second);
}

#[test]
fn no_interventions_leave_the_defaults_untouched() {
    let mut ctx = build_context(100, 20, 10, 2, 9);
    for _ in 0..60 {
        ctx.iterate().unwrap();
        let state = ctx.generate_state();
        assert_eq!(ctx.healthcare().testing_mode(), TestingMode::NoTesting);
        assert_eq!(state.mobility_limitation, 0.0);
        assert_eq!(state.tests_run_per_day, 0);
    }
}

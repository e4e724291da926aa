//! End-to-end scenario runs with distributional assertions on documented
//! bounds.

mod common;

use common::{build_context, date_on_day};
use episim::prelude::*;

#[test]
fn dormant_epidemic_changes_nothing() {
    let mut ctx = build_context(100, 100, 2600, 300, 42);
    for _ in 0..90 {
        ctx.iterate().unwrap();
    }
    let state = ctx.generate_state();
    assert_eq!(state.total_susceptible(), 10_000);
    assert_eq!(state.total_infected(), 0);
    assert_eq!(state.total_dead(), 0);
    assert_eq!(state.total_all_infected(), 0);
    assert_eq!(state.exposed_per_day, 0);
    for age in 0..100 {
        assert_eq!(state.susceptible[age], 100);
    }
}

#[test]
fn single_seed_produces_a_bounded_outbreak() {
    let mut ctx = build_context(100, 100, 2600, 300, 42);
    ctx.add_intervention(
        date_on_day(0),
        Intervention::ImportInfections {
            amount: 1,
            variant: None,
        },
    )
    .unwrap();
    for _ in 0..30 {
        ctx.iterate().unwrap();
    }
    let state = ctx.generate_state();
    assert!(state.total_all_infected() >= 1);
    assert!(state.total_dead() <= state.total_all_infected());
}

#[test]
fn lockdown_shrinks_the_outbreak() {
    let run = |lockdown: bool| {
        let mut ctx = build_context(100, 100, 2600, 300, 42);
        ctx.add_intervention(
            date_on_day(0),
            Intervention::ImportInfections {
                amount: 20,
                variant: None,
            },
        )
        .unwrap();
        if lockdown {
            ctx.add_intervention(
                date_on_day(5),
                Intervention::LimitMobility {
                    reduction: 80,
                    place: None,
                    min_age: None,
                    max_age: None,
                },
            )
            .unwrap();
        }
        let mut limitation_on_day_5 = 0.0;
        let mut r_on_day_30 = 0.0;
        for day in 0..60 {
            ctx.iterate().unwrap();
            if day == 5 {
                limitation_on_day_5 = ctx.generate_state().mobility_limitation;
            }
            if day == 30 {
                r_on_day_30 = ctx.generate_state().r;
            }
        }
        (ctx.generate_state(), limitation_on_day_5, r_on_day_30)
    };

    let (baseline, baseline_limitation, baseline_r) = run(false);
    let (lockdown, lockdown_limitation, lockdown_r) = run(true);

    assert_eq!(baseline_limitation, 0.0);
    assert!((lockdown_limitation - 0.80).abs() < 1e-9);
    assert!(
        lockdown.total_all_infected() < baseline.total_all_infected(),
        "lockdown {} vs baseline {}",
        lockdown.total_all_infected(),
        baseline.total_all_infected()
    );
    // Mid-growth reproduction numbers: suppression never exceeds free spread.
    assert!(lockdown_r <= baseline_r);
}

#[test]
fn capacity_overwhelm_kills_without_icu() {
    let mut ctx = build_context(500, 100, 5, 0, 42);
    ctx.add_intervention(
        date_on_day(0),
        Intervention::ImportInfectionsWeekly {
            weekly_amount: 100,
            variant: None,
        },
    )
    .unwrap();
    for _ in 0..60 {
        ctx.iterate().unwrap();
        let state = ctx.generate_state();
        assert!(state.available_hospital_beds <= 5);
        assert_eq!(state.in_icu.iter().sum::<u32>(), 0);
    }
    let state = ctx.generate_state();
    assert!(state.total_dead() > 0);
    assert!(state.total_all_infected() > 500);
    // With no ICU capacity nobody survives critical or fatal care.
    for person in ctx.people() {
        if person.symptom_severity >= SymptomSeverity::Critical {
            assert_ne!(person.state, PersonState::InIcu);
        }
    }
}

#[test]
fn contact_tracing_feeds_the_testing_pipeline() {
    let mut ctx = build_context(100, 100, 2600, 300, 42);
    ctx.add_intervention(
        date_on_day(0),
        Intervention::ImportInfections {
            amount: 5,
            variant: None,
        },
    )
    .unwrap();
    ctx.add_intervention(
        date_on_day(0),
        Intervention::TestWithContactTracing { efficiency: 100 },
    )
    .unwrap();

    let mut total_tests = 0;
    let mut total_traced = 0;
    for _ in 0..40 {
        ctx.iterate().unwrap();
        let state = ctx.generate_state();
        total_tests += state.tests_run_per_day;
        total_traced += state.ct_cases_per_day;
    }
    let state = ctx.generate_state();
    assert_eq!(ctx.healthcare().testing_mode(), TestingMode::AllWithSymptomsCT);
    assert!(total_tests > 0);
    assert!(state.all_detected.iter().sum::<u32>() > 0);
    // With perfect tracing every detection with a known infector queues it.
    assert!(total_traced > 0);
}

#[test]
fn vaccination_covers_the_targeted_ages_only() {
    let mut ctx = build_context(100, 100, 2600, 300, 42);
    ctx.add_intervention(
        date_on_day(0),
        Intervention::ImportInfections {
            amount: 1,
            variant: None,
        },
    )
    .unwrap();
    ctx.add_intervention(
        date_on_day(10),
        Intervention::Vaccinate {
            weekly_vaccinations: 7000,
            min_age: 70,
            max_age: 99,
        },
    )
    .unwrap();
    for _ in 0..30 {
        ctx.iterate().unwrap();
    }
    let state = ctx.generate_state();
    let vaccinated_70_plus: u32 = state.vaccinated[70..].iter().sum();
    let vaccinated_below_70: u32 = state.vaccinated[..70].iter().sum();
    // 20 program days at 1000/day saturate the 3000-person bracket, short of
    // the few who died or were detected first.
    assert!(vaccinated_70_plus >= 2950, "got {vaccinated_70_plus}");
    assert!(vaccinated_70_plus <= 3000);
    assert_eq!(vaccinated_below_70, 0);
}

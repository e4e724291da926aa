//! Invariants that must hold after every successful day.

mod common;

use common::{build_context, date_on_day};
use episim::prelude::*;

fn check_invariants(
    ctx: &Context,
    per_age: u32,
    previous: Option<&SimulationState>,
) -> SimulationState {
    let state = ctx.generate_state();
    let nr_ages = state.susceptible.len();

    // Conservation: every person is in exactly one compartment.
    for age in 0..nr_ages {
        let sum = state.susceptible[age]
            + state.infected[age]
            + state.recovered[age]
            + state.dead[age];
        assert_eq!(sum, per_age, "conservation broken at age {age}");
    }

    // Cumulative counters dominate their current counterparts.
    for age in 0..nr_ages {
        assert!(
            state.all_infected[age]
                >= state.infected[age] + state.recovered[age] + state.dead[age],
            "all_infected fell behind at age {age}"
        );
        assert!(state.all_detected[age] >= state.detected[age]);
    }

    // Healthcare capacity bounds.
    assert!(state.available_hospital_beds <= ctx.healthcare().beds());
    assert!(state.available_icu_units <= state.total_icu_units);

    // Per-person consistency and care accounting.
    let mut in_ward = 0;
    let mut in_icu = 0;
    let mut exposed_sum: u64 = 0;
    for person in ctx.people() {
        let infected_state = matches!(
            person.state,
            PersonState::Incubation
                | PersonState::Illness
                | PersonState::Hospitalized
                | PersonState::InIcu
        );
        assert_eq!(
            person.is_infected, infected_state,
            "is_infected out of sync for person {}",
            person.idx
        );
        match person.state {
            PersonState::Hospitalized => in_ward += 1,
            PersonState::InIcu => in_icu += 1,
            _ => {}
        }
        exposed_sum += u64::from(person.other_people_exposed_today);
    }
    assert_eq!(
        in_ward,
        ctx.healthcare().beds() - state.available_hospital_beds
    );
    assert_eq!(in_icu, state.total_icu_units - state.available_icu_units);

    // Venue counts never exceed the exposures that produced them.
    let venue_total: u32 = state.daily_contacts.values().sum();
    assert_eq!(venue_total, state.exposed_per_day);
    assert!(u64::from(venue_total) <= exposed_sum);

    // Day-over-day monotonicity of cumulative series.
    if let Some(previous) = previous {
        for age in 0..nr_ages {
            assert!(state.all_infected[age] >= previous.all_infected[age]);
            assert!(state.all_detected[age] >= previous.all_detected[age]);
            assert!(state.dead[age] >= previous.dead[age]);
            assert!(state.recovered[age] >= previous.recovered[age]);
            assert!(state.vaccinated[age] >= previous.vaccinated[age]);
        }
    }
    state
}

#[test]
fn invariants_hold_through_a_busy_epidemic() {
    let mut ctx = build_context(100, 100, 40, 6, 1234);
    ctx.add_intervention(
        date_on_day(0),
        Intervention::ImportInfections {
            amount: 20,
            variant: None,
        },
    )
    .unwrap();
    ctx.add_intervention(date_on_day(2), Intervention::TestAllWithSymptoms)
        .unwrap();
    ctx.add_intervention(
        date_on_day(10),
        Intervention::LimitMobility {
            reduction: 40,
            place: Some(ContactPlace::Leisure),
            min_age: None,
            max_age: None,
        },
    )
    .unwrap();
    ctx.add_intervention(
        date_on_day(12),
        Intervention::WearMasks {
            share_of_contacts: 70,
            place: None,
            min_age: Some(20),
            max_age: Some(64),
        },
    )
    .unwrap();
    ctx.add_intervention(
        date_on_day(15),
        Intervention::Vaccinate {
            weekly_vaccinations: 700,
            min_age: 60,
            max_age: 99,
        },
    )
    .unwrap();

    let mut previous: Option<SimulationState> = None;
    for _ in 0..70 {
        ctx.iterate().unwrap();
        let state = check_invariants(&ctx, 100, previous.as_ref());
        previous = Some(state);
    }
    // The epidemic actually happened; the invariants were not vacuous.
    let last = previous.unwrap();
    assert!(last.total_all_infected() > 20);
    assert!(last.all_detected.iter().sum::<u32>() > 0);
}

#[test]
fn invariants_hold_with_contact_tracing_and_scarce_beds() {
    let mut ctx = build_context(200, 50, 3, 1, 77);
    ctx.add_intervention(
        date_on_day(0),
        Intervention::ImportInfectionsWeekly {
            weekly_amount: 35,
            variant: None,
        },
    )
    .unwrap();
    ctx.add_intervention(
        date_on_day(1),
        Intervention::TestWithContactTracing { efficiency: 60 },
    )
    .unwrap();

    let mut previous: Option<SimulationState> = None;
    for _ in 0..50 {
        ctx.iterate().unwrap();
        let state = check_invariants(&ctx, 200, previous.as_ref());
        previous = Some(state);
    }
    assert!(previous.unwrap().total_all_infected() > 0);
}

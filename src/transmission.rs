//! The contact/exposure engine.
//!
//! For every infectious, undetected person the engine draws a daily contact
//! count from the lognormal-scaled expectation for their age, picks each
//! contact's venue and age interval from the cumulative contact table, picks
//! a concrete person in that interval from the age index, and runs the
//! per-exposure infection draw with mask aversion.

use crate::context::Context;
use crate::error::{ProblemKind, SimulationProblem};
use crate::healthcare::{self, TestingMode};
use crate::population::{bump, PersonIdx, PersonState, MAX_CONTACTS, MAX_INFECTEES};

/// Scale and cap for contact counts while visibly symptomatic: sick people
/// stay home.
const SYMPTOMATIC_CONTACT_FACTOR: f64 = 0.5;
const SYMPTOMATIC_CONTACT_LIMIT: i64 = 5;
/// Scale and cap while incubating or asymptomatic.
const NORMAL_CONTACT_FACTOR: f64 = 1.0;
const NORMAL_CONTACT_LIMIT: i64 = 100;

/// Exposes other people to one infectious person for one day.
pub(crate) fn expose_others(ctx: &mut Context, idx: PersonIdx) -> Result<(), SimulationProblem> {
    let (age, variant_idx, severity, state, day_offset) = {
        let person = &ctx.population.people[idx as usize];
        let Some(day_offset) = person.infectious_day_offset() else {
            return Err(SimulationProblem::with_person(ProblemKind::WrongState, idx));
        };
        (
            person.age,
            person.variant_idx,
            person.symptom_severity,
            person.state,
            day_offset,
        )
    };

    let visible_symptoms = state == PersonState::Illness && severity.is_symptomatic();
    let (factor, limit) = if visible_symptoms {
        (SYMPTOMATIC_CONTACT_FACTOR, SYMPTOMATIC_CONTACT_LIMIT)
    } else {
        (NORMAL_CONTACT_FACTOR, NORMAL_CONTACT_LIMIT)
    };

    let avg_contacts = ctx.contacts.avg_contacts(age);
    let mut nr_contacts = (factor * ctx.rng.lognormal(0.0, 0.5) * avg_contacts).floor() as i64;
    nr_contacts = nr_contacts.max(1) - 1;
    nr_contacts = nr_contacts.min(limit);
    if let Some(cap) = ctx.contacts.mass_gathering_limit() {
        nr_contacts = nr_contacts.min(i64::from(cap));
    }
    if nr_contacts < 0 {
        return Err(SimulationProblem::with_person(
            ProblemKind::NegativeContacts,
            idx,
        ));
    }
    if nr_contacts > MAX_CONTACTS {
        return Err(SimulationProblem::with_person(
            ProblemKind::TooManyContacts,
            idx,
        ));
    }
    let nr_contacts = nr_contacts as u32;

    let source_infectiousness = {
        let variant = ctx.disease.variant(variant_idx);
        let mut weight = variant.infectiousness_at(day_offset);
        if !severity.is_symptomatic() {
            weight *= variant.params().p_asymptomatic_infection;
        }
        weight
    };

    let mut exposed = 0u32;
    for _ in 0..nr_contacts {
        let u = ctx.rng.uniform();
        let (place, contact_min_age, contact_max_age, mask_p) = match ctx.contacts.sample(age, u) {
            Ok(row) => (row.place, row.contact_min_age, row.contact_max_age, row.mask_p),
            Err(kind) => return Err(SimulationProblem::with_person(kind, idx)),
        };
        let Some(target) =
            ctx.population
                .sample_in_age_range(contact_min_age, contact_max_age, &mut ctx.rng)
        else {
            continue;
        };
        if target == idx {
            continue;
        }
        ctx.population.daily.contacts_by_place[place as usize] += 1;
        ctx.population.daily.exposed += 1;
        exposed += 1;
        attempt_infection(ctx, idx, target, source_infectiousness, mask_p)?;
    }

    let person = &mut ctx.population.people[idx as usize];
    person.other_people_exposed_today = exposed;
    person.max_contacts_per_day = person.max_contacts_per_day.max(nr_contacts);
    Ok(())
}

/// One exposure event against `target`. At most one successful infection per
/// target, ever: already infected or immune targets shrug it off.
fn attempt_infection(
    ctx: &mut Context,
    source_idx: PersonIdx,
    target_idx: PersonIdx,
    source_infectiousness: f64,
    mask_p: f64,
) -> Result<(), SimulationProblem> {
    let variant_idx = ctx.population.people[source_idx as usize].variant_idx;
    let (target_age, target_eligible) = {
        let target = &ctx.population.people[target_idx as usize];
        (target.age, target.is_susceptible_to_infection())
    };
    if !target_eligible {
        return Ok(());
    }

    let (p_infection, p_mask_protects_wearer, p_mask_protects_others) = {
        let variant = ctx.disease.variant(variant_idx);
        (
            variant.p_infection(source_infectiousness, target_age),
            variant.params().p_mask_protects_wearer,
            variant.params().p_mask_protects_others,
        )
    };
    if !ctx.rng.chance(p_infection) {
        return Ok(());
    }

    if mask_p > 0.0 {
        let a = mask_p * p_mask_protects_others;
        let b = mask_p * p_mask_protects_wearer;
        let p_averted = a + b - a * b;
        if ctx.rng.chance(p_averted) {
            return Ok(());
        }
    }

    infect(ctx, target_idx, variant_idx, Some(source_idx))?;

    let source = &mut ctx.population.people[source_idx as usize];
    source.other_people_infected += 1;
    source.record_infectee(target_idx)?;
    Ok(())
}

/// Turns a person into a fresh incubating case of `variant_idx`.
///
/// Samples severity (with the vaccination modifier when in effect), the
/// place of death for fatal cases, the incubation span and the total
/// onset-to-removal span. The infectees side list is materialised only while
/// contact tracing is the active testing mode.
pub(crate) fn infect(
    ctx: &mut Context,
    idx: PersonIdx,
    variant_idx: u8,
    infector: Option<PersonIdx>,
) -> Result<(), SimulationProblem> {
    let today = ctx.day as i32;
    let (age, day_of_vaccination) = {
        let person = &ctx.population.people[idx as usize];
        (person.age, person.day_of_vaccination)
    };
    let vaccinated = healthcare::vaccine_in_effect(day_of_vaccination, today);

    let variant = ctx.disease.variant(variant_idx);
    let (severity, place_of_death) = variant.sample_severity(age, vaccinated, &mut ctx.rng);
    let incubation_days = variant.sample_incubation_days(&mut ctx.rng);
    let onset_to_removed = variant.sample_onset_to_removed(severity, &mut ctx.rng);
    let tracing = ctx.healthcare.testing_mode == TestingMode::AllWithSymptomsCT;

    let person = &mut ctx.population.people[idx as usize];
    person.state = PersonState::Incubation;
    person.is_infected = true;
    person.symptom_severity = severity;
    person.place_of_death = place_of_death;
    person.variant_idx = variant_idx;
    person.day_of_infection = today;
    person.day_of_illness = 0;
    person.days_left = incubation_days;
    person.days_from_onset_to_removed = onset_to_removed;
    person.other_people_infected = 0;
    person.infector = infector;
    if tracing {
        let mut infectees = Vec::new();
        infectees
            .try_reserve_exact(MAX_INFECTEES)
            .map_err(|_| SimulationProblem::with_person(ProblemKind::MallocFailure, idx))?;
        person.infectees = Some(infectees);
    }

    let included = person.included_in_totals;
    bump(&mut ctx.population.totals.infected, age);
    if included {
        bump(&mut ctx.population.totals.all_infected, age);
    }
    Ok(())
}

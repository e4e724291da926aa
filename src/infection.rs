//! The per-person disease progression state machine.
//!
//! Every person is visited once per day. Infectious people first expose
//! others (unless quarantined), then their `days_left` counter advances and
//! transitions fire when it reaches zero: incubation turns into illness,
//! illness ends in death, hospitalization or recovery, hospital stays end in
//! an ICU transfer or release, and ICU stays end in death or recovery.
//! Denied admissions are resolved with the no-capacity death draws.

use crate::context::Context;
use crate::disease::{PlaceOfDeath, SymptomSeverity};
use crate::error::{ProblemKind, SimulationProblem};
use crate::healthcare::{self, TestingMode};
use crate::population::{bump, dip, PersonIdx, PersonState};
use crate::transmission;

/// Advances one person by one day.
pub(crate) fn advance(ctx: &mut Context, idx: PersonIdx) -> Result<(), SimulationProblem> {
    match ctx.population.people[idx as usize].state {
        PersonState::Susceptible | PersonState::Recovered | PersonState::Dead => Ok(()),
        PersonState::Incubation | PersonState::Illness => advance_infectious(ctx, idx),
        PersonState::Hospitalized => advance_hospitalized(ctx, idx),
        PersonState::InIcu => advance_icu(ctx, idx),
    }
}

fn advance_infectious(ctx: &mut Context, idx: PersonIdx) -> Result<(), SimulationProblem> {
    {
        let person = &mut ctx.population.people[idx as usize];
        // Infected earlier today; progression starts tomorrow.
        if person.day_of_infection == ctx.day as i32 {
            return Ok(());
        }
        person.other_people_exposed_today = 0;
    }

    // Detection quarantines: zero contacts from then on.
    if !ctx.population.people[idx as usize].was_detected {
        transmission::expose_others(ctx, idx)?;
    }

    let person = &mut ctx.population.people[idx as usize];
    match person.state {
        PersonState::Incubation => {
            person.days_left -= 1;
            if person.days_left == 0 {
                begin_illness(ctx, idx);
            }
            Ok(())
        }
        PersonState::Illness => {
            person.day_of_illness += 1;
            person.days_left -= 1;
            if person.days_left == 0 {
                end_illness(ctx, idx)?;
            }
            Ok(())
        }
        _ => Err(SimulationProblem::with_person(ProblemKind::WrongState, idx)),
    }
}

/// Symptom onset: incubation is over, the illness clock starts and testing
/// may be requested depending on the active mode.
fn begin_illness(ctx: &mut Context, idx: PersonIdx) {
    let severity;
    {
        let variant = ctx.disease.variant(ctx.population.people[idx as usize].variant_idx);
        let person = &mut ctx.population.people[idx as usize];
        severity = person.symptom_severity;
        person.state = PersonState::Illness;
        person.day_of_illness = 0;
        person.days_left = variant.illness_days(severity, person.days_from_onset_to_removed);
    }

    let wants_test = match ctx.healthcare.testing_mode {
        TestingMode::NoTesting => false,
        TestingMode::OnlySevereSymptoms => {
            severity.requires_hospitalization()
                || (severity == SymptomSeverity::Mild
                    && ctx.rng.chance(ctx.healthcare.p_detected_anyway))
        }
        TestingMode::AllWithSymptoms | TestingMode::AllWithSymptomsCT => severity.is_symptomatic(),
    };
    if wants_test {
        healthcare::queue_for_testing(ctx, idx);
    }
}

fn end_illness(ctx: &mut Context, idx: PersonIdx) -> Result<(), SimulationProblem> {
    let person = &ctx.population.people[idx as usize];
    let severity = person.symptom_severity;
    let place_of_death = person.place_of_death;

    if severity == SymptomSeverity::Fatal && place_of_death == PlaceOfDeath::OutsideHospital {
        return die(ctx, idx);
    }
    if severity.requires_hospitalization() {
        return hospitalize(ctx, idx);
    }
    recover(ctx, idx)
}

/// Requests a ward bed. Admission implies detection; denial resolves the
/// case immediately with the no-beds death draw.
fn hospitalize(ctx: &mut Context, idx: PersonIdx) -> Result<(), SimulationProblem> {
    healthcare::mark_detected(ctx, idx)?;

    if ctx.healthcare.acquire_bed() {
        let variant = ctx.disease.variant(ctx.population.people[idx as usize].variant_idx);
        let person = &mut ctx.population.people[idx as usize];
        person.state = PersonState::Hospitalized;
        person.days_left =
            variant.hospitalization_days(person.symptom_severity, person.days_from_onset_to_removed);
        let age = person.age;
        bump(&mut ctx.population.totals.hospitalized, age);
        return Ok(());
    }

    let p_death = ctx
        .disease
        .variant(ctx.population.people[idx as usize].variant_idx)
        .params()
        .p_hospital_death_no_beds;
    if ctx.rng.chance(p_death) {
        die(ctx, idx)
    } else {
        recover(ctx, idx)
    }
}

fn advance_hospitalized(ctx: &mut Context, idx: PersonIdx) -> Result<(), SimulationProblem> {
    {
        let person = &mut ctx.population.people[idx as usize];
        person.days_left -= 1;
        if person.days_left > 0 {
            return Ok(());
        }
    }

    match ctx.population.people[idx as usize].symptom_severity {
        SymptomSeverity::Severe => {
            let p_death = ctx
                .disease
                .variant(ctx.population.people[idx as usize].variant_idx)
                .params()
                .p_hospital_death;
            if ctx.rng.chance(p_death) {
                die(ctx, idx)
            } else {
                recover(ctx, idx)
            }
        }
        SymptomSeverity::Critical | SymptomSeverity::Fatal => transfer_to_icu(ctx, idx),
        _ => Err(SimulationProblem::with_person(ProblemKind::WrongState, idx)),
    }
}

/// Moves a person from the ward to intensive care. The ward bed is freed on
/// transfer whether or not an ICU unit is granted.
fn transfer_to_icu(ctx: &mut Context, idx: PersonIdx) -> Result<(), SimulationProblem> {
    leave_care(ctx, idx)?;

    if ctx.healthcare.acquire_icu_unit() {
        let variant = ctx.disease.variant(ctx.population.people[idx as usize].variant_idx);
        let person = &mut ctx.population.people[idx as usize];
        person.state = PersonState::InIcu;
        person.days_left = variant.icu_days(person.days_from_onset_to_removed);
        let age = person.age;
        bump(&mut ctx.population.totals.in_icu, age);
        return Ok(());
    }

    let (severity, p_death) = {
        let person = &ctx.population.people[idx as usize];
        let params = ctx.disease.variant(person.variant_idx).params();
        (person.symptom_severity, params.p_icu_death_no_beds)
    };
    if severity == SymptomSeverity::Fatal || ctx.rng.chance(p_death) {
        die(ctx, idx)
    } else {
        recover(ctx, idx)
    }
}

fn advance_icu(ctx: &mut Context, idx: PersonIdx) -> Result<(), SimulationProblem> {
    {
        let person = &mut ctx.population.people[idx as usize];
        person.days_left -= 1;
        if person.days_left > 0 {
            return Ok(());
        }
    }
    if ctx.population.people[idx as usize].symptom_severity == SymptomSeverity::Fatal {
        die(ctx, idx)
    } else {
        recover(ctx, idx)
    }
}

/// Releases whatever care resource the person currently holds and parks them
/// in the plain Illness state until the caller decides their fate.
fn leave_care(ctx: &mut Context, idx: PersonIdx) -> Result<(), SimulationProblem> {
    let state = ctx.population.people[idx as usize].state;
    let age = ctx.population.people[idx as usize].age;
    match state {
        PersonState::Hospitalized => {
            ctx.healthcare.release_bed().map_err(|problem| {
                SimulationProblem::with_person(problem.kind, idx)
            })?;
            dip(&mut ctx.population.totals.hospitalized, age);
        }
        PersonState::InIcu => {
            ctx.healthcare.release_icu_unit().map_err(|problem| {
                SimulationProblem::with_person(problem.kind, idx)
            })?;
            dip(&mut ctx.population.totals.in_icu, age);
        }
        _ => return Ok(()),
    }
    ctx.population.people[idx as usize].state = PersonState::Illness;
    Ok(())
}

pub(crate) fn die(ctx: &mut Context, idx: PersonIdx) -> Result<(), SimulationProblem> {
    leave_care(ctx, idx)?;
    remove(ctx, idx, PersonState::Dead);
    Ok(())
}

pub(crate) fn recover(ctx: &mut Context, idx: PersonIdx) -> Result<(), SimulationProblem> {
    leave_care(ctx, idx)?;
    remove(ctx, idx, PersonState::Recovered);
    Ok(())
}

/// Shared tail of death and recovery: the person stops being infected, gains
/// immunity, leaves the active counters and feeds the R estimator. The
/// infectees side list is freed here; tracing cannot reach removed chains.
fn remove(ctx: &mut Context, idx: PersonIdx, into: PersonState) {
    let person = &mut ctx.population.people[idx as usize];
    let age = person.age;
    let was_detected = person.was_detected;
    let secondary_cases = person.other_people_infected;
    person.is_infected = false;
    person.has_immunity = true;
    person.state = into;
    person.infectees = None;

    dip(&mut ctx.population.totals.infected, age);
    if was_detected {
        dip(&mut ctx.population.totals.detected, age);
    }
    match into {
        PersonState::Dead => bump(&mut ctx.population.totals.dead, age),
        PersonState::Recovered => bump(&mut ctx.population.totals.recovered, age),
        _ => unreachable!("removal only ends in death or recovery"),
    }
    ctx.population.note_removed(secondary_cases);
}

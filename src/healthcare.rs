//! The healthcare system: bed and ICU accounting, symptom-driven testing,
//! contact tracing and vaccination programs.
//!
//! Beds and ICU units behave like a pair of semaphores; admission acquires,
//! discharge releases, and denial is visible to the agent state machine.
//! Testing is day-delayed: symptom onset enqueues a person and the queue is
//! drained at the start of the next day.

use crate::context::Context;
use crate::disease::VACCINATION_EFFECT_DELAY;
use crate::error::{ProblemKind, SimulationProblem};
use crate::population::{bump, PersonIdx, PersonState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestingMode {
    NoTesting,
    OnlySevereSymptoms,
    AllWithSymptoms,
    AllWithSymptomsCT,
}

/// Age-targeted vaccination with a weekly budget, prorated daily with a
/// fractional carry.
#[derive(Debug, Clone)]
pub struct VaccinationProgram {
    pub min_age: u8,
    pub max_age: u8,
    pub weekly_vaccinations: f64,
    carry: f64,
}

impl VaccinationProgram {
    /// Today's share of the weekly budget.
    fn daily_quota(&mut self) -> u32 {
        self.carry += self.weekly_vaccinations / 7.0;
        let quota = self.carry.floor() as u32;
        self.carry -= f64::from(quota);
        quota
    }
}

#[derive(Debug, Clone)]
pub struct HealthcareSystem {
    beds: u32,
    icu_units: u32,
    available_beds: u32,
    available_icu_units: u32,
    pub(crate) testing_mode: TestingMode,
    pub(crate) testing_queue: Vec<PersonIdx>,
    pub(crate) p_successful_tracing: f64,
    pub(crate) p_detected_anyway: f64,
    pub(crate) programs: Vec<VaccinationProgram>,
}

impl HealthcareSystem {
    #[must_use]
    pub fn new(beds: u32, icu_units: u32) -> Self {
        HealthcareSystem {
            beds,
            icu_units,
            available_beds: beds,
            available_icu_units: icu_units,
            testing_mode: TestingMode::NoTesting,
            testing_queue: Vec::new(),
            p_successful_tracing: 0.0,
            p_detected_anyway: 0.0,
            programs: Vec::new(),
        }
    }

    #[must_use]
    pub fn beds(&self) -> u32 {
        self.beds
    }

    #[must_use]
    pub fn icu_units(&self) -> u32 {
        self.icu_units
    }

    #[must_use]
    pub fn available_beds(&self) -> u32 {
        self.available_beds
    }

    #[must_use]
    pub fn available_icu_units(&self) -> u32 {
        self.available_icu_units
    }

    #[must_use]
    pub fn testing_mode(&self) -> TestingMode {
        self.testing_mode
    }

    pub fn add_beds(&mut self, beds: u32) {
        self.beds += beds;
        self.available_beds += beds;
    }

    pub fn add_icu_units(&mut self, units: u32) {
        self.icu_units += units;
        self.available_icu_units += units;
    }

    /// Tries to admit a person to a ward bed.
    pub fn acquire_bed(&mut self) -> bool {
        if self.available_beds == 0 {
            return false;
        }
        self.available_beds -= 1;
        true
    }

    pub fn release_bed(&mut self) -> Result<(), SimulationProblem> {
        if self.available_beds >= self.beds {
            return Err(SimulationProblem::new(ProblemKind::HospitalAccountingFailure));
        }
        self.available_beds += 1;
        Ok(())
    }

    /// Tries to admit a person to intensive care.
    pub fn acquire_icu_unit(&mut self) -> bool {
        if self.available_icu_units == 0 {
            return false;
        }
        self.available_icu_units -= 1;
        true
    }

    pub fn release_icu_unit(&mut self) -> Result<(), SimulationProblem> {
        if self.available_icu_units >= self.icu_units {
            return Err(SimulationProblem::new(ProblemKind::HospitalAccountingFailure));
        }
        self.available_icu_units += 1;
        Ok(())
    }

    pub fn add_vaccination_program(&mut self, weekly_vaccinations: u32, min_age: u8, max_age: u8) {
        self.programs.push(VaccinationProgram {
            min_age,
            max_age,
            weekly_vaccinations: f64::from(weekly_vaccinations),
            carry: 0.0,
        });
    }
}

/// Whether the vaccine has had time to take effect for this person.
pub(crate) fn vaccine_in_effect(day_of_vaccination: i32, today: i32) -> bool {
    day_of_vaccination >= 0 && today - day_of_vaccination >= VACCINATION_EFFECT_DELAY
}

/// Puts a person on tomorrow's testing queue, unless they are already
/// queued, already detected, or dead.
pub(crate) fn queue_for_testing(ctx: &mut Context, idx: PersonIdx) {
    let person = &mut ctx.population.people[idx as usize];
    if person.queued_for_testing || person.was_detected || person.state == PersonState::Dead {
        return;
    }
    person.queued_for_testing = true;
    ctx.healthcare.testing_queue.push(idx);
}

/// Drains the testing queue built up yesterday. A queued person tests
/// positive iff they are currently emitting infectiousness or are in
/// hospital care.
pub(crate) fn run_pending_tests(ctx: &mut Context) -> Result<(), SimulationProblem> {
    let queue = std::mem::take(&mut ctx.healthcare.testing_queue);
    ctx.population.daily.tests_run = queue.len() as u32;
    for idx in queue {
        let (in_care, day_offset, variant_idx) = {
            let person = &mut ctx.population.people[idx as usize];
            person.queued_for_testing = false;
            if person.was_detected || person.state == PersonState::Dead {
                continue;
            }
            let in_care = matches!(
                person.state,
                PersonState::Hospitalized | PersonState::InIcu
            );
            (in_care, person.infectious_day_offset(), person.variant_idx)
        };
        let infectious = day_offset.is_some_and(|offset| {
            ctx.disease.variant(variant_idx).infectiousness_at(offset) > 0.0
        });
        if in_care || infectious {
            mark_detected(ctx, idx)?;
        }
    }
    Ok(())
}

/// Records a positive test. Detection quarantines the person and, under the
/// contact-tracing mode, walks their known contacts.
pub(crate) fn mark_detected(ctx: &mut Context, idx: PersonIdx) -> Result<(), SimulationProblem> {
    let person = &mut ctx.population.people[idx as usize];
    if person.was_detected {
        return Ok(());
    }
    person.was_detected = true;
    let age = person.age;
    let included = person.included_in_totals;
    bump(&mut ctx.population.totals.detected, age);
    if included {
        bump(&mut ctx.population.totals.all_detected, age);
    }
    if ctx.healthcare.testing_mode == TestingMode::AllWithSymptomsCT {
        trace_contacts(ctx, idx, 1)?;
    }
    Ok(())
}

/// Enqueues the infector and infectees of a detected person for next-day
/// testing, each with `p_successful_tracing`. Contacts traced at the first
/// level have their own contacts walked once more; depth is capped there.
fn trace_contacts(ctx: &mut Context, idx: PersonIdx, level: u8) -> Result<(), SimulationProblem> {
    let person = &ctx.population.people[idx as usize];
    let mut contacts: Vec<PersonIdx> = Vec::new();
    if let Some(infector) = person.infector {
        contacts.push(infector);
    }
    if let Some(infectees) = &person.infectees {
        for &infectee in infectees {
            if ctx.population.people[infectee as usize].infector != Some(idx) {
                return Err(SimulationProblem::with_person(
                    ProblemKind::InfecteesMismatch,
                    idx,
                ));
            }
            contacts.push(infectee);
        }
    }

    for contact in contacts {
        let person = &ctx.population.people[contact as usize];
        if person.state == PersonState::Dead || person.was_detected || person.queued_for_testing {
            continue;
        }
        if !ctx.rng.chance(ctx.healthcare.p_successful_tracing) {
            continue;
        }
        queue_for_testing(ctx, contact);
        ctx.population.daily.ct_cases += 1;
        if level == 1 {
            trace_contacts(ctx, contact, 2)?;
        }
    }
    Ok(())
}

/// Runs every active vaccination program for today, walking each age bracket
/// from the oldest person downward.
pub(crate) fn run_vaccinations(ctx: &mut Context) {
    for i in 0..ctx.healthcare.programs.len() {
        let program = &mut ctx.healthcare.programs[i];
        let mut quota = program.daily_quota();
        let (min_age, max_age) = (program.min_age, program.max_age);
        if quota == 0 {
            continue;
        }
        let Some((start, end)) = ctx.population.age_bracket(min_age, max_age) else {
            continue;
        };
        for position in (start..end).rev() {
            if quota == 0 {
                break;
            }
            let idx = ctx.population.sorted_by_age[position as usize];
            let person = &mut ctx.population.people[idx as usize];
            if person.state == PersonState::Dead
                || person.day_of_vaccination >= 0
                || person.was_detected
            {
                continue;
            }
            person.day_of_vaccination = ctx.day as i32;
            let age = person.age;
            bump(&mut ctx.population.totals.vaccinated, age);
            quota -= 1;
        }
    }
}

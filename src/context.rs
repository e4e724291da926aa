//! The central simulation object.
//!
//! A [`Context`] owns the population, disease, contact matrix, healthcare
//! system, PRNG and intervention schedule, and advances the whole simulation
//! one day per [`Context::iterate`] call. Each day it applies interventions
//! dated today, injects prorated imported infections, drains the testing
//! queue, runs vaccination programs, and then visits every person once in a
//! randomised cyclic order. A successful day increments the day counter; an
//! invariant violation aborts the day and poisons the context.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::contacts::{ContactMatrix, ContactPlace};
use crate::disease::{Disease, SymptomSeverity};
use crate::error::{EpisimError, SimulationProblem};
use crate::healthcare::{self, HealthcareSystem};
use crate::infection;
use crate::interventions::{self, Intervention};
use crate::log::{debug, warn};
use crate::population::{bump, Person, PersonIdx, PersonState, Population};
use crate::random::RandomPool;
use crate::report::SimulationState;
use crate::transmission;

/// Number of draws produced by the diagnostic sampling interface.
const SAMPLE_COUNT: usize = 10_000;

/// Day-0 population condition: how many people start out already somewhere
/// in the disease course.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InitialCondition {
    pub incubating: u32,
    pub ill: u32,
    pub dead: u32,
    pub in_ward: u32,
    pub in_icu: u32,
    pub confirmed_cases: u32,
}

/// What the diagnostic sampling interface can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Infectiousness,
    ContactsPerDay,
    SymptomSeverity,
    IncubationPeriod,
    IllnessPeriod,
    HospitalizationPeriod,
    IcuPeriod,
    OnsetToRemovedPeriod,
}

/// Output of [`Context::sample`].
#[derive(Debug, Clone, PartialEq)]
pub enum SampleSeries {
    /// 10 000 numeric draws.
    Values(Vec<f64>),
    /// 10 000 severity draws.
    Severities(Vec<SymptomSeverity>),
    /// The deterministic infectiousness profile, one weight per day offset.
    Curve(Vec<(i32, f64)>),
}

#[derive(Debug, Clone)]
struct ScheduledIntervention {
    day: u32,
    intervention: Intervention,
    applied: bool,
}

#[derive(Debug, Clone)]
struct WeeklyImport {
    per_week: f64,
    variant_idx: u8,
    carry: f64,
}

pub struct Context {
    pub(crate) population: Population,
    pub(crate) disease: Disease,
    pub(crate) contacts: ContactMatrix,
    pub(crate) healthcare: HealthcareSystem,
    pub(crate) rng: RandomPool,
    pub(crate) day: u32,
    start_date: NaiveDate,
    interventions: Vec<ScheduledIntervention>,
    weekly_imports: Vec<WeeklyImport>,
    problem: Option<SimulationProblem>,
}

impl Context {
    #[must_use]
    pub fn new(
        population: Population,
        contacts: ContactMatrix,
        disease: Disease,
        healthcare: HealthcareSystem,
        start_date: NaiveDate,
        rng: RandomPool,
    ) -> Context {
        Context {
            population,
            disease,
            contacts,
            healthcare,
            rng,
            day: 0,
            start_date,
            interventions: Vec::new(),
            weekly_imports: Vec::new(),
            problem: None,
        }
    }

    #[must_use]
    pub fn day(&self) -> u32 {
        self.day
    }

    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Calendar date of the day about to be simulated.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.start_date + chrono::Duration::days(i64::from(self.day))
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    #[must_use]
    pub fn disease(&self) -> &Disease {
        &self.disease
    }

    #[must_use]
    pub fn contacts(&self) -> &ContactMatrix {
        &self.contacts
    }

    #[must_use]
    pub fn healthcare(&self) -> &HealthcareSystem {
        &self.healthcare
    }

    pub fn people(&self) -> impl Iterator<Item = &Person> {
        self.population.people()
    }

    /// People queued to be tested at the start of the next day.
    #[must_use]
    pub fn testing_queue(&self) -> &[PersonIdx] {
        &self.healthcare.testing_queue
    }

    /// The invariant violation that stopped the simulation, if any.
    #[must_use]
    pub fn problem(&self) -> Option<&SimulationProblem> {
        self.problem.as_ref()
    }

    /// Schedules an intervention for a calendar date. Parameters are
    /// validated here; the date must not precede the simulation start.
    pub fn add_intervention(
        &mut self,
        date: NaiveDate,
        intervention: Intervention,
    ) -> Result<(), EpisimError> {
        let offset = (date - self.start_date).num_days();
        let day = u32::try_from(offset).map_err(|_| {
            EpisimError::from(format!(
                "intervention {} dated {date} precedes the simulation start {}",
                intervention.type_name(),
                self.start_date
            ))
        })?;
        self.add_intervention_on_day(day, intervention)
    }

    /// Schedules an intervention by day offset from the start date.
    pub fn add_intervention_on_day(
        &mut self,
        day: u32,
        intervention: Intervention,
    ) -> Result<(), EpisimError> {
        intervention.validate(&self.disease)?;
        self.interventions.push(ScheduledIntervention {
            day,
            intervention,
            applied: false,
        });
        Ok(())
    }

    /// Seeds the day-0 population condition. Must run before the first
    /// `iterate`.
    pub fn seed_initial(&mut self, condition: &InitialCondition) -> Result<(), EpisimError> {
        if self.day != 0 {
            return Err("initial condition can only be seeded on day 0".into());
        }

        for _ in 0..condition.dead {
            let Some(idx) = self.pick_fresh_target() else {
                break;
            };
            let person = &mut self.population.people[idx as usize];
            person.state = PersonState::Dead;
            person.has_immunity = true;
            person.included_in_totals = false;
            let age = person.age;
            bump(&mut self.population.totals.dead, age);
        }

        let mut seeded_infected: Vec<PersonIdx> = Vec::new();

        for _ in 0..condition.in_icu {
            let Some(idx) = self.pick_fresh_target() else {
                break;
            };
            self.seed_infected(idx, Some(SymptomSeverity::Critical))?;
            if !self.healthcare.acquire_icu_unit() {
                return Err("initial in_icu count exceeds the ICU capacity".into());
            }
            let variant = self.disease.variant(0);
            let person = &mut self.population.people[idx as usize];
            person.state = PersonState::InIcu;
            person.days_left = variant.icu_days(person.days_from_onset_to_removed);
            let age = person.age;
            bump(&mut self.population.totals.in_icu, age);
            healthcare::mark_detected(self, idx)?;
        }

        for _ in 0..condition.in_ward {
            let Some(idx) = self.pick_fresh_target() else {
                break;
            };
            self.seed_infected(idx, Some(SymptomSeverity::Severe))?;
            if !self.healthcare.acquire_bed() {
                return Err("initial in_ward count exceeds the bed capacity".into());
            }
            let variant = self.disease.variant(0);
            let person = &mut self.population.people[idx as usize];
            person.state = PersonState::Hospitalized;
            person.days_left =
                variant.hospitalization_days(person.symptom_severity, person.days_from_onset_to_removed);
            let age = person.age;
            bump(&mut self.population.totals.hospitalized, age);
            healthcare::mark_detected(self, idx)?;
        }

        for _ in 0..condition.ill {
            let Some(idx) = self.pick_fresh_target() else {
                break;
            };
            self.seed_infected(idx, None)?;
            let variant = self.disease.variant(0);
            let person = &mut self.population.people[idx as usize];
            let illness_days =
                variant.illness_days(person.symptom_severity, person.days_from_onset_to_removed);
            person.state = PersonState::Illness;
            person.day_of_illness = self.rng.index(illness_days as usize) as u32;
            person.days_left = illness_days - person.day_of_illness;
            seeded_infected.push(idx);
        }

        for _ in 0..condition.incubating {
            let Some(idx) = self.pick_fresh_target() else {
                break;
            };
            self.seed_infected(idx, None)?;
            seeded_infected.push(idx);
        }

        for &idx in seeded_infected
            .iter()
            .take(condition.confirmed_cases as usize)
        {
            healthcare::mark_detected(self, idx)?;
        }
        Ok(())
    }

    /// Places one pre-existing case, optionally pinning the severity (used
    /// for ward/ICU seeds). Seeds predate day 0, so they progress and expose
    /// from the very first day.
    fn seed_infected(
        &mut self,
        idx: PersonIdx,
        forced_severity: Option<SymptomSeverity>,
    ) -> Result<(), EpisimError> {
        transmission::infect(self, idx, 0, None)?;
        let person = &mut self.population.people[idx as usize];
        person.day_of_infection = -1;
        if let Some(severity) = forced_severity {
            person.symptom_severity = severity;
        }
        // Durations were sampled for the drawn severity; resample the total
        // so a pinned severity gets a consistent course.
        if forced_severity.is_some() {
            let severity = self.population.people[idx as usize].symptom_severity;
            let onset_to_removed = self
                .disease
                .variant(0)
                .sample_onset_to_removed(severity, &mut self.rng);
            self.population.people[idx as usize].days_from_onset_to_removed = onset_to_removed;
        }
        Ok(())
    }

    /// Uniformly picks a never-infected, non-immune person, retrying up to
    /// one population's worth of draws.
    fn pick_fresh_target(&mut self) -> Option<PersonIdx> {
        let n = self.population.len();
        if n == 0 {
            return None;
        }
        for _ in 0..n {
            let idx = self.rng.index(n) as PersonIdx;
            if self.population.people[idx as usize].is_susceptible_to_infection() {
                return Some(idx);
            }
        }
        None
    }

    /// Infects `amount` randomly chosen susceptible people with the given
    /// variant; used by the import interventions.
    pub(crate) fn import_infections(
        &mut self,
        amount: u32,
        variant_idx: u8,
    ) -> Result<(), SimulationProblem> {
        let mut imported = 0;
        for _ in 0..amount {
            let Some(idx) = self.pick_fresh_target() else {
                break;
            };
            transmission::infect(self, idx, variant_idx, None)?;
            imported += 1;
        }
        if imported < amount {
            warn!(
                "day {}: only {imported} of {amount} imported infections found a susceptible target",
                self.day
            );
        }
        Ok(())
    }

    pub(crate) fn add_weekly_imports(&mut self, per_week: f64, variant_idx: u8) {
        self.weekly_imports.push(WeeklyImport {
            per_week,
            variant_idx,
            carry: 0.0,
        });
    }

    /// Advances the simulation by one day.
    ///
    /// On an invariant violation the day counter is not advanced, the
    /// problem is stored, and this and every later call returns the failure.
    pub fn iterate(&mut self) -> Result<(), EpisimError> {
        if let Some(problem) = self.problem {
            return Err(problem.into());
        }
        match self.run_day() {
            Ok(()) => {
                self.day += 1;
                Ok(())
            }
            Err(problem) => {
                self.problem = Some(problem);
                Err(problem.into())
            }
        }
    }

    fn run_day(&mut self) -> Result<(), SimulationProblem> {
        self.population.daily.reset();

        // Interventions dated today, each applied exactly once.
        for i in 0..self.interventions.len() {
            if self.interventions[i].day == self.day && !self.interventions[i].applied {
                self.interventions[i].applied = true;
                let intervention = self.interventions[i].intervention.clone();
                interventions::apply(self, &intervention)?;
            }
        }

        // Weekly imports, prorated with fractional carry.
        for i in 0..self.weekly_imports.len() {
            let (amount, variant_idx) = {
                let import = &mut self.weekly_imports[i];
                import.carry += import.per_week / 7.0;
                let amount = import.carry.floor() as u32;
                import.carry -= f64::from(amount);
                (amount, import.variant_idx)
            };
            if amount > 0 {
                self.import_infections(amount, variant_idx)?;
            }
        }

        healthcare::run_pending_tests(self)?;
        healthcare::run_vaccinations(self);

        // Every person once, in randomised cyclic order.
        let n = self.population.len();
        if n > 0 {
            let start = self.rng.index(n);
            for offset in 0..n {
                let idx = ((start + offset) % n) as PersonIdx;
                infection::advance(self, idx)?;
            }
        }

        debug!(
            "day {}: {} exposed, {} tests, queue {}",
            self.day,
            self.population.daily.exposed,
            self.population.daily.tests_run,
            self.healthcare.testing_queue.len()
        );
        Ok(())
    }

    /// Builds the per-day state snapshot from the incremental counters.
    #[must_use]
    pub fn generate_state(&self) -> SimulationState {
        let totals = &self.population.totals;
        let nr_ages = self.population.nr_ages();
        let mut susceptible = Vec::with_capacity(nr_ages);
        for age in 0..nr_ages {
            susceptible.push(
                self.population.initial_age_counts[age]
                    - totals.infected[age]
                    - totals.recovered[age]
                    - totals.dead[age],
            );
        }

        let daily_contacts: BTreeMap<ContactPlace, u32> = ContactPlace::ALL
            .iter()
            .enumerate()
            .map(|(i, &place)| (place, self.population.daily.contacts_by_place[i]))
            .collect();

        SimulationState {
            day: self.day,
            date: self.date(),
            susceptible,
            infected: totals.infected.clone(),
            all_infected: totals.all_infected.clone(),
            detected: totals.detected.clone(),
            all_detected: totals.all_detected.clone(),
            recovered: totals.recovered.clone(),
            hospitalized: totals.hospitalized.clone(),
            in_icu: totals.in_icu.clone(),
            dead: totals.dead.clone(),
            vaccinated: totals.vaccinated.clone(),
            available_hospital_beds: self.healthcare.available_beds(),
            available_icu_units: self.healthcare.available_icu_units(),
            total_icu_units: self.healthcare.icu_units(),
            r: self.population.reproduction_number(),
            exposed_per_day: self.population.daily.exposed,
            tests_run_per_day: self.population.daily.tests_run,
            ct_cases_per_day: self.population.daily.ct_cases,
            mobility_limitation: self.contacts.mobility_limitation(),
            daily_contacts,
        }
    }

    /// Diagnostic sampling: 10 000 draws of one model quantity for a given
    /// age, independent of (and without disturbing) the day loop state other
    /// than the shared PRNG stream.
    pub fn sample(
        &mut self,
        what: SampleKind,
        age: u8,
        severity: Option<SymptomSeverity>,
    ) -> Result<SampleSeries, EpisimError> {
        let variant = self.disease.variant(0).clone();
        let mut draw_severity = |rng: &mut RandomPool| match severity {
            Some(severity) => severity,
            None => variant.sample_severity(age, false, rng).0,
        };

        let series = match what {
            SampleKind::Infectiousness => {
                let mut pairs = variant.params().infectiousness_over_time.clone();
                pairs.sort_by_key(|&(day, _)| day);
                SampleSeries::Curve(pairs)
            }
            SampleKind::ContactsPerDay => {
                let avg_contacts = self.contacts.avg_contacts(age);
                let cap = self.contacts.mass_gathering_limit();
                let mut values = Vec::with_capacity(SAMPLE_COUNT);
                for _ in 0..SAMPLE_COUNT {
                    let mut nr = (self.rng.lognormal(0.0, 0.5) * avg_contacts).floor() as i64;
                    nr = (nr.max(1) - 1).min(100);
                    if let Some(cap) = cap {
                        nr = nr.min(i64::from(cap));
                    }
                    values.push(nr as f64);
                }
                SampleSeries::Values(values)
            }
            SampleKind::SymptomSeverity => {
                let mut severities = Vec::with_capacity(SAMPLE_COUNT);
                for _ in 0..SAMPLE_COUNT {
                    severities.push(variant.sample_severity(age, false, &mut self.rng).0);
                }
                SampleSeries::Severities(severities)
            }
            SampleKind::IncubationPeriod => {
                let mut values = Vec::with_capacity(SAMPLE_COUNT);
                for _ in 0..SAMPLE_COUNT {
                    values.push(f64::from(variant.sample_incubation_days(&mut self.rng)));
                }
                SampleSeries::Values(values)
            }
            SampleKind::IllnessPeriod => {
                let mut values = Vec::with_capacity(SAMPLE_COUNT);
                for _ in 0..SAMPLE_COUNT {
                    let severity = draw_severity(&mut self.rng);
                    let onset_to_removed =
                        variant.sample_onset_to_removed(severity, &mut self.rng);
                    values.push(f64::from(variant.illness_days(severity, onset_to_removed)));
                }
                SampleSeries::Values(values)
            }
            SampleKind::HospitalizationPeriod => {
                let mut values = Vec::with_capacity(SAMPLE_COUNT);
                for _ in 0..SAMPLE_COUNT {
                    let severity = draw_severity(&mut self.rng);
                    if severity.requires_hospitalization() {
                        let onset_to_removed =
                            variant.sample_onset_to_removed(severity, &mut self.rng);
                        values.push(f64::from(
                            variant.hospitalization_days(severity, onset_to_removed),
                        ));
                    } else {
                        values.push(0.0);
                    }
                }
                SampleSeries::Values(values)
            }
            SampleKind::IcuPeriod => {
                let mut values = Vec::with_capacity(SAMPLE_COUNT);
                for _ in 0..SAMPLE_COUNT {
                    let severity = draw_severity(&mut self.rng);
                    if severity >= SymptomSeverity::Critical {
                        let onset_to_removed =
                            variant.sample_onset_to_removed(severity, &mut self.rng);
                        values.push(f64::from(variant.icu_days(onset_to_removed)));
                    } else {
                        values.push(0.0);
                    }
                }
                SampleSeries::Values(values)
            }
            SampleKind::OnsetToRemovedPeriod => {
                let mut values = Vec::with_capacity(SAMPLE_COUNT);
                for _ in 0..SAMPLE_COUNT {
                    let severity = draw_severity(&mut self.rng);
                    values.push(variant.sample_onset_to_removed(severity, &mut self.rng));
                }
                SampleSeries::Values(values)
            }
        };
        Ok(series)
    }
}

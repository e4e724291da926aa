//! Agent storage and aggregate accounting.
//!
//! [`Population`] owns one contiguous array of [`Person`] structs, an index
//! of person ids grouped by age for O(1) sampling of a contact in an age
//! bracket, and the per-age counters the daily state snapshot is built from.
//! Person slots are never removed; deaths only flip state.

use serde::Serialize;

use crate::disease::{PlaceOfDeath, SymptomSeverity};
use crate::error::{EpisimError, ProblemKind, SimulationProblem};
use crate::random::RandomPool;

/// Index into the person array.
pub type PersonIdx = u32;

/// Upper bound on recorded infectees per person while contact tracing is
/// active. Overflow is a hard simulation error.
pub const MAX_INFECTEES: usize = 64;

/// Hard cap on contacts assigned to one person on one day.
pub const MAX_CONTACTS: i64 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PersonState {
    Susceptible,
    Incubation,
    Illness,
    Hospitalized,
    InIcu,
    Recovered,
    Dead,
}

/// One simulated individual.
///
/// `idx` and `age` are immutable identity; the rest is mutated by the day
/// loop. `days_left` counts down inside the current sub-state and the next
/// transition fires when it reaches zero.
#[derive(Debug, Clone)]
pub struct Person {
    pub idx: PersonIdx,
    pub age: u8,
    pub state: PersonState,
    pub symptom_severity: SymptomSeverity,
    pub place_of_death: PlaceOfDeath,
    pub variant_idx: u8,
    pub is_infected: bool,
    pub has_immunity: bool,
    pub was_detected: bool,
    pub queued_for_testing: bool,
    pub included_in_totals: bool,
    pub day_of_infection: i32,
    pub day_of_illness: u32,
    pub days_left: u32,
    pub days_from_onset_to_removed: f64,
    pub day_of_vaccination: i32,
    pub other_people_infected: u32,
    pub other_people_exposed_today: u32,
    pub max_contacts_per_day: u32,
    pub infector: Option<PersonIdx>,
    /// Recorded only while contact tracing is active at infection time.
    pub infectees: Option<Vec<PersonIdx>>,
}

impl Person {
    fn new(idx: PersonIdx, age: u8) -> Self {
        Person {
            idx,
            age,
            state: PersonState::Susceptible,
            symptom_severity: SymptomSeverity::Asymptomatic,
            place_of_death: PlaceOfDeath::InHospital,
            variant_idx: 0,
            is_infected: false,
            has_immunity: false,
            was_detected: false,
            queued_for_testing: false,
            included_in_totals: true,
            day_of_infection: -1,
            day_of_illness: 0,
            days_left: 0,
            days_from_onset_to_removed: 0.0,
            day_of_vaccination: -1,
            other_people_infected: 0,
            other_people_exposed_today: 0,
            max_contacts_per_day: 0,
            infector: None,
            infectees: None,
        }
    }

    /// Whether an exposure can take hold at all.
    #[must_use]
    pub fn is_susceptible_to_infection(&self) -> bool {
        !self.is_infected && !self.has_immunity
    }

    /// Day offset from symptom onset while infectious, `None` otherwise.
    /// Incubation runs on negative offsets, illness on `day_of_illness`.
    #[must_use]
    pub fn infectious_day_offset(&self) -> Option<i32> {
        match self.state {
            PersonState::Incubation => Some(-(self.days_left as i32)),
            PersonState::Illness => Some(self.day_of_illness as i32),
            _ => None,
        }
    }

    /// Records `other` as an infectee if the side list was materialised.
    pub fn record_infectee(&mut self, other: PersonIdx) -> Result<(), SimulationProblem> {
        if let Some(infectees) = &mut self.infectees {
            if infectees.len() >= MAX_INFECTEES {
                return Err(SimulationProblem::with_person(
                    ProblemKind::TooManyInfectees,
                    self.idx,
                ));
            }
            infectees.push(other);
        }
        Ok(())
    }
}

/// Per-age cumulative and current counters, updated incrementally on every
/// transition.
#[derive(Debug, Clone, Default)]
pub struct Totals {
    pub infected: Vec<u32>,
    pub all_infected: Vec<u32>,
    pub detected: Vec<u32>,
    pub all_detected: Vec<u32>,
    pub recovered: Vec<u32>,
    pub dead: Vec<u32>,
    pub hospitalized: Vec<u32>,
    pub in_icu: Vec<u32>,
    pub vaccinated: Vec<u32>,
}

impl Totals {
    fn new(nr_ages: usize) -> Self {
        Totals {
            infected: vec![0; nr_ages],
            all_infected: vec![0; nr_ages],
            detected: vec![0; nr_ages],
            all_detected: vec![0; nr_ages],
            recovered: vec![0; nr_ages],
            dead: vec![0; nr_ages],
            hospitalized: vec![0; nr_ages],
            in_icu: vec![0; nr_ages],
            vaccinated: vec![0; nr_ages],
        }
    }
}

/// Counters reset at the start of every simulated day.
#[derive(Debug, Clone, Default)]
pub struct DailyCounters {
    pub exposed: u32,
    pub tests_run: u32,
    pub ct_cases: u32,
    /// Indexed in `ContactPlace::ALL` order.
    pub contacts_by_place: [u32; 6],
}

impl DailyCounters {
    pub fn reset(&mut self) {
        *self = DailyCounters::default();
    }
}

#[derive(Debug, Clone)]
pub struct Population {
    pub(crate) people: Vec<Person>,
    /// Person ids grouped by ascending age; random order within one age.
    pub(crate) sorted_by_age: Vec<PersonIdx>,
    /// `age_start[a]..age_start[a + 1]` spans age `a` in `sorted_by_age`.
    pub(crate) age_start: Vec<u32>,
    pub(crate) initial_age_counts: Vec<u32>,
    pub(crate) totals: Totals,
    pub(crate) daily: DailyCounters,
    /// Running statistics behind the reproduction-number estimate.
    pub(crate) removed_count: u32,
    pub(crate) removed_secondary_sum: u64,
}

impl Population {
    /// Builds the population from an age histogram. The age index is built
    /// once: ids are shuffled, then stably sorted by age, so sampling within
    /// an age bracket is unbiased.
    pub fn new(age_counts: &[u32], rng: &mut RandomPool) -> Result<Self, EpisimError> {
        if age_counts.is_empty() {
            return Err("population needs at least one age class".into());
        }
        if age_counts.len() > usize::from(u8::MAX) + 1 {
            return Err("ages are 8-bit: at most 256 age classes".into());
        }
        let total: u64 = age_counts.iter().map(|&c| u64::from(c)).sum();
        let total = usize::try_from(total).map_err(|_| "population size overflows usize")?;
        if u32::try_from(total).is_err() {
            return Err("population size exceeds person index range".into());
        }

        let mut people = Vec::new();
        people
            .try_reserve_exact(total)
            .map_err(|_| SimulationProblem::new(ProblemKind::MallocFailure))?;
        for (age, &count) in age_counts.iter().enumerate() {
            for _ in 0..count {
                people.push(Person::new(people.len() as PersonIdx, age as u8));
            }
        }

        let mut sorted_by_age: Vec<PersonIdx> = (0..people.len() as u32).collect();
        rng.shuffle(&mut sorted_by_age);
        sorted_by_age.sort_by_key(|&idx| people[idx as usize].age);

        let mut age_start = Vec::with_capacity(age_counts.len() + 1);
        let mut offset = 0u32;
        for &count in age_counts {
            age_start.push(offset);
            offset += count;
        }
        age_start.push(offset);

        Ok(Population {
            people,
            sorted_by_age,
            age_start,
            initial_age_counts: age_counts.to_vec(),
            totals: Totals::new(age_counts.len()),
            daily: DailyCounters::default(),
            removed_count: 0,
            removed_secondary_sum: 0,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.people.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    #[must_use]
    pub fn nr_ages(&self) -> usize {
        self.initial_age_counts.len()
    }

    #[must_use]
    pub fn person(&self, idx: PersonIdx) -> &Person {
        &self.people[idx as usize]
    }

    pub fn people(&self) -> impl Iterator<Item = &Person> {
        self.people.iter()
    }

    /// Uniformly samples one person whose age falls in `[min_age, max_age]`.
    /// Returns `None` when the bracket is empty.
    pub fn sample_in_age_range(
        &self,
        min_age: u8,
        max_age: u8,
        rng: &mut RandomPool,
    ) -> Option<PersonIdx> {
        let (start, end) = self.age_bracket(min_age, max_age)?;
        let span = (end - start) as usize;
        let pick = start as usize + rng.index(span);
        Some(self.sorted_by_age[pick])
    }

    /// Index window of `sorted_by_age` covering `[min_age, max_age]`.
    pub(crate) fn age_bracket(&self, min_age: u8, max_age: u8) -> Option<(u32, u32)> {
        let nr_ages = self.nr_ages();
        let min = usize::from(min_age);
        if min >= nr_ages || min_age > max_age {
            return None;
        }
        let max = usize::from(max_age).min(nr_ages - 1);
        let start = self.age_start[min];
        let end = self.age_start[max + 1];
        if start == end {
            None
        } else {
            Some((start, end))
        }
    }

    /// Mean secondary cases among removed infectors; zero until at least six
    /// removals have been observed.
    #[must_use]
    pub fn reproduction_number(&self) -> f64 {
        if self.removed_count < 6 {
            return 0.0;
        }
        self.removed_secondary_sum as f64 / f64::from(self.removed_count)
    }

    pub(crate) fn note_removed(&mut self, secondary_cases: u32) {
        self.removed_count += 1;
        self.removed_secondary_sum += u64::from(secondary_cases);
    }
}

pub(crate) fn bump(counters: &mut [u32], age: u8) {
    counters[usize::from(age)] += 1;
}

pub(crate) fn dip(counters: &mut [u32], age: u8) {
    counters[usize::from(age)] -= 1;
}

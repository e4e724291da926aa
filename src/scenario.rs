//! Scenario documents.
//!
//! A scenario is a single JSON document holding everything a simulation run
//! needs: start date, seed, healthcare capacity, the age histogram, the
//! contact table, disease and variant parameters, the day-0 population
//! condition and the dated intervention list. `Scenario::build` turns it
//! into a ready [`Context`].

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::contacts::{ContactMatrix, ContactRow};
use crate::context::{Context, InitialCondition};
use crate::disease::{Disease, DiseaseParams, VariantParams};
use crate::error::EpisimError;
use crate::healthcare::HealthcareSystem;
use crate::interventions::Intervention;
use crate::population::Population;
use crate::random::RandomPool;

/// An intervention with the calendar date it takes effect.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledIntervention {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub intervention: Intervention,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub start_date: NaiveDate,
    #[serde(default)]
    pub random_seed: u64,
    pub simulation_days: u32,
    pub hospital_beds: u32,
    pub icu_units: u32,
    /// Number of people per age in years; the index is the age.
    pub age_counts: Vec<u32>,
    pub contacts: Vec<ContactRow>,
    #[serde(default)]
    pub disease: DiseaseParams,
    #[serde(default)]
    pub variants: Vec<VariantParams>,
    #[serde(default)]
    pub initial: Option<InitialCondition>,
    #[serde(default)]
    pub interventions: Vec<ScheduledIntervention>,
}

impl Scenario {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, EpisimError> {
        let contents = fs::read_to_string(path)?;
        let scenario = serde_json::from_str(&contents)?;
        Ok(scenario)
    }

    /// Builds a fully seeded simulation context.
    pub fn build(&self) -> Result<Context, EpisimError> {
        let mut rng = RandomPool::new(self.random_seed);
        let population = Population::new(&self.age_counts, &mut rng)?;
        let contacts = ContactMatrix::new(&self.contacts, self.age_counts.len())?;
        let disease = Disease::new(self.disease.clone(), self.variants.clone())?;
        let healthcare = HealthcareSystem::new(self.hospital_beds, self.icu_units);
        let mut context = Context::new(
            population,
            contacts,
            disease,
            healthcare,
            self.start_date,
            rng,
        );
        for scheduled in &self.interventions {
            context.add_intervention(scheduled.date, scheduled.intervention.clone())?;
        }
        if let Some(initial) = &self.initial {
            context.seed_initial(initial)?;
        }
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCENARIO_JSON: &str = r#"{
        "start_date": "2020-03-01",
        "random_seed": 1234,
        "simulation_days": 10,
        "hospital_beds": 20,
        "icu_units": 4,
        "age_counts": [50, 50, 50, 50],
        "contacts": [
            {
                "participant_min_age": 0, "participant_max_age": 3,
                "contact_min_age": 0, "contact_max_age": 3,
                "place": "home", "contacts": 5.0
            }
        ],
        "initial": {"incubating": 2},
        "interventions": [
            {"date": "2020-03-03", "type": "test-all-with-symptoms"},
            {"date": "2020-03-05", "type": "limit-mobility", "reduction": 30}
        ]
    }"#;

    #[test]
    fn builds_from_json() {
        let scenario: Scenario = serde_json::from_str(SCENARIO_JSON).unwrap();
        assert_eq!(scenario.simulation_days, 10);
        assert_eq!(scenario.interventions.len(), 2);
        let mut context = scenario.build().unwrap();
        assert_eq!(context.population().len(), 200);
        assert_eq!(context.generate_state().total_infected(), 2);
        for _ in 0..scenario.simulation_days {
            context.iterate().unwrap();
        }
        let state = context.generate_state();
        assert!((state.mobility_limitation - 0.30).abs() < 1e-9);
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCENARIO_JSON.as_bytes()).unwrap();
        let scenario = Scenario::from_json_file(file.path()).unwrap();
        assert_eq!(scenario.hospital_beds, 20);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = serde_json::from_str::<Scenario>(r#"{"start_date": "2020-03-01", "bogus": 1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_intervention_variant_fails_the_build() {
        let mut scenario: Scenario = serde_json::from_str(SCENARIO_JSON).unwrap();
        scenario.interventions.push(ScheduledIntervention {
            date: scenario.start_date,
            intervention: Intervention::ImportInfections {
                amount: 1,
                variant: Some("missing".to_string()),
            },
        });
        assert!(scenario.build().is_err());
    }
}

//! An engine for agent-based epidemic micro-simulations
//!
//! Episim simulates an infectious respiratory disease spreading through an
//! age-structured population of individual people, one day at a time. Every
//! person carries their own disease course: exposure, incubation,
//! symptomatic illness, hospital and ICU care, recovery or death, with
//! durations and age-dependent severities drawn from a seeded random stream.
//! Around the individual courses sit a finite healthcare system (ward beds
//! and ICU units), venue-partitioned contact patterns, testing with contact
//! tracing, vaccination programs, multiple pathogen variants, and a
//! scheduler of dated interventions that reshape all of the above while the
//! simulation runs.
//!
//! The central object is the [`Context`], which owns the whole simulation
//! and advances it with [`Context::iterate`]. A typical run:
//! * Build a [`Population`](population::Population) from an age histogram.
//! * Build a [`ContactMatrix`](contacts::ContactMatrix) from contacts-per-day
//!   survey rows.
//! * Describe the pathogen with [`DiseaseParams`](disease::DiseaseParams)
//!   and optional variant overrides.
//! * Schedule interventions (`limit-mobility`, `test-with-contact-tracing`,
//!   `vaccinate`, ...) on calendar dates.
//! * Call `iterate` once per day and read
//!   [`generate_state`](Context::generate_state) snapshots.
//!
//! Scenario files bundle all of the inputs into one JSON document; the
//! `episim` binary runs a scenario and writes a per-day CSV report.
//!
//! Two runs with the same seed, inputs and platform produce identical
//! day-by-day state sequences.

pub mod classified;
pub use classified::ClassifiedValues;

pub mod contacts;
pub use contacts::{ContactMatrix, ContactPlace, ContactRow};

pub mod context;
pub use context::{Context, InitialCondition, SampleKind, SampleSeries};

pub mod disease;
pub use disease::{
    Disease, DiseaseParams, PlaceOfDeath, SymptomSeverity, Variant, VariantParams,
};

pub mod error;
pub use error::{EpisimError, ProblemKind, SimulationProblem};

pub mod healthcare;
pub use healthcare::{HealthcareSystem, TestingMode};

mod infection;
mod transmission;

pub mod interventions;
pub use interventions::Intervention;

pub mod log;
pub use log::{
    debug, disable_logging, enable_logging, error, info, set_log_level, set_module_filter,
    set_module_filters, trace, warn, LevelFilter,
};

pub mod population;
pub use population::{Person, PersonIdx, PersonState, Population};

pub mod random;
pub use random::RandomPool;

pub mod report;
pub use report::{DailyReport, DailyReportRow, SimulationState};

pub mod runner;
pub use runner::{run_with_args, BaseArgs};

pub mod scenario;
pub use scenario::{Scenario, ScheduledIntervention};

pub mod prelude {
    pub use crate::classified::ClassifiedValues;
    pub use crate::contacts::{ContactMatrix, ContactPlace, ContactRow};
    pub use crate::context::{Context, InitialCondition, SampleKind, SampleSeries};
    pub use crate::disease::{Disease, DiseaseParams, SymptomSeverity, VariantParams};
    pub use crate::error::{EpisimError, ProblemKind, SimulationProblem};
    pub use crate::healthcare::{HealthcareSystem, TestingMode};
    pub use crate::interventions::Intervention;
    pub use crate::population::{Person, PersonState, Population};
    pub use crate::random::RandomPool;
    pub use crate::report::SimulationState;
    pub use crate::scenario::Scenario;
}

//! Provides [`EpisimError`] and wraps other errors.
//!
//! Two failure taxonomies exist side by side. Validation errors (bad
//! parameters, malformed scenario files, unknown variants) are reported
//! immediately through [`EpisimError`] and leave the simulation usable.
//! Invariant violations inside the day loop are reported as a
//! [`SimulationProblem`]; they abort the current day and poison the
//! [`Context`](crate::context::Context) for good.
use std::fmt::{self, Debug, Display};
use std::io;

use crate::population::PersonIdx;

#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
/// Provides [`EpisimError`] and maps other errors to
/// convert to an [`EpisimError`]
pub enum EpisimError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    DateError(chrono::ParseError),
    ParseIntError(std::num::ParseIntError),
    /// The day loop hit an invariant violation; the simulation is dead.
    Simulation(SimulationProblem),
    EpisimError(String),
}

impl From<io::Error> for EpisimError {
    fn from(error: io::Error) -> Self {
        EpisimError::IoError(error)
    }
}

impl From<serde_json::Error> for EpisimError {
    fn from(error: serde_json::Error) -> Self {
        EpisimError::JsonError(error)
    }
}

impl From<csv::Error> for EpisimError {
    fn from(error: csv::Error) -> Self {
        EpisimError::CsvError(error)
    }
}

impl From<chrono::ParseError> for EpisimError {
    fn from(error: chrono::ParseError) -> Self {
        EpisimError::DateError(error)
    }
}

impl From<std::num::ParseIntError> for EpisimError {
    fn from(error: std::num::ParseIntError) -> Self {
        EpisimError::ParseIntError(error)
    }
}

impl From<String> for EpisimError {
    fn from(error: String) -> Self {
        EpisimError::EpisimError(error)
    }
}

impl From<&str> for EpisimError {
    fn from(error: &str) -> Self {
        EpisimError::EpisimError(error.to_string())
    }
}

impl From<SimulationProblem> for EpisimError {
    fn from(problem: SimulationProblem) -> Self {
        EpisimError::Simulation(problem)
    }
}

impl std::error::Error for EpisimError {}

impl Display for EpisimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EpisimError::Simulation(problem) => write!(f, "Error: {problem}"),
            other => write!(f, "Error: {other:?}"),
        }
    }
}

/// The closed set of invariant violations the day loop can detect.
///
/// Any of these indicates parameter misconfiguration or a bug; no local
/// recovery is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    /// A person infected more than the bounded maximum of others while
    /// contact tracing was recording infectees.
    TooManyInfectees,
    /// A single person was assigned more daily contacts than the hard cap.
    TooManyContacts,
    /// Bed or ICU release would exceed the configured capacity.
    HospitalAccountingFailure,
    /// The contact-count formula produced a negative value.
    NegativeContacts,
    /// An allocation for the person array or an infectees list failed.
    MallocFailure,
    /// A person was found in a state their severity does not allow.
    WrongState,
    /// A cumulative contact-probability table did not cover the drawn value.
    ContactProbabilityFailure,
    /// A traced infectee does not point back at its recorded infector.
    InfecteesMismatch,
}

impl ProblemKind {
    fn code(self) -> &'static str {
        match self {
            ProblemKind::TooManyInfectees => "too many infectees",
            ProblemKind::TooManyContacts => "too many contacts",
            ProblemKind::HospitalAccountingFailure => "hospital accounting failure",
            ProblemKind::NegativeContacts => "negative contact count",
            ProblemKind::MallocFailure => "allocation failure",
            ProblemKind::WrongState => "wrong person state",
            ProblemKind::ContactProbabilityFailure => "contact probability underflow",
            ProblemKind::InfecteesMismatch => "infectees mismatch",
        }
    }
}

/// An invariant violation, with the offending person when one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationProblem {
    pub kind: ProblemKind,
    pub person: Option<PersonIdx>,
}

impl SimulationProblem {
    #[must_use]
    pub fn new(kind: ProblemKind) -> Self {
        SimulationProblem { kind, person: None }
    }

    #[must_use]
    pub fn with_person(kind: ProblemKind, person: PersonIdx) -> Self {
        SimulationProblem {
            kind,
            person: Some(person),
        }
    }
}

impl Display for SimulationProblem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.person {
            Some(idx) => write!(f, "simulation failed: {} (person {idx})", self.kind.code()),
            None => write!(f, "simulation failed: {}", self.kind.code()),
        }
    }
}

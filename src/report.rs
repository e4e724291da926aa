//! Per-day state snapshots and CSV reporting.
//!
//! [`SimulationState`] is the full per-age snapshot handed to callers after
//! every day; [`DailyReport`] flattens one snapshot per day into a CSV row
//! for consumption outside the engine.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use csv::Writer;
use serde::Serialize;

use crate::contacts::ContactPlace;
use crate::error::EpisimError;

/// Snapshot of one simulated day. The per-age vectors are indexed by age in
/// years, length `nr_ages`.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationState {
    pub day: u32,
    pub date: NaiveDate,
    pub susceptible: Vec<u32>,
    pub infected: Vec<u32>,
    pub all_infected: Vec<u32>,
    pub detected: Vec<u32>,
    pub all_detected: Vec<u32>,
    pub recovered: Vec<u32>,
    pub hospitalized: Vec<u32>,
    pub in_icu: Vec<u32>,
    pub dead: Vec<u32>,
    pub vaccinated: Vec<u32>,
    pub available_hospital_beds: u32,
    pub available_icu_units: u32,
    pub total_icu_units: u32,
    /// Mean secondary cases among removed infectors; zero below six removals.
    pub r: f64,
    pub exposed_per_day: u32,
    pub tests_run_per_day: u32,
    pub ct_cases_per_day: u32,
    pub mobility_limitation: f64,
    pub daily_contacts: BTreeMap<ContactPlace, u32>,
}

fn total(values: &[u32]) -> u32 {
    values.iter().sum()
}

impl SimulationState {
    #[must_use]
    pub fn total_susceptible(&self) -> u32 {
        total(&self.susceptible)
    }

    #[must_use]
    pub fn total_infected(&self) -> u32 {
        total(&self.infected)
    }

    #[must_use]
    pub fn total_all_infected(&self) -> u32 {
        total(&self.all_infected)
    }

    #[must_use]
    pub fn total_dead(&self) -> u32 {
        total(&self.dead)
    }

    #[must_use]
    pub fn total_recovered(&self) -> u32 {
        total(&self.recovered)
    }
}

/// One CSV row: the snapshot with the per-age arrays collapsed to totals.
#[derive(Debug, Clone, Serialize)]
pub struct DailyReportRow {
    pub day: u32,
    pub date: NaiveDate,
    pub susceptible: u32,
    pub infected: u32,
    pub all_infected: u32,
    pub detected: u32,
    pub all_detected: u32,
    pub recovered: u32,
    pub hospitalized: u32,
    pub in_icu: u32,
    pub dead: u32,
    pub vaccinated: u32,
    pub available_hospital_beds: u32,
    pub available_icu_units: u32,
    pub total_icu_units: u32,
    pub r: f64,
    pub exposed_per_day: u32,
    pub tests_run_per_day: u32,
    pub ct_cases_per_day: u32,
    pub mobility_limitation: f64,
}

impl From<&SimulationState> for DailyReportRow {
    fn from(state: &SimulationState) -> Self {
        DailyReportRow {
            day: state.day,
            date: state.date,
            susceptible: total(&state.susceptible),
            infected: total(&state.infected),
            all_infected: total(&state.all_infected),
            detected: total(&state.detected),
            all_detected: total(&state.all_detected),
            recovered: total(&state.recovered),
            hospitalized: total(&state.hospitalized),
            in_icu: total(&state.in_icu),
            dead: total(&state.dead),
            vaccinated: total(&state.vaccinated),
            available_hospital_beds: state.available_hospital_beds,
            available_icu_units: state.available_icu_units,
            total_icu_units: state.total_icu_units,
            r: state.r,
            exposed_per_day: state.exposed_per_day,
            tests_run_per_day: state.tests_run_per_day,
            ct_cases_per_day: state.ct_cases_per_day,
            mobility_limitation: state.mobility_limitation,
        }
    }
}

/// CSV writer producing one [`DailyReportRow`] per simulated day.
pub struct DailyReport {
    writer: Writer<File>,
}

impl DailyReport {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, EpisimError> {
        let file = File::create(path)?;
        Ok(DailyReport {
            writer: Writer::from_writer(file),
        })
    }

    pub fn write_day(&mut self, state: &SimulationState) -> Result<(), EpisimError> {
        self.writer.serialize(DailyReportRow::from(state))?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> SimulationState {
        SimulationState {
            day: 3,
            date: NaiveDate::from_ymd_opt(2020, 3, 4).unwrap(),
            susceptible: vec![10, 20],
            infected: vec![1, 2],
            all_infected: vec![2, 3],
            detected: vec![0, 1],
            all_detected: vec![1, 1],
            recovered: vec![1, 0],
            hospitalized: vec![0, 1],
            in_icu: vec![0, 0],
            dead: vec![0, 1],
            vaccinated: vec![0, 5],
            available_hospital_beds: 9,
            available_icu_units: 4,
            total_icu_units: 5,
            r: 1.5,
            exposed_per_day: 12,
            tests_run_per_day: 2,
            ct_cases_per_day: 0,
            mobility_limitation: 0.25,
            daily_contacts: BTreeMap::from([(ContactPlace::Home, 7), (ContactPlace::Work, 5)]),
        }
    }

    #[test]
    fn report_row_collapses_age_arrays() {
        let row = DailyReportRow::from(&sample_state());
        assert_eq!(row.susceptible, 30);
        assert_eq!(row.infected, 3);
        assert_eq!(row.all_infected, 5);
        assert_eq!(row.dead, 1);
        assert_eq!(row.vaccinated, 5);
        assert_eq!(row.r, 1.5);
    }

    #[test]
    fn writes_csv_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily.csv");
        let mut report = DailyReport::create(&path).unwrap();
        report.write_day(&sample_state()).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("day,date,susceptible,infected"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("3,2020-03-04,30,3,5"));
    }

    #[test]
    fn state_serializes_daily_contacts_as_map() {
        let json = serde_json::to_string(&sample_state()).unwrap();
        assert!(json.contains(r#""daily_contacts":{"home":7,"work":5}"#));
    }
}

//! Venue-partitioned contact patterns.
//!
//! The matrix is built from survey-style rows: participant age range ×
//! contact age interval × place × contacts per day. Per participant age it
//! derives the expected daily contact total and a cumulative probability
//! table used to draw one contact at a time. Mobility factors and mask
//! probabilities attach to (place, participant-age) filters; changing either
//! regenerates the derived tables for the affected ages only.

use serde::{Deserialize, Serialize};

use crate::error::{EpisimError, ProblemKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactPlace {
    Home,
    Work,
    School,
    Transport,
    Leisure,
    Other,
}

impl ContactPlace {
    pub const ALL: [ContactPlace; 6] = [
        ContactPlace::Home,
        ContactPlace::Work,
        ContactPlace::School,
        ContactPlace::Transport,
        ContactPlace::Leisure,
        ContactPlace::Other,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ContactPlace::Home => "home",
            ContactPlace::Work => "work",
            ContactPlace::School => "school",
            ContactPlace::Transport => "transport",
            ContactPlace::Leisure => "leisure",
            ContactPlace::Other => "other",
        }
    }
}

/// One row of the source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRow {
    pub participant_min_age: u8,
    pub participant_max_age: u8,
    pub contact_min_age: u8,
    pub contact_max_age: u8,
    pub place: ContactPlace,
    pub contacts: f64,
}

impl ContactRow {
    #[must_use]
    pub fn new(
        participant_ages: (u8, u8),
        contact_ages: (u8, u8),
        place: ContactPlace,
        contacts: f64,
    ) -> Self {
        ContactRow {
            participant_min_age: participant_ages.0,
            participant_max_age: participant_ages.1,
            contact_min_age: contact_ages.0,
            contact_max_age: contact_ages.1,
            place,
            contacts,
        }
    }
}

/// Source entry expanded for one participant age.
#[derive(Debug, Clone)]
struct ContactEntry {
    place: ContactPlace,
    contact_min_age: u8,
    contact_max_age: u8,
    /// Contacts per day before any mobility limitation.
    rate: f64,
    mobility_factor: f64,
    mask_p: f64,
}

/// One row of the derived per-age table: pick this venue/interval when the
/// uniform draw lands below `cum_p`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactProbability {
    pub place: ContactPlace,
    pub contact_min_age: u8,
    pub contact_max_age: u8,
    pub cum_p: f64,
    pub mask_p: f64,
}

#[derive(Debug, Clone)]
pub struct ContactMatrix {
    nr_ages: usize,
    /// Highest participant age the source table covers; older participants
    /// reuse its row set.
    defined_upto: usize,
    entries: Vec<Vec<ContactEntry>>,
    cumulative: Vec<Vec<ContactProbability>>,
    /// Mobility-scaled expected contacts per day, per participant age.
    totals: Vec<f64>,
    raw_totals: Vec<f64>,
    mass_gathering_limit: Option<u32>,
}

impl ContactMatrix {
    pub fn new(rows: &[ContactRow], nr_ages: usize) -> Result<Self, EpisimError> {
        if nr_ages == 0 {
            return Err("contact matrix needs at least one age".into());
        }
        if rows.is_empty() {
            return Err("contact matrix needs at least one row".into());
        }
        let mut entries: Vec<Vec<ContactEntry>> = vec![Vec::new(); nr_ages];
        let mut defined_upto = 0usize;
        for row in rows {
            if row.participant_min_age > row.participant_max_age
                || row.contact_min_age > row.contact_max_age
            {
                return Err("contact row age interval is inverted".into());
            }
            if row.contacts < 0.0 {
                return Err("contact row has a negative rate".into());
            }
            let hi = usize::from(row.participant_max_age).min(nr_ages - 1);
            defined_upto = defined_upto.max(hi);
            for age in usize::from(row.participant_min_age)..=hi {
                entries[age].push(ContactEntry {
                    place: row.place,
                    contact_min_age: row.contact_min_age,
                    contact_max_age: row.contact_max_age,
                    rate: row.contacts,
                    mobility_factor: 1.0,
                    mask_p: 0.0,
                });
            }
        }
        let mut matrix = ContactMatrix {
            nr_ages,
            defined_upto,
            entries,
            cumulative: vec![Vec::new(); nr_ages],
            totals: vec![0.0; nr_ages],
            raw_totals: vec![0.0; nr_ages],
            mass_gathering_limit: None,
        };
        for age in 0..nr_ages {
            matrix.regenerate(age);
        }
        Ok(matrix)
    }

    fn lookup_age(&self, age: u8) -> usize {
        usize::from(age).min(self.defined_upto)
    }

    /// Expected contacts per day for a participant of `age`, after mobility
    /// limitation. Ages beyond the source table reuse its oldest row set.
    #[must_use]
    pub fn avg_contacts(&self, age: u8) -> f64 {
        self.totals[self.lookup_age(age)]
    }

    /// The derived table for one participant age.
    #[must_use]
    pub fn probabilities(&self, age: u8) -> &[ContactProbability] {
        &self.cumulative[self.lookup_age(age)]
    }

    #[must_use]
    pub fn mass_gathering_limit(&self) -> Option<u32> {
        self.mass_gathering_limit
    }

    /// Caps the daily contact count of every person. `None` lifts the cap.
    pub fn set_mass_gathering_limit(&mut self, limit: Option<u32>) {
        self.mass_gathering_limit = limit;
    }

    /// Sets the mobility factor (1.0 = unrestricted) for every entry matching
    /// the place and participant-age filters, then regenerates the affected
    /// derived tables.
    pub fn set_mobility_factor(
        &mut self,
        factor: f64,
        place: Option<ContactPlace>,
        participant_ages: Option<(u8, u8)>,
    ) {
        self.update_entries(place, participant_ages, |entry| {
            entry.mobility_factor = factor;
        });
    }

    /// Sets the probability that a mask is worn on contacts matching the
    /// place and participant-age filters.
    pub fn set_mask_probability(
        &mut self,
        mask_p: f64,
        place: Option<ContactPlace>,
        participant_ages: Option<(u8, u8)>,
    ) {
        self.update_entries(place, participant_ages, |entry| {
            entry.mask_p = mask_p;
        });
    }

    fn update_entries<F: Fn(&mut ContactEntry)>(
        &mut self,
        place: Option<ContactPlace>,
        participant_ages: Option<(u8, u8)>,
        update: F,
    ) {
        let (min_age, max_age) = match participant_ages {
            Some((min, max)) => (usize::from(min), usize::from(max).min(self.nr_ages - 1)),
            None => (0, self.nr_ages - 1),
        };
        for age in min_age..=max_age {
            let mut touched = false;
            for entry in &mut self.entries[age] {
                if place.is_none() || place == Some(entry.place) {
                    update(entry);
                    touched = true;
                }
            }
            if touched {
                self.regenerate(age);
            }
        }
    }

    fn regenerate(&mut self, age: usize) {
        let entries = &self.entries[age];
        let raw_total: f64 = entries.iter().map(|e| e.rate).sum();
        let total: f64 = entries.iter().map(|e| e.rate * e.mobility_factor).sum();
        self.raw_totals[age] = raw_total;
        self.totals[age] = total;

        let table = &mut self.cumulative[age];
        table.clear();
        if total <= 0.0 {
            return;
        }
        let mut cum = 0.0;
        for entry in entries {
            let weight = entry.rate * entry.mobility_factor;
            if weight <= 0.0 {
                continue;
            }
            cum += weight / total;
            table.push(ContactProbability {
                place: entry.place,
                contact_min_age: entry.contact_min_age,
                contact_max_age: entry.contact_max_age,
                cum_p: cum,
                mask_p: entry.mask_p,
            });
        }
    }

    /// Picks the venue/interval row covering the uniform draw `u`.
    pub fn sample(&self, age: u8, u: f64) -> Result<&ContactProbability, ProblemKind> {
        let table = &self.cumulative[self.lookup_age(age)];
        let position = table.partition_point(|row| row.cum_p <= u);
        table
            .get(position)
            .ok_or(ProblemKind::ContactProbabilityFailure)
    }

    /// Overall fraction of daily contacts removed by mobility limitation,
    /// across all participant ages.
    #[must_use]
    pub fn mobility_limitation(&self) -> f64 {
        let raw: f64 = self.raw_totals.iter().sum();
        if raw <= 0.0 {
            return 0.0;
        }
        let scaled: f64 = self.totals.iter().sum();
        1.0 - scaled / raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_rows() -> Vec<ContactRow> {
        vec![
            ContactRow::new((0, 99), (0, 99), ContactPlace::Home, 4.0),
            ContactRow::new((0, 99), (0, 99), ContactPlace::Leisure, 3.0),
            ContactRow::new((20, 64), (20, 64), ContactPlace::Work, 5.0),
            ContactRow::new((0, 19), (0, 19), ContactPlace::School, 8.0),
        ]
    }

    #[test]
    fn totals_per_age() {
        let matrix = ContactMatrix::new(&test_rows(), 100).unwrap();
        assert!((matrix.avg_contacts(10) - 15.0).abs() < 1e-9);
        assert!((matrix.avg_contacts(40) - 12.0).abs() < 1e-9);
        assert!((matrix.avg_contacts(80) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn ages_beyond_table_reuse_oldest_row_set() {
        let rows = vec![ContactRow::new((0, 69), (0, 69), ContactPlace::Home, 2.0)];
        let matrix = ContactMatrix::new(&rows, 100).unwrap();
        assert!((matrix.avg_contacts(95) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn cumulative_table_reaches_one() {
        let matrix = ContactMatrix::new(&test_rows(), 100).unwrap();
        for age in [0u8, 25, 70] {
            let table = matrix.probabilities(age);
            let last = table.last().unwrap();
            assert!((last.cum_p - 1.0).abs() < 1e-9, "age {age}");
        }
    }

    #[test]
    fn sample_selects_by_cumulative_probability() {
        let matrix = ContactMatrix::new(&test_rows(), 100).unwrap();
        // Age 40: home 4/12, work 5/12, leisure 3/12 in row order home,
        // leisure, work.
        let row = matrix.sample(40, 0.0).unwrap();
        assert_eq!(row.place, ContactPlace::Home);
        let row = matrix.sample(40, 0.999_999).unwrap();
        assert_eq!(row.place, ContactPlace::Work);
    }

    #[test]
    fn sample_beyond_table_is_a_failure() {
        let matrix = ContactMatrix::new(&test_rows(), 100).unwrap();
        assert_eq!(
            matrix.sample(40, 1.5).unwrap_err(),
            ProblemKind::ContactProbabilityFailure
        );
    }

    #[test]
    fn zero_reduction_is_a_noop() {
        let mut matrix = ContactMatrix::new(&test_rows(), 100).unwrap();
        let before = matrix.probabilities(30).to_vec();
        matrix.set_mobility_factor(1.0, None, None);
        assert_eq!(matrix.probabilities(30), &before[..]);
        assert_eq!(matrix.mobility_limitation(), 0.0);
    }

    #[test]
    fn mobility_factor_rescales_totals_and_probabilities() {
        let mut matrix = ContactMatrix::new(&test_rows(), 100).unwrap();
        matrix.set_mobility_factor(0.2, None, None);
        assert!((matrix.avg_contacts(40) - 12.0 * 0.2).abs() < 1e-9);
        assert!((matrix.mobility_limitation() - 0.8).abs() < 1e-9);
        // A uniform cut leaves the selection distribution unchanged.
        let last = matrix.probabilities(40).last().unwrap();
        assert!((last.cum_p - 1.0).abs() < 1e-9);
    }

    #[test]
    fn place_filter_only_touches_matching_entries() {
        let mut matrix = ContactMatrix::new(&test_rows(), 100).unwrap();
        matrix.set_mobility_factor(0.0, Some(ContactPlace::Work), None);
        assert!((matrix.avg_contacts(40) - 7.0).abs() < 1e-9);
        // School-age totals have no work component and stay put.
        assert!((matrix.avg_contacts(10) - 15.0).abs() < 1e-9);
        assert!(matrix
            .probabilities(40)
            .iter()
            .all(|row| row.place != ContactPlace::Work));
    }

    #[test]
    fn age_filter_only_touches_matching_ages() {
        let mut matrix = ContactMatrix::new(&test_rows(), 100).unwrap();
        matrix.set_mobility_factor(0.5, None, Some((70, 99)));
        assert!((matrix.avg_contacts(80) - 3.5).abs() < 1e-9);
        assert!((matrix.avg_contacts(40) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn masks_set_probability_without_changing_rates() {
        let mut matrix = ContactMatrix::new(&test_rows(), 100).unwrap();
        matrix.set_mask_probability(0.6, Some(ContactPlace::Leisure), None);
        assert!((matrix.avg_contacts(40) - 12.0).abs() < 1e-9);
        for row in matrix.probabilities(40) {
            if row.place == ContactPlace::Leisure {
                assert!((row.mask_p - 0.6).abs() < 1e-9);
            } else {
                assert_eq!(row.mask_p, 0.0);
            }
        }
    }

    #[test]
    fn rejects_bad_rows() {
        assert!(ContactMatrix::new(&[], 100).is_err());
        let inverted = vec![ContactRow::new((50, 10), (0, 99), ContactPlace::Home, 1.0)];
        assert!(ContactMatrix::new(&inverted, 100).is_err());
        let negative = vec![ContactRow::new((0, 99), (0, 99), ContactPlace::Home, -1.0)];
        assert!(ContactMatrix::new(&negative, 100).is_err());
    }
}

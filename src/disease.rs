//! Disease parameters and the stochastic laws derived from them.
//!
//! A [`Disease`] is a set of [`Variant`]s; variant 0 is always the wild type.
//! Each variant bundles age-classed probabilities, duration means and the
//! infectiousness-over-time profile, and offers the sampling operations the
//! day loop needs: symptom severity at infection time, incubation and
//! illness/hospital/ICU durations, and per-exposure infectiousness.

use serde::{Deserialize, Serialize};

use crate::classified::ClassifiedValues;
use crate::error::EpisimError;
use crate::random::RandomPool;

/// Coefficient of variation for the incubation-period gamma distribution.
const INCUBATION_CV: f64 = 0.86;
/// Coefficient of variation for the onset-to-removal gamma distribution.
const ONSET_TO_REMOVED_CV: f64 = 0.45;
/// Days after vaccination before the severity modifier applies.
pub const VACCINATION_EFFECT_DELAY: i32 = 14;

/// Relative infectiousness by day offset from symptom onset.
///
/// Used verbatim unless a parameter set overrides it.
pub const CANONICAL_INFECTIOUSNESS: [(i32, f64); 21] = [
    (-10, 0.00183),
    (-9, 0.00280),
    (-8, 0.00446),
    (-7, 0.00742),
    (-6, 0.01291),
    (-5, 0.02350),
    (-4, 0.04419),
    (-3, 0.08247),
    (-2, 0.14018),
    (-1, 0.19032),
    (0, 0.18539),
    (1, 0.13091),
    (2, 0.07538),
    (3, 0.04018),
    (4, 0.02144),
    (5, 0.01185),
    (6, 0.00686),
    (7, 0.00415),
    (8, 0.00262),
    (9, 0.00172),
    (10, 0.00117),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SymptomSeverity {
    Asymptomatic,
    Mild,
    Severe,
    Critical,
    Fatal,
}

impl SymptomSeverity {
    #[must_use]
    pub fn is_symptomatic(self) -> bool {
        self != SymptomSeverity::Asymptomatic
    }

    #[must_use]
    pub fn requires_hospitalization(self) -> bool {
        self >= SymptomSeverity::Severe
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaceOfDeath {
    InHospital,
    OutsideHospital,
}

/// Wild-type parameter set. Also the base a variant override is merged onto.
///
/// The `p_symptomatic`/`p_severe`/`p_critical`/`p_fatal` tables are
/// cumulative thresholds compared against a single uniform draw, so for any
/// age `p_symptomatic >= p_severe >= p_critical >= p_fatal` must hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiseaseParams {
    pub p_susceptibility: ClassifiedValues,
    pub p_symptomatic: ClassifiedValues,
    pub p_severe: ClassifiedValues,
    pub p_critical: ClassifiedValues,
    pub p_fatal: ClassifiedValues,
    pub p_death_outside_hospital: ClassifiedValues,
    pub p_hospital_death: f64,
    pub p_hospital_death_no_beds: f64,
    pub p_icu_death_no_beds: f64,
    pub p_asymptomatic_infection: f64,
    pub p_mask_protects_wearer: f64,
    pub p_mask_protects_others: f64,
    pub mean_incubation_duration: f64,
    pub mean_duration_from_onset_to_death: f64,
    pub mean_duration_from_onset_to_recovery: f64,
    pub ratio_of_duration_before_hospitalisation: f64,
    pub ratio_of_duration_in_ward: f64,
    pub infectiousness_multiplier: f64,
    pub vaccination_efficacy: f64,
    pub infectiousness_over_time: Vec<(i32, f64)>,
}

impl Default for DiseaseParams {
    fn default() -> Self {
        DiseaseParams {
            p_susceptibility: ClassifiedValues::flat(0.30),
            p_symptomatic: ClassifiedValues::flat(0.50),
            p_severe: severe_defaults(),
            p_critical: critical_defaults(),
            p_fatal: fatal_defaults(),
            p_death_outside_hospital: ClassifiedValues::flat(0.0),
            p_hospital_death: 0.0,
            p_hospital_death_no_beds: 0.20,
            p_icu_death_no_beds: 1.0,
            p_asymptomatic_infection: 0.50,
            p_mask_protects_wearer: 0.30,
            p_mask_protects_others: 0.50,
            mean_incubation_duration: 5.1,
            mean_duration_from_onset_to_death: 18.8,
            mean_duration_from_onset_to_recovery: 21.0,
            ratio_of_duration_before_hospitalisation: 0.30,
            ratio_of_duration_in_ward: 0.15,
            infectiousness_multiplier: 1.0,
            vaccination_efficacy: 0.90,
            infectiousness_over_time: CANONICAL_INFECTIOUSNESS.to_vec(),
        }
    }
}

// Cumulative severity thresholds per decade of age: the share of all
// infections that turn at least severe / critical / fatal, assuming half of
// infections stay asymptomatic.
fn severe_defaults() -> ClassifiedValues {
    ClassifiedValues::new(vec![
        (0, 0.0),
        (10, 0.000408),
        (20, 0.0104),
        (30, 0.0343),
        (40, 0.0425),
        (50, 0.0816),
        (60, 0.118),
        (70, 0.166),
        (80, 0.184),
    ])
    .unwrap()
}

fn critical_defaults() -> ClassifiedValues {
    ClassifiedValues::new(vec![
        (0, 0.0),
        (10, 0.0000204),
        (20, 0.00052),
        (30, 0.001715),
        (40, 0.0026775),
        (50, 0.0099552),
        (60, 0.032332),
        (70, 0.071712),
        (80, 0.130456),
    ])
    .unwrap()
}

fn fatal_defaults() -> ClassifiedValues {
    ClassifiedValues::new(vec![
        (0, 0.0),
        (10, 0.00000816),
        (20, 0.00026),
        (30, 0.0008575),
        (40, 0.00133875),
        (50, 0.0049776),
        (60, 0.016166),
        (70, 0.035856),
        (80, 0.065228),
    ])
    .unwrap()
}

/// A named override bundle on top of the wild type. Unset fields inherit the
/// wild-type value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantParams {
    pub name: String,
    #[serde(default)]
    pub p_susceptibility: Option<ClassifiedValues>,
    #[serde(default)]
    pub p_symptomatic: Option<ClassifiedValues>,
    #[serde(default)]
    pub p_severe: Option<ClassifiedValues>,
    #[serde(default)]
    pub p_critical: Option<ClassifiedValues>,
    #[serde(default)]
    pub p_fatal: Option<ClassifiedValues>,
    #[serde(default)]
    pub p_death_outside_hospital: Option<ClassifiedValues>,
    #[serde(default)]
    pub p_asymptomatic_infection: Option<f64>,
    #[serde(default)]
    pub mean_incubation_duration: Option<f64>,
    #[serde(default)]
    pub mean_duration_from_onset_to_death: Option<f64>,
    #[serde(default)]
    pub mean_duration_from_onset_to_recovery: Option<f64>,
    #[serde(default)]
    pub infectiousness_multiplier: Option<f64>,
    #[serde(default)]
    pub vaccination_efficacy: Option<f64>,
    #[serde(default)]
    pub infectiousness_over_time: Option<Vec<(i32, f64)>>,
}

/// Dense day-offset lookup built from the sparse profile pairs.
#[derive(Debug, Clone)]
struct InfectiousnessProfile {
    first_day: i32,
    weights: Vec<f64>,
}

impl InfectiousnessProfile {
    fn new(pairs: &[(i32, f64)]) -> Result<Self, EpisimError> {
        if pairs.is_empty() {
            return Err("infectiousness profile must not be empty".into());
        }
        let first_day = pairs.iter().map(|&(day, _)| day).min().unwrap();
        let last_day = pairs.iter().map(|&(day, _)| day).max().unwrap();
        let span = usize::try_from(last_day - first_day).unwrap() + 1;
        let mut weights = vec![0.0; span];
        for &(day, weight) in pairs {
            if weight < 0.0 {
                return Err(format!("negative infectiousness weight on day {day}").into());
            }
            weights[usize::try_from(day - first_day).unwrap()] = weight;
        }
        Ok(InfectiousnessProfile { first_day, weights })
    }

    fn get(&self, day: i32) -> f64 {
        let index = day - self.first_day;
        if index < 0 {
            return 0.0;
        }
        self.weights.get(index as usize).copied().unwrap_or(0.0)
    }
}

/// One pathogen variant: merged parameters plus the dense profile.
#[derive(Debug, Clone)]
pub struct Variant {
    name: String,
    params: DiseaseParams,
    profile: InfectiousnessProfile,
}

impl Variant {
    fn new(name: String, params: DiseaseParams) -> Result<Self, EpisimError> {
        if !(0.0..=1.0).contains(&params.vaccination_efficacy) {
            return Err(format!("variant {name}: vaccination efficacy out of range").into());
        }
        let ratios = params.ratio_of_duration_before_hospitalisation + params.ratio_of_duration_in_ward;
        if !(0.0..=1.0).contains(&ratios) {
            return Err(format!("variant {name}: duration ratios exceed the whole stay").into());
        }
        let profile = InfectiousnessProfile::new(&params.infectiousness_over_time)?;
        Ok(Variant {
            name,
            params,
            profile,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn params(&self) -> &DiseaseParams {
        &self.params
    }

    /// Profile weight for a day offset from symptom onset; zero outside the
    /// covered span.
    #[must_use]
    pub fn infectiousness_at(&self, day: i32) -> f64 {
        self.profile.get(day)
    }

    /// Per-exposure infection probability against a target of `age`, before
    /// the mask draw.
    #[must_use]
    pub fn p_infection(&self, source_infectiousness: f64, age: u8) -> f64 {
        source_infectiousness
            * self.params.p_susceptibility.get(i32::from(age))
            * self.params.infectiousness_multiplier
    }

    /// Samples severity for a fresh infection. The vaccination modifier
    /// shrinks the severe/critical/fatal thresholds once the vaccine has
    /// taken effect. Fatal cases also draw their place of death.
    pub fn sample_severity(
        &self,
        age: u8,
        vaccine_in_effect: bool,
        rng: &mut RandomPool,
    ) -> (SymptomSeverity, PlaceOfDeath) {
        let age = i32::from(age);
        let vmod = if vaccine_in_effect {
            1.0 - self.params.vaccination_efficacy
        } else {
            1.0
        };
        let v = rng.uniform();
        let severity = if v >= self.params.p_symptomatic.get(age) {
            SymptomSeverity::Asymptomatic
        } else if v >= self.params.p_severe.get(age) * vmod {
            SymptomSeverity::Mild
        } else if v >= self.params.p_critical.get(age) * vmod {
            SymptomSeverity::Severe
        } else if v >= self.params.p_fatal.get(age) * vmod {
            SymptomSeverity::Critical
        } else {
            SymptomSeverity::Fatal
        };
        let place = if severity == SymptomSeverity::Fatal
            && rng.chance(self.params.p_death_outside_hospital.get(age))
        {
            PlaceOfDeath::OutsideHospital
        } else {
            PlaceOfDeath::InHospital
        };
        (severity, place)
    }

    /// Incubation period in whole days, at least one.
    pub fn sample_incubation_days(&self, rng: &mut RandomPool) -> u32 {
        let days = rng
            .gamma(self.params.mean_incubation_duration, INCUBATION_CV)
            .round();
        (days as u32).max(1)
    }

    /// Total span from symptom onset to removal (death or recovery).
    pub fn sample_onset_to_removed(&self, severity: SymptomSeverity, rng: &mut RandomPool) -> f64 {
        let mean = if severity == SymptomSeverity::Fatal {
            self.params.mean_duration_from_onset_to_death
        } else {
            self.params.mean_duration_from_onset_to_recovery
        };
        rng.gamma(mean, ONSET_TO_REMOVED_CV)
    }

    /// Days spent in the Illness state before removal or hospitalization.
    #[must_use]
    pub fn illness_days(&self, severity: SymptomSeverity, onset_to_removed: f64) -> u32 {
        let days = if severity.requires_hospitalization() {
            onset_to_removed * self.params.ratio_of_duration_before_hospitalisation
        } else {
            onset_to_removed
        };
        (days.round() as u32).max(1)
    }

    /// Days spent in a ward bed.
    #[must_use]
    pub fn hospitalization_days(&self, severity: SymptomSeverity, onset_to_removed: f64) -> u32 {
        let ratio = match severity {
            SymptomSeverity::Severe => 1.0 - self.params.ratio_of_duration_before_hospitalisation,
            _ => self.params.ratio_of_duration_in_ward,
        };
        ((onset_to_removed * ratio).round() as u32).max(1)
    }

    /// Days spent in intensive care (critical and fatal cases only).
    #[must_use]
    pub fn icu_days(&self, onset_to_removed: f64) -> u32 {
        let ratio = 1.0
            - self.params.ratio_of_duration_in_ward
            - self.params.ratio_of_duration_before_hospitalisation;
        ((onset_to_removed * ratio).round() as u32).max(1)
    }
}

/// The disease with its variants; index 0 is the wild type.
#[derive(Debug, Clone)]
pub struct Disease {
    variants: Vec<Variant>,
}

impl Disease {
    pub fn new(
        wild_type: DiseaseParams,
        overrides: Vec<VariantParams>,
    ) -> Result<Self, EpisimError> {
        if overrides.len() >= usize::from(u8::MAX) {
            return Err("too many variants: indexes are 8-bit".into());
        }
        let mut variants = vec![Variant::new("wild-type".to_string(), wild_type.clone())?];
        for params in overrides {
            if params.name.is_empty() {
                return Err("variants need a name".into());
            }
            if variants.iter().any(|v| v.name == params.name) {
                return Err(format!("duplicate variant name: {}", params.name).into());
            }
            let merged = merge(&wild_type, &params);
            variants.push(Variant::new(params.name, merged)?);
        }
        Ok(Disease { variants })
    }

    #[must_use]
    pub fn wild_type() -> Self {
        // The defaults are always a valid parameter set.
        Disease::new(DiseaseParams::default(), Vec::new()).unwrap()
    }

    #[must_use]
    pub fn variant(&self, idx: u8) -> &Variant {
        &self.variants[usize::from(idx)]
    }

    #[must_use]
    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    /// Resolves a variant name to its index; `None` means the wild type.
    pub fn resolve_variant(&self, name: Option<&str>) -> Result<u8, EpisimError> {
        match name {
            None => Ok(0),
            Some(name) => self
                .variants
                .iter()
                .position(|v| v.name == name)
                .map(|idx| idx as u8)
                .ok_or_else(|| EpisimError::from(format!("unknown variant: {name}"))),
        }
    }
}

fn merge(base: &DiseaseParams, overrides: &VariantParams) -> DiseaseParams {
    let mut params = base.clone();
    let o = overrides;
    if let Some(v) = &o.p_susceptibility {
        params.p_susceptibility = v.clone();
    }
    if let Some(v) = &o.p_symptomatic {
        params.p_symptomatic = v.clone();
    }
    if let Some(v) = &o.p_severe {
        params.p_severe = v.clone();
    }
    if let Some(v) = &o.p_critical {
        params.p_critical = v.clone();
    }
    if let Some(v) = &o.p_fatal {
        params.p_fatal = v.clone();
    }
    if let Some(v) = &o.p_death_outside_hospital {
        params.p_death_outside_hospital = v.clone();
    }
    if let Some(v) = o.p_asymptomatic_infection {
        params.p_asymptomatic_infection = v;
    }
    if let Some(v) = o.mean_incubation_duration {
        params.mean_incubation_duration = v;
    }
    if let Some(v) = o.mean_duration_from_onset_to_death {
        params.mean_duration_from_onset_to_death = v;
    }
    if let Some(v) = o.mean_duration_from_onset_to_recovery {
        params.mean_duration_from_onset_to_recovery = v;
    }
    if let Some(v) = o.infectiousness_multiplier {
        params.infectiousness_multiplier = v;
    }
    if let Some(v) = o.vaccination_efficacy {
        params.vaccination_efficacy = v;
    }
    if let Some(v) = &o.infectiousness_over_time {
        params.infectiousness_over_time = v.clone();
    }
    params
}

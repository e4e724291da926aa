//! Dated interventions that mutate simulation parameters.
//!
//! Interventions form a closed sum type; the serde tag names double as the
//! external intervention vocabulary (`test-all-with-symptoms`,
//! `limit-mobility`, ...). Validation happens when an intervention is added
//! to a context; application happens exactly once, on the simulated day
//! matching its date.

use serde::{Deserialize, Serialize};

use crate::contacts::ContactPlace;
use crate::context::Context;
use crate::disease::Disease;
use crate::error::{EpisimError, SimulationProblem};
use crate::healthcare::TestingMode;
use crate::log::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Intervention {
    /// Everyone with symptoms is queued for testing at onset.
    TestAllWithSymptoms,
    /// Only severe cases are queued; a share of mild cases is caught anyway.
    TestOnlySevereSymptoms {
        #[serde(default)]
        mild_detection_rate: u32,
    },
    /// Symptomatic testing plus contact tracing with the given efficiency.
    TestWithContactTracing { efficiency: u32 },
    BuildNewHospitalBeds { beds: u32 },
    BuildNewIcuUnits { units: u32 },
    /// One-time batch of infections from outside the area.
    ImportInfections {
        amount: u32,
        #[serde(default)]
        variant: Option<String>,
    },
    /// Recurring imports, prorated daily with a fractional carry.
    ImportInfectionsWeekly {
        weekly_amount: u32,
        #[serde(default)]
        variant: Option<String>,
    },
    LimitMobility {
        reduction: u32,
        #[serde(default)]
        place: Option<ContactPlace>,
        #[serde(default)]
        min_age: Option<u8>,
        #[serde(default)]
        max_age: Option<u8>,
    },
    /// Caps everyone's daily contact count; zero lifts the cap.
    LimitMassGatherings { max_contacts: u32 },
    WearMasks {
        share_of_contacts: u32,
        #[serde(default)]
        place: Option<ContactPlace>,
        #[serde(default)]
        min_age: Option<u8>,
        #[serde(default)]
        max_age: Option<u8>,
    },
    Vaccinate {
        weekly_vaccinations: u32,
        min_age: u8,
        max_age: u8,
    },
}

impl Intervention {
    /// The external tag, as used in scenario files.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Intervention::TestAllWithSymptoms => "test-all-with-symptoms",
            Intervention::TestOnlySevereSymptoms { .. } => "test-only-severe-symptoms",
            Intervention::TestWithContactTracing { .. } => "test-with-contact-tracing",
            Intervention::BuildNewHospitalBeds { .. } => "build-new-hospital-beds",
            Intervention::BuildNewIcuUnits { .. } => "build-new-icu-units",
            Intervention::ImportInfections { .. } => "import-infections",
            Intervention::ImportInfectionsWeekly { .. } => "import-infections-weekly",
            Intervention::LimitMobility { .. } => "limit-mobility",
            Intervention::LimitMassGatherings { .. } => "limit-mass-gatherings",
            Intervention::WearMasks { .. } => "wear-masks",
            Intervention::Vaccinate { .. } => "vaccinate",
        }
    }

    /// Parameter validation against the configured disease. Unknown variants
    /// and out-of-range percentages are rejected here, before scheduling.
    pub(crate) fn validate(&self, disease: &Disease) -> Result<(), EpisimError> {
        let check_percent = |what: &str, value: u32| -> Result<(), EpisimError> {
            if value > 100 {
                Err(format!("{}: {what} must be 0..=100, got {value}", self.type_name()).into())
            } else {
                Ok(())
            }
        };
        let check_ages = |min_age: Option<u8>, max_age: Option<u8>| -> Result<(), EpisimError> {
            match (min_age, max_age) {
                (Some(min), Some(max)) if min > max => Err(format!(
                    "{}: min_age {min} exceeds max_age {max}",
                    self.type_name()
                )
                .into()),
                _ => Ok(()),
            }
        };

        match self {
            Intervention::TestOnlySevereSymptoms {
                mild_detection_rate,
            } => check_percent("mild_detection_rate", *mild_detection_rate),
            Intervention::TestWithContactTracing { efficiency } => {
                check_percent("efficiency", *efficiency)
            }
            Intervention::ImportInfections { variant, .. }
            | Intervention::ImportInfectionsWeekly { variant, .. } => {
                disease.resolve_variant(variant.as_deref()).map(|_| ())
            }
            Intervention::LimitMobility {
                reduction,
                min_age,
                max_age,
                ..
            } => {
                check_percent("reduction", *reduction)?;
                check_ages(*min_age, *max_age)
            }
            Intervention::WearMasks {
                share_of_contacts,
                min_age,
                max_age,
                ..
            } => {
                check_percent("share_of_contacts", *share_of_contacts)?;
                check_ages(*min_age, *max_age)
            }
            Intervention::Vaccinate {
                min_age, max_age, ..
            } => check_ages(Some(*min_age), Some(*max_age)),
            _ => Ok(()),
        }
    }
}

fn age_filter(min_age: Option<u8>, max_age: Option<u8>) -> Option<(u8, u8)> {
    if min_age.is_none() && max_age.is_none() {
        None
    } else {
        Some((min_age.unwrap_or(0), max_age.unwrap_or(u8::MAX)))
    }
}

/// Applies a (pre-validated) intervention to the running simulation.
pub(crate) fn apply(
    ctx: &mut Context,
    intervention: &Intervention,
) -> Result<(), SimulationProblem> {
    info!(
        "day {}: applying intervention {}",
        ctx.day,
        intervention.type_name()
    );
    match intervention {
        Intervention::TestAllWithSymptoms => {
            ctx.healthcare.testing_mode = TestingMode::AllWithSymptoms;
        }
        Intervention::TestOnlySevereSymptoms {
            mild_detection_rate,
        } => {
            ctx.healthcare.testing_mode = TestingMode::OnlySevereSymptoms;
            ctx.healthcare.p_detected_anyway = f64::from(*mild_detection_rate) / 100.0;
        }
        Intervention::TestWithContactTracing { efficiency } => {
            ctx.healthcare.testing_mode = TestingMode::AllWithSymptomsCT;
            ctx.healthcare.p_successful_tracing = f64::from(*efficiency) / 100.0;
        }
        Intervention::BuildNewHospitalBeds { beds } => {
            ctx.healthcare.add_beds(*beds);
        }
        Intervention::BuildNewIcuUnits { units } => {
            ctx.healthcare.add_icu_units(*units);
        }
        Intervention::ImportInfections { amount, variant } => {
            // Validated when scheduled; the name still resolves.
            let variant_idx = ctx.disease.resolve_variant(variant.as_deref()).unwrap_or(0);
            ctx.import_infections(*amount, variant_idx)?;
        }
        Intervention::ImportInfectionsWeekly {
            weekly_amount,
            variant,
        } => {
            let variant_idx = ctx.disease.resolve_variant(variant.as_deref()).unwrap_or(0);
            ctx.add_weekly_imports(f64::from(*weekly_amount), variant_idx);
        }
        Intervention::LimitMobility {
            reduction,
            place,
            min_age,
            max_age,
        } => {
            let factor = 1.0 - f64::from(*reduction) / 100.0;
            ctx.contacts
                .set_mobility_factor(factor, *place, age_filter(*min_age, *max_age));
        }
        Intervention::LimitMassGatherings { max_contacts } => {
            let limit = if *max_contacts == 0 {
                None
            } else {
                Some(*max_contacts)
            };
            ctx.contacts.set_mass_gathering_limit(limit);
        }
        Intervention::WearMasks {
            share_of_contacts,
            place,
            min_age,
            max_age,
        } => {
            let share = f64::from(*share_of_contacts) / 100.0;
            ctx.contacts
                .set_mask_probability(share, *place, age_filter(*min_age, *max_age));
        }
        Intervention::Vaccinate {
            weekly_vaccinations,
            min_age,
            max_age,
        } => {
            ctx.healthcare
                .add_vaccination_program(*weekly_vaccinations, *min_age, *max_age);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kebab_case_tags() {
        let intervention: Intervention =
            serde_json::from_str(r#"{"type": "test-all-with-symptoms"}"#).unwrap();
        assert_eq!(intervention, Intervention::TestAllWithSymptoms);

        let intervention: Intervention = serde_json::from_str(
            r#"{"type": "limit-mobility", "reduction": 80, "place": "work", "min_age": 18}"#,
        )
        .unwrap();
        assert_eq!(
            intervention,
            Intervention::LimitMobility {
                reduction: 80,
                place: Some(ContactPlace::Work),
                min_age: Some(18),
                max_age: None,
            }
        );

        let intervention: Intervention = serde_json::from_str(
            r#"{"type": "vaccinate", "weekly_vaccinations": 7000, "min_age": 70, "max_age": 99}"#,
        )
        .unwrap();
        assert_eq!(intervention.type_name(), "vaccinate");
    }

    #[test]
    fn rejects_unknown_type() {
        let result = serde_json::from_str::<Intervention>(r#"{"type": "cancel-christmas"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn validation_checks_percentages_and_ages() {
        let disease = Disease::wild_type();
        let over = Intervention::LimitMobility {
            reduction: 120,
            place: None,
            min_age: None,
            max_age: None,
        };
        assert!(over.validate(&disease).is_err());

        let inverted = Intervention::Vaccinate {
            weekly_vaccinations: 100,
            min_age: 80,
            max_age: 70,
        };
        assert!(inverted.validate(&disease).is_err());

        let fine = Intervention::TestWithContactTracing { efficiency: 100 };
        assert!(fine.validate(&disease).is_ok());
    }

    #[test]
    fn validation_checks_variant_names() {
        let disease = Disease::wild_type();
        let unknown = Intervention::ImportInfections {
            amount: 5,
            variant: Some("nope".to_string()),
        };
        assert!(unknown.validate(&disease).is_err());

        let wild = Intervention::ImportInfections {
            amount: 5,
            variant: None,
        };
        assert!(wild.validate(&disease).is_ok());
    }

    #[test]
    fn roundtrips_through_serde() {
        let intervention = Intervention::WearMasks {
            share_of_contacts: 60,
            place: Some(ContactPlace::Transport),
            min_age: None,
            max_age: Some(64),
        };
        let json = serde_json::to_string(&intervention).unwrap();
        assert!(json.contains("wear-masks"));
        let back: Intervention = serde_json::from_str(&json).unwrap();
        assert_eq!(back, intervention);
    }
}

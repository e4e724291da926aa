//! Step functions over integer classes.
//!
//! Age-dependent parameters arrive as a handful of `(class minimum, value)`
//! pairs, e.g. severity thresholds per decade of age. [`ClassifiedValues`]
//! resolves a concrete class (an age, or a day offset) to the value of the
//! last pair whose minimum does not exceed it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(i32, f64)>", into = "Vec<(i32, f64)>")]
pub struct ClassifiedValues {
    classes: Vec<(i32, f64)>,
}

impl ClassifiedValues {
    /// Builds a step function from `(class minimum, value)` pairs. The pairs
    /// must be non-empty with strictly ascending minimums.
    pub fn new(classes: Vec<(i32, f64)>) -> Result<Self, String> {
        if classes.is_empty() {
            return Err("classified values need at least one class".to_string());
        }
        for window in classes.windows(2) {
            if window[1].0 <= window[0].0 {
                return Err(format!(
                    "classified values must ascend: {} follows {}",
                    window[1].0, window[0].0
                ));
            }
        }
        Ok(ClassifiedValues { classes })
    }

    /// A single class covering everything.
    #[must_use]
    pub fn flat(value: f64) -> Self {
        ClassifiedValues {
            classes: vec![(0, value)],
        }
    }

    /// Value for `class`: the last entry whose minimum is `<= class`.
    /// Classes below the first minimum take the first value.
    #[must_use]
    pub fn get(&self, class: i32) -> f64 {
        let position = self.classes.partition_point(|&(min, _)| min <= class);
        if position == 0 {
            self.classes[0].1
        } else {
            self.classes[position - 1].1
        }
    }

    #[must_use]
    pub fn classes(&self) -> &[(i32, f64)] {
        &self.classes
    }
}

impl TryFrom<Vec<(i32, f64)>> for ClassifiedValues {
    type Error = String;

    fn try_from(classes: Vec<(i32, f64)>) -> Result<Self, Self::Error> {
        ClassifiedValues::new(classes)
    }
}

impl From<ClassifiedValues> for Vec<(i32, f64)> {
    fn from(values: ClassifiedValues) -> Self {
        values.classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_lookup() {
        let values = ClassifiedValues::new(vec![(0, 0.1), (10, 0.2), (60, 0.5)]).unwrap();
        assert_eq!(values.get(0), 0.1);
        assert_eq!(values.get(9), 0.1);
        assert_eq!(values.get(10), 0.2);
        assert_eq!(values.get(59), 0.2);
        assert_eq!(values.get(60), 0.5);
        assert_eq!(values.get(99), 0.5);
    }

    #[test]
    fn below_first_class_takes_first_value() {
        let values = ClassifiedValues::new(vec![(5, 0.7)]).unwrap();
        assert_eq!(values.get(0), 0.7);
    }

    #[test]
    fn flat_covers_everything() {
        let values = ClassifiedValues::flat(0.3);
        assert_eq!(values.get(0), 0.3);
        assert_eq!(values.get(100), 0.3);
    }

    #[test]
    fn rejects_empty_and_unsorted() {
        assert!(ClassifiedValues::new(vec![]).is_err());
        assert!(ClassifiedValues::new(vec![(10, 0.1), (0, 0.2)]).is_err());
        assert!(ClassifiedValues::new(vec![(0, 0.1), (0, 0.2)]).is_err());
    }

    #[test]
    fn deserializes_from_pairs() {
        let values: ClassifiedValues = serde_json::from_str("[[0, 0.1], [40, 0.4]]").unwrap();
        assert_eq!(values.get(50), 0.4);
        assert!(serde_json::from_str::<ClassifiedValues>("[]").is_err());
    }
}

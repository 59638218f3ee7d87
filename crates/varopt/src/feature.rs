use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaroptError};

/// Produces the next value of a numeric feature from the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepFunction {
    /// `v + k`
    Add(i64),
    /// `v * k`
    Multiply(i64),
}

impl StepFunction {
    /// Apply once; `None` on overflow
    pub fn apply(&self, value: i64) -> Option<i64> {
        match *self {
            StepFunction::Add(k) => value.checked_add(k),
            StepFunction::Multiply(k) => value.checked_mul(k),
        }
    }
}

impl fmt::Display for StepFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepFunction::Add(k) => write!(f, "+{}", k),
            StepFunction::Multiply(k) => write!(f, "*{}", k),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeatureKind {
    Binary,
    Numeric { min: i64, max: i64, step: StepFunction },
}

/// One variable of a feature model: either an on/off switch or a ranged integer.
///
/// Numeric features own the domain `min, step(min), step(step(min)), ...`
/// up to and including the last value not exceeding `max`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Feature {
    name: String,
    kind: FeatureKind,
}

impl Feature {
    pub fn binary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FeatureKind::Binary,
        }
    }

    /// Create a numeric feature.
    ///
    /// The step function has to be strictly increasing over the domain:
    /// `+k` needs `k >= 1`, `*k` needs `k >= 2` and `min >= 1`.
    pub fn numeric(name: impl Into<String>, min: i64, max: i64, step: StepFunction) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: &str| VaroptError::InvalidNumericDomain {
            feature: name.clone(),
            reason: reason.to_string(),
        };

        if min > max {
            return Err(invalid(&format!("min {} is greater than max {}", min, max)));
        }
        match step {
            StepFunction::Add(k) if k < 1 => {
                return Err(invalid(&format!("step {} does not increase", step)));
            }
            StepFunction::Multiply(k) if k < 2 => {
                return Err(invalid(&format!("step {} does not increase", step)));
            }
            StepFunction::Multiply(_) if min < 1 => {
                return Err(invalid(&format!("step {} does not increase from {}", step, min)));
            }
            _ => {}
        }

        Ok(Self {
            name,
            kind: FeatureKind::Numeric { min, max, step },
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FeatureKind {
        &self.kind
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.kind, FeatureKind::Binary)
    }

    pub fn is_numeric(&self) -> bool {
        !self.is_binary()
    }

    pub fn min_value(&self) -> Option<i64> {
        match self.kind {
            FeatureKind::Numeric { min, .. } => Some(min),
            FeatureKind::Binary => None,
        }
    }

    pub fn max_value(&self) -> Option<i64> {
        match self.kind {
            FeatureKind::Numeric { max, .. } => Some(max),
            FeatureKind::Binary => None,
        }
    }

    fn numeric_parts(&self) -> Result<(i64, i64, StepFunction)> {
        match self.kind {
            FeatureKind::Numeric { min, max, step } => Ok((min, max, step)),
            FeatureKind::Binary => Err(VaroptError::FeatureNotNumeric {
                feature: self.name.clone(),
            }),
        }
    }

    /// The value following `value`, if it stays within bounds
    pub fn next_value(&self, value: i64) -> Result<i64> {
        let (_, max, step) = self.numeric_parts()?;
        match step.apply(value) {
            Some(next) if next <= max => Ok(next),
            other => Err(VaroptError::NumericFeatureValueOverBounds {
                feature: self.name.clone(),
                value: other.unwrap_or(i64::MAX),
                max,
            }),
        }
    }

    /// The ordered domain of a numeric feature
    pub fn values(&self) -> Result<Vec<i64>> {
        let (min, max, step) = self.numeric_parts()?;
        let mut values = vec![min];
        let mut current = min;
        while let Some(next) = step.apply(current).filter(|&n| n <= max) {
            values.push(next);
            current = next;
        }
        Ok(values)
    }

    /// Position of `value` in the domain, `None` if it is not a domain value
    pub fn index_of(&self, value: i64) -> Result<Option<usize>> {
        Ok(self.values()?.iter().position(|&v| v == value))
    }

    /// How many steps separate `value` from the lowest and the highest domain value.
    pub fn max_steps(&self, value: i64) -> Result<(usize, usize)> {
        let values = self.values()?;
        let index = values
            .iter()
            .position(|&v| v == value)
            .ok_or_else(|| VaroptError::NumericValueInConfigInvalid {
                feature: self.name.clone(),
                value,
            })?;
        Ok((index, values.len() - 1 - index))
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FeatureKind::Binary => write!(f, "Feature: {}", self.name),
            FeatureKind::Numeric { min, max, step } => {
                write!(f, "Feature: {} [{}..{}, {}]", self.name, min, max, step)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gears() -> Feature {
        Feature::numeric("gears", 3, 8, StepFunction::Add(1)).unwrap()
    }

    #[test]
    fn test_additive_domain() {
        assert_eq!(gears().values().unwrap(), vec![3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_multiplicative_domain_stops_below_max() {
        let cache = Feature::numeric("cache", 1, 100, StepFunction::Multiply(4)).unwrap();
        assert_eq!(cache.values().unwrap(), vec![1, 4, 16, 64]);
    }

    #[test]
    fn test_single_value_domain() {
        let fixed = Feature::numeric("doors", 4, 4, StepFunction::Add(2)).unwrap();
        assert_eq!(fixed.values().unwrap(), vec![4]);
        assert_eq!(fixed.max_steps(4).unwrap(), (0, 0));
    }

    #[test]
    fn test_next_value() {
        let feature = gears();
        assert_eq!(feature.next_value(5).unwrap(), 6);
        assert!(matches!(
            feature.next_value(8),
            Err(VaroptError::NumericFeatureValueOverBounds { value: 9, max: 8, .. })
        ));
    }

    #[test]
    fn test_binary_feature_has_no_steps() {
        let feature = Feature::binary("Diesel");
        assert!(matches!(feature.next_value(1), Err(VaroptError::FeatureNotNumeric { .. })));
        assert!(matches!(feature.values(), Err(VaroptError::FeatureNotNumeric { .. })));
        assert_eq!(feature.min_value(), None);
    }

    #[test]
    fn test_rejects_non_increasing_steps() {
        assert!(Feature::numeric("a", 0, 10, StepFunction::Add(0)).is_err());
        assert!(Feature::numeric("b", 0, 10, StepFunction::Multiply(2)).is_err());
        assert!(Feature::numeric("c", 1, 10, StepFunction::Multiply(1)).is_err());
        assert!(Feature::numeric("d", 11, 10, StepFunction::Add(1)).is_err());
    }

    #[test]
    fn test_max_steps() {
        let feature = gears();
        assert_eq!(feature.max_steps(3).unwrap(), (0, 5));
        assert_eq!(feature.max_steps(6).unwrap(), (3, 2));
        assert!(matches!(
            feature.max_steps(42),
            Err(VaroptError::NumericValueInConfigInvalid { value: 42, .. })
        ));
    }

    #[test]
    fn test_index_of() {
        let feature = gears();
        assert_eq!(feature.index_of(5).unwrap(), Some(2));
        assert_eq!(feature.index_of(9).unwrap(), None);
    }
}

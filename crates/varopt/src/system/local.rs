use std::collections::{BTreeSet, HashMap};

use rayon::prelude::*;

use super::{select_best, FeatureSystem};
use crate::configuration::FeatureConfiguration;
use crate::error::{Result, VaroptError};
use crate::feature::Feature;
use crate::property::Property;

/// Which way a numeric feature moves to improve a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepDirection {
    /// Towards the largest domain value
    Up,
    /// Towards `min`
    Down,
    /// `min` and the largest value score the same
    Hold,
}

impl FeatureSystem {
    /// Best configuration within `max_diff` of `config` for one property.
    ///
    /// Binary neighbors are the valid models within `max_diff` of `config`.
    /// Every numeric feature moves up to `max_diff` steps in its improving
    /// direction, and that single numeric assignment is paired with each
    /// binary neighbor. `config` is evaluated in place as the baseline.
    pub fn find_local_optimum(
        &self,
        config: &mut FeatureConfiguration,
        property_name: &str,
        max_diff: usize,
    ) -> Result<FeatureConfiguration> {
        if !self.is_valid(config)? {
            return Err(VaroptError::ConfigurationNotValid);
        }
        let property = self.influence_model.property(property_name)?.clone();
        self.check_numeric_features(config)?;

        self.evaluate(config);
        let baseline: &FeatureConfiguration = config;

        let binary_neighbors = self.feature_model.near_models(baseline, max_diff)?;
        let directions = self.numeric_directions(&property)?;
        let numeric = self.step_numeric_features(&baseline.numeric_features, &directions, max_diff)?;

        let candidates: Vec<FeatureConfiguration> = binary_neighbors
            .into_par_iter()
            .map(|binary| self.candidate(baseline, binary, numeric.clone()))
            .collect();

        log::debug!(
            "Local search for {} evaluated {} candidates within distance {}",
            property.name(),
            candidates.len(),
            max_diff
        );

        let best = select_best(baseline.clone(), candidates, &property);
        if best == *baseline {
            return Err(VaroptError::AlreadyOptimum {
                property: property.name().to_string(),
            });
        }
        Ok(best)
    }

    /// Improving direction of every numeric feature for `property`.
    ///
    /// Each feature is scored at its lowest and highest domain value with
    /// everything else held at the minimal configuration.
    pub fn numeric_directions(&self, property: &Property) -> Result<HashMap<String, StepDirection>> {
        let baseline = self.minimal_configuration()?;

        self.feature_model
            .numeric_features()
            .values()
            .map(|feature| {
                let (low, high) = domain_bounds(feature)?;
                let at_low = self.score_with(&baseline, feature.name(), low, property);
                let at_high = self.score_with(&baseline, feature.name(), high, property);

                let direction = if property.improves(at_high, at_low) {
                    StepDirection::Up
                } else if property.improves(at_low, at_high) {
                    StepDirection::Down
                } else {
                    StepDirection::Hold
                };
                Ok((feature.name().to_string(), direction))
            })
            .collect()
    }

    fn score_with(&self, baseline: &FeatureConfiguration, feature: &str, value: i64, property: &Property) -> f64 {
        let mut probe = baseline.clone();
        probe.numeric_features.insert(feature.to_string(), value);
        self.evaluate(&mut probe);
        probe.property_value(property.name())
    }

    /// Move each numeric value up to `max_diff` steps in its direction, clamped to the domain
    fn step_numeric_features(
        &self,
        current: &HashMap<String, i64>,
        directions: &HashMap<String, StepDirection>,
        max_diff: usize,
    ) -> Result<HashMap<String, i64>> {
        self.feature_model
            .numeric_features()
            .values()
            .map(|feature| {
                let name = feature.name();
                let value = current.get(name).copied().ok_or_else(|| self.numeric_mismatch(current))?;
                let (down, up) = feature.max_steps(value)?;

                let index = match directions.get(name).copied().unwrap_or(StepDirection::Hold) {
                    StepDirection::Up => down + up.min(max_diff),
                    StepDirection::Down => down - down.min(max_diff),
                    StepDirection::Hold => down,
                };
                let next = feature.values()?.get(index).copied().ok_or_else(|| {
                    VaroptError::NumericValueInConfigInvalid {
                        feature: name.to_string(),
                        value,
                    }
                })?;
                Ok((name.to_string(), next))
            })
            .collect()
    }

    /// The configuration must carry exactly the model's numeric features
    fn check_numeric_features(&self, config: &FeatureConfiguration) -> Result<()> {
        let expected: BTreeSet<&str> = self.feature_model.numeric_features().values().map(Feature::name).collect();
        let given: BTreeSet<&str> = config.numeric_features.keys().map(String::as_str).collect();
        if expected == given {
            Ok(())
        } else {
            Err(self.numeric_mismatch(&config.numeric_features))
        }
    }

    fn numeric_mismatch(&self, numeric_features: &HashMap<String, i64>) -> VaroptError {
        let expected: BTreeSet<&str> = self.feature_model.numeric_features().values().map(Feature::name).collect();
        let given: BTreeSet<&str> = numeric_features.keys().map(String::as_str).collect();
        VaroptError::NumericFeaturesInConfigDontMatchModel {
            missing: expected.difference(&given).map(|s| s.to_string()).collect(),
            unexpected: given.difference(&expected).map(|s| s.to_string()).collect(),
        }
    }
}

/// Lowest and highest value of a numeric feature's domain
pub(super) fn domain_bounds(feature: &Feature) -> Result<(i64, i64)> {
    let values = feature.values()?;
    match (values.first(), values.last()) {
        (Some(&low), Some(&high)) => Ok((low, high)),
        _ => Err(VaroptError::InvalidNumericDomain {
            feature: feature.name().to_string(),
            reason: "empty domain".to_string(),
        }),
    }
}

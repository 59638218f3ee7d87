//! Optimization on top of a feature model and a performance-influence model.

mod global;
mod local;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::configuration::FeatureConfiguration;
use crate::error::{Result, VaroptError};
use crate::feature_model::{EnumerationState, FeatureModel};
use crate::influence::PerformanceInfluenceModel;
use crate::property::Property;

pub use local::StepDirection;

/// One configurable system: which configurations are valid, and how good they are.
#[derive(Debug)]
pub struct FeatureSystem {
    name: String,
    feature_model: FeatureModel,
    influence_model: PerformanceInfluenceModel,
    config: EngineConfig,
    global_optimum: Mutex<Option<Arc<HashMap<String, FeatureConfiguration>>>>,
}

impl FeatureSystem {
    /// Couple the two models and make sure enumeration is running.
    ///
    /// Every feature an influence row mentions must belong to the feature
    /// model. A feature model that has not been started yet picks up the
    /// enumeration timeout from `config`.
    pub fn new(
        name: impl Into<String>,
        mut feature_model: FeatureModel,
        influence_model: PerformanceInfluenceModel,
        config: EngineConfig,
    ) -> Result<Self> {
        for influence in influence_model.influences() {
            for feature in influence.active_features() {
                let Some(declared) = feature_model.feature(feature.name()) else {
                    return Err(VaroptError::InfluenceFeatureNotInModel {
                        feature: feature.name().to_string(),
                    });
                };
                if declared.is_numeric() != feature.is_numeric() {
                    return Err(VaroptError::InfluenceFeatureKindMismatch {
                        feature: feature.name().to_string(),
                        numeric_in_model: declared.is_numeric(),
                    });
                }
            }
        }

        if matches!(feature_model.state(), EnumerationState::NotStarted) {
            feature_model.set_enumeration_timeout(config.enumeration_timeout());
        }
        feature_model.start_enumeration()?;

        let name = name.into();
        log::debug!("Feature system {} with {} influence rows", name, influence_model.influences().len());

        Ok(Self {
            name,
            feature_model,
            influence_model,
            config,
            global_optimum: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feature_model(&self) -> &FeatureModel {
        &self.feature_model
    }

    pub fn influence_model(&self) -> &PerformanceInfluenceModel {
        &self.influence_model
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.influence_model.properties()
    }

    pub fn is_valid(&self, config: &FeatureConfiguration) -> Result<bool> {
        self.feature_model.is_valid(config)
    }

    /// Predict every property and store the values in `config`
    pub fn evaluate(&self, config: &mut FeatureConfiguration) -> HashMap<Property, f64> {
        self.influence_model.evaluate(config)
    }

    /// The minimal valid model with every numeric feature at its minimum, not yet evaluated
    pub fn minimal_configuration(&self) -> Result<FeatureConfiguration> {
        Ok(FeatureConfiguration::new(
            self.name.clone(),
            self.feature_model.minimal_model()?,
            self.feature_model.initial_numeric_values(),
            self.influence_model.initial_property_map(),
        ))
    }

    /// The nearest valid configuration to `config`, evaluated.
    ///
    /// Numeric values are carried over unchanged.
    pub fn alternative_configuration(&self, config: &FeatureConfiguration) -> Result<FeatureConfiguration> {
        let feature_count = self.feature_model.features().count();

        for max_diff in 0..=feature_count {
            let Some(binary_features) = self.feature_model.near_models(config, max_diff)?.into_iter().next() else {
                continue;
            };

            log::debug!("Found an alternative configuration at distance {}", max_diff);
            let mut alternative = FeatureConfiguration::new(
                config.feature_model_name.clone(),
                binary_features,
                config.numeric_features.clone(),
                self.influence_model.initial_property_map(),
            );
            self.evaluate(&mut alternative);
            return Ok(alternative);
        }

        Err(VaroptError::ModelHasNoValidConfigurations)
    }

    fn candidate(
        &self,
        template: &FeatureConfiguration,
        binary_features: HashMap<String, bool>,
        numeric_features: HashMap<String, i64>,
    ) -> FeatureConfiguration {
        let mut candidate = FeatureConfiguration::new(
            template.feature_model_name.clone(),
            binary_features,
            numeric_features,
            self.influence_model.initial_property_map(),
        );
        self.evaluate(&mut candidate);
        candidate
    }
}

/// Strictly better than the running best wins; ties keep the earlier candidate
fn select_best(
    start: FeatureConfiguration,
    candidates: Vec<FeatureConfiguration>,
    property: &Property,
) -> FeatureConfiguration {
    candidates.into_iter().fold(start, |best, candidate| {
        if candidate.is_better_than(&best, property) {
            candidate
        } else {
            best
        }
    })
}

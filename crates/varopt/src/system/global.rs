use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use super::local::{domain_bounds, StepDirection};
use super::{select_best, FeatureSystem};
use crate::configuration::FeatureConfiguration;
use crate::error::{Result, VaroptError};
use crate::feature::Feature;
use crate::property::Property;

impl FeatureSystem {
    /// A fast estimate of the best configuration for every property.
    ///
    /// Computed on first use and cached for the lifetime of the system;
    /// concurrent callers wait for the first computation and share its result.
    pub fn global_optimum_per_property(&self) -> Result<Arc<HashMap<String, FeatureConfiguration>>> {
        let mut cache = self.global_optimum.lock();
        if let Some(optima) = cache.as_ref() {
            return Ok(Arc::clone(optima));
        }

        let start = Instant::now();
        let properties: Vec<&Property> = self.influence_model.properties().collect();

        let optima = properties
            .par_iter()
            .enumerate()
            .map(|(index, property)| {
                self.estimate_global_optimum(property, index)
                    .map(|config| (property.name().to_string(), config))
            })
            .collect::<Result<HashMap<String, FeatureConfiguration>>>()?;

        log::info!(
            "Estimated global optima of {} for {} properties in {:.3} seconds",
            self.name,
            optima.len(),
            start.elapsed().as_secs_f64()
        );

        let optima = Arc::new(optima);
        *cache = Some(Arc::clone(&optima));
        Ok(optima)
    }

    /// Best of a handful of random valid models, refined by a local search
    fn estimate_global_optimum(&self, property: &Property, index: usize) -> Result<FeatureConfiguration> {
        let mut rng = match self.config.sample_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_entropy(),
        };

        let directions = self.numeric_directions(property)?;
        let numeric = self.numeric_extremes(&directions)?;
        let template = self.minimal_configuration()?;

        let samples = (0..self.config.global_sample_count)
            .map(|_| self.feature_model.random_valid_config(&mut rng))
            .collect::<Result<Vec<_>>>()?;

        let mut candidates: Vec<FeatureConfiguration> = samples
            .into_par_iter()
            .map(|features| {
                let binary = self.feature_model.binary_assignment(features.iter().map(Feature::name));
                self.candidate(&template, binary, numeric.clone())
            })
            .collect();

        if candidates.is_empty() {
            return Err(VaroptError::ModelHasNoValidConfigurations);
        }
        let first = candidates.remove(0);
        let best = select_best(first, candidates, property);

        let mut refined = best.clone();
        match self.find_local_optimum(&mut refined, property.name(), self.config.global_refine_distance) {
            Ok(optimum) => Ok(optimum),
            Err(VaroptError::AlreadyOptimum { .. }) => {
                log::debug!("Best sample for {} is already a local optimum", property.name());
                Ok(best)
            }
            Err(e) => {
                log::warn!("Refining the global sample for {} failed, keeping it: {}", property.name(), e);
                Ok(best)
            }
        }
    }

    /// Every numeric feature at the end of its domain its direction points to
    fn numeric_extremes(&self, directions: &HashMap<String, StepDirection>) -> Result<HashMap<String, i64>> {
        self.feature_model
            .numeric_features()
            .values()
            .map(|feature| {
                let (low, high) = domain_bounds(feature)?;
                let value = match directions.get(feature.name()) {
                    Some(StepDirection::Up) => high,
                    _ => low,
                };
                Ok((feature.name().to_string(), value))
            })
            .collect()
    }
}

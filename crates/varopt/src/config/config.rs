use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaroptError};
use super::source::ConfigLoader;

/// Tunables for enumeration and optimization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Wall-clock limit for valid model enumeration
    #[serde(default = "default_enumeration_timeout_secs")]
    pub enumeration_timeout_secs: u64,

    /// Random valid models drawn per property by the global estimator
    #[serde(default = "default_global_sample_count")]
    pub global_sample_count: usize,

    /// Neighborhood size used to refine the best global sample
    #[serde(default = "default_global_refine_distance")]
    pub global_refine_distance: usize,

    /// Seed for reproducible sampling; entropy when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_seed: Option<u64>,
}

fn default_enumeration_timeout_secs() -> u64 {
    30 * 60
}

fn default_global_sample_count() -> usize {
    10
}

fn default_global_refine_distance() -> usize {
    3
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            enumeration_timeout_secs: default_enumeration_timeout_secs(),
            global_sample_count: default_global_sample_count(),
            global_refine_distance: default_global_refine_distance(),
            sample_seed: None,
        }
    }
}

impl EngineConfig {
    /// Defaults, overlaid with a JSON file (if given) and then the environment (if enabled)
    pub fn build(path: Option<&Path>, use_environment: bool) -> Result<Self> {
        let loader = ConfigLoader::new(use_environment);

        let mut config = match path {
            Some(path) => {
                let value = loader.load_config_file(path)?;
                serde_json::from_value(value)?
            }
            None => EngineConfig::default(),
        };

        config.apply_env(&loader);
        config.validate()?;

        log::debug!("Engine configuration: {:?}", config);
        Ok(config)
    }

    /// Parse a configuration from a JSON file, without environment overrides
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::build(Some(path.as_ref()), false)
    }

    fn apply_env(&mut self, loader: &ConfigLoader) {
        if let Some(secs) = loader.get_env_u64("enumeration-timeout-secs") {
            self.enumeration_timeout_secs = secs;
        }
        if let Some(count) = loader.get_env_usize("global-sample-count") {
            self.global_sample_count = count;
        }
        if let Some(distance) = loader.get_env_usize("global-refine-distance") {
            self.global_refine_distance = distance;
        }
        if let Some(seed) = loader.get_env_u64("sample-seed") {
            self.sample_seed = Some(seed);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.global_sample_count == 0 {
            return Err(VaroptError::Config("global-sample-count must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn enumeration_timeout(&self) -> Duration {
        Duration::from_secs(self.enumeration_timeout_secs)
    }

    /// Same configuration with a fixed sampling seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }
}

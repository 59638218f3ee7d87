use std::env;
use std::fs;
use std::path::Path;

use crate::error::{Result, VaroptError};

/// Loads engine configuration from files and the environment
#[derive(Debug)]
pub struct ConfigLoader {
    use_environment: bool,
}

impl ConfigLoader {
    pub fn new(use_environment: bool) -> Self {
        Self { use_environment }
    }

    /// Get a VAROPT_* environment variable
    pub fn get_varopt_env(&self, var: &str) -> Option<String> {
        if !self.use_environment {
            return None;
        }

        env::var(var).ok().filter(|s| !s.is_empty())
    }

    /// Read a JSON configuration file. A missing file yields an empty object.
    pub fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<serde_json::Value> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(serde_json::Value::Object(Default::default()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| VaroptError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let value = serde_json::from_str(&contents)
            .map_err(|e| VaroptError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        Ok(value)
    }

    /// Get a configuration value from environment variable
    /// Converts "foo-bar" to "VAROPT_FOO_BAR"
    pub fn get_env_config(&self, key: &str) -> Option<String> {
        let env_var = format!("VAROPT_{}", key.replace('-', "_").to_uppercase());
        self.get_varopt_env(&env_var)
    }

    /// Get unsigned integer value from environment variable
    pub fn get_env_u64(&self, key: &str) -> Option<u64> {
        self.get_env_config(key).and_then(|val| val.parse().ok())
    }

    /// Get usize value from environment variable
    pub fn get_env_usize(&self, key: &str) -> Option<usize> {
        self.get_env_config(key).and_then(|val| val.parse().ok())
    }
}

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::property::Property;

/// A concrete choice of feature values for one feature model.
///
/// Features and properties are addressed by name. `property_values` is filled
/// in by evaluation and takes no part in equality.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureConfiguration {
    pub feature_model_name: String,
    pub binary_features: HashMap<String, bool>,
    pub numeric_features: HashMap<String, i64>,
    #[serde(default)]
    pub property_values: HashMap<String, f64>,
}

impl FeatureConfiguration {
    pub fn new(
        feature_model_name: impl Into<String>,
        binary_features: HashMap<String, bool>,
        numeric_features: HashMap<String, i64>,
        property_values: HashMap<String, f64>,
    ) -> Self {
        Self {
            feature_model_name: feature_model_name.into(),
            binary_features,
            numeric_features,
            property_values,
        }
    }

    /// Names of the binary features set to true
    pub fn active_features(&self) -> BTreeSet<&str> {
        self.binary_features
            .iter()
            .filter(|(_, &enabled)| enabled)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Active binary features plus every numeric feature, the set influence rows match against
    pub fn influencing_features(&self) -> BTreeSet<&str> {
        let mut features = self.active_features();
        features.extend(self.numeric_features.keys().map(String::as_str));
        features
    }

    /// Stored value of a property; unevaluated properties read as 0.0
    pub fn property_value(&self, property_name: &str) -> f64 {
        self.property_values.get(property_name).copied().unwrap_or(0.0)
    }

    /// Whether this configuration's stored value for `property` is strictly better than `other`'s
    pub fn is_better_than(&self, other: &FeatureConfiguration, property: &Property) -> bool {
        property.improves(self.property_value(property.name()), other.property_value(property.name()))
    }
}

impl PartialEq for FeatureConfiguration {
    fn eq(&self, other: &Self) -> bool {
        let same_binary_keys = self.binary_features.len() == other.binary_features.len()
            && self.binary_features.keys().all(|k| other.binary_features.contains_key(k));

        same_binary_keys
            && self.active_features() == other.active_features()
            && self.numeric_features == other.numeric_features
    }
}

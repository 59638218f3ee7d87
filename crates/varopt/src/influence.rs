use std::collections::{BTreeSet, HashMap};
use std::fmt;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;

use crate::configuration::FeatureConfiguration;
use crate::error::{Result, VaroptError};
use crate::feature::Feature;
use crate::property::Property;

/// One row of a performance-influence table.
///
/// The row applies when all of its features are active; numeric features
/// among them scale the coefficients by their current values.
#[derive(Debug, Clone)]
pub struct FeatureInfluence {
    active_features: Vec<Feature>,
    coefficients: HashMap<Property, f64>,
}

impl FeatureInfluence {
    pub fn new(active_features: impl IntoIterator<Item = Feature>, coefficients: HashMap<Property, f64>) -> Self {
        Self {
            active_features: active_features.into_iter().collect(),
            coefficients,
        }
    }

    pub fn active_features(&self) -> &[Feature] {
        &self.active_features
    }

    pub fn coefficients(&self) -> &HashMap<Property, f64> {
        &self.coefficients
    }

    /// Whether every feature of this row is in `active`
    pub fn matches(&self, active: &BTreeSet<&str>) -> bool {
        self.active_features.iter().all(|f| active.contains(f.name()))
    }

    /// Product of the configuration's values for the numeric features of this row
    pub fn factor(&self, config: &FeatureConfiguration) -> f64 {
        self.active_features
            .iter()
            .filter(|f| f.is_numeric())
            .filter_map(|f| config.numeric_features.get(f.name()))
            .fold(1.0, |factor, &value| factor * value as f64)
    }
}

impl fmt::Display for FeatureInfluence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let features: Vec<&str> = self.active_features.iter().map(Feature::name).collect();
        let mut coefficients: Vec<String> = self.coefficients
            .iter()
            .map(|(p, v)| format!("{}:{}", p.name(), v))
            .collect();
        coefficients.sort();
        write!(f, "{}->{}", features.join(","), coefficients.join(";"))
    }
}

/// What a single matching influence row adds to an evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfluenceContribution {
    pub features: Vec<String>,
    pub multiplier: f64,
    /// property name -> multiplier * coefficient
    pub values: IndexMap<String, f64>,
}

/// Predicts property values of a configuration from a table of influence rows.
#[derive(Debug, Clone)]
pub struct PerformanceInfluenceModel {
    properties: IndexMap<String, Property>,
    influences: Vec<FeatureInfluence>,
}

impl PerformanceInfluenceModel {
    pub fn new(properties: impl IntoIterator<Item = Property>, influences: Vec<FeatureInfluence>) -> Self {
        let properties = properties
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();
        Self { properties, influences }
    }

    /// Properties in declaration order
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    pub fn influences(&self) -> &[FeatureInfluence] {
        &self.influences
    }

    pub fn property(&self, name: &str) -> Result<&Property> {
        self.properties
            .get(name)
            .ok_or_else(|| VaroptError::PropertyNotInModel { name: name.to_string() })
    }

    /// Whether lower values of the named property are better
    pub fn minimize(&self, property_name: &str) -> Result<bool> {
        Ok(self.property(property_name)?.minimize())
    }

    /// Every property name mapped to 0.0
    pub fn initial_property_map(&self) -> HashMap<String, f64> {
        self.properties.keys().map(|name| (name.clone(), 0.0)).collect()
    }

    /// Dissect the evaluation of `config` into the contributions of its matching rows.
    pub fn contributions(&self, config: &FeatureConfiguration) -> Vec<InfluenceContribution> {
        let active = config.influencing_features();

        self.influences
            .par_iter()
            .filter(|row| row.matches(&active))
            .map(|row| {
                let multiplier = row.factor(config);
                let values = self.properties
                    .values()
                    .filter_map(|property| {
                        row.coefficients
                            .get(property)
                            .map(|coefficient| (property.name().to_string(), multiplier * coefficient))
                    })
                    .collect();

                InfluenceContribution {
                    features: row.active_features.iter().map(|f| f.name().to_string()).collect(),
                    multiplier,
                    values,
                }
            })
            .collect()
    }

    /// Predict every property for `config`.
    ///
    /// The per-property totals are also stored in `config.property_values`;
    /// properties no row contributes to stay at 0.0.
    pub fn evaluate(&self, config: &mut FeatureConfiguration) -> HashMap<Property, f64> {
        let mut totals: IndexMap<String, f64> = self.properties
            .keys()
            .map(|name| (name.clone(), 0.0))
            .collect();

        for contribution in self.contributions(config) {
            for (name, value) in contribution.values {
                *totals.entry(name).or_insert(0.0) += value;
            }
        }

        let evaluation = self.properties
            .values()
            .map(|property| (property.clone(), totals[property.name()]))
            .collect();

        config.property_values = totals.into_iter().collect();
        evaluation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::StepFunction;

    fn properties() -> Vec<Property> {
        vec![
            Property::new("property_1", "s", false),
            Property::new("property2", "s", false),
            Property::new("property3", "s", false),
        ]
    }

    fn row(features: &[Feature], coefficients: &[(&str, f64)]) -> FeatureInfluence {
        let coefficients = coefficients
            .iter()
            .map(|(name, value)| (Property::new(*name, "s", false), *value))
            .collect();
        FeatureInfluence::new(features.to_vec(), coefficients)
    }

    fn binary_config(features: &[(&str, bool)]) -> FeatureConfiguration {
        FeatureConfiguration::new(
            "test",
            features.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            HashMap::new(),
            HashMap::new(),
        )
    }

    fn binary_model() -> PerformanceInfluenceModel {
        let f1 = Feature::binary("feature1");
        let f2 = Feature::binary("feature2");
        PerformanceInfluenceModel::new(properties(), vec![
            row(&[f1.clone()], &[("property_1", 0.3), ("property2", 0.4)]),
            row(&[f2.clone()], &[("property_1", 1.1), ("property2", -1.345)]),
            row(&[f1, f2], &[("property3", 1.5342245214)]),
        ])
    }

    #[test]
    fn test_evaluate_single_feature() {
        let model = binary_model();
        let mut config = binary_config(&[("feature1", true), ("feature2", false)]);

        let result = model.evaluate(&mut config);

        assert_eq!(result.len(), 3);
        assert!((result[&Property::new("property_1", "", true)] - 0.3).abs() < 1e-5);
        assert!((result[&Property::new("property2", "", true)] - 0.4).abs() < 1e-5);
        assert_eq!(result[&Property::new("property3", "", true)], 0.0);
        assert!((config.property_value("property_1") - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_evaluate_interaction() {
        let model = binary_model();
        let mut config = binary_config(&[("feature1", true), ("feature2", true)]);

        model.evaluate(&mut config);

        assert!((config.property_value("property_1") - 1.4).abs() < 1e-5);
        assert!((config.property_value("property2") - -0.945).abs() < 1e-5);
        assert!((config.property_value("property3") - 1.5342245214).abs() < 1e-5);
    }

    #[test]
    fn test_numeric_features_scale_coefficients() {
        let car = Feature::binary("Auto");
        let gears = Feature::numeric("Gaenge", 4, 6, StepFunction::Add(1)).unwrap();
        let doors = Feature::numeric("Tueren", 2, 4, StepFunction::Add(2)).unwrap();
        let price = Property::new("Preis", "EUR", true);

        let model = PerformanceInfluenceModel::new(vec![price.clone()], vec![
            FeatureInfluence::new(vec![car.clone()], [(price.clone(), 5000.0)].into_iter().collect()),
            FeatureInfluence::new(vec![gears.clone()], [(price.clone(), 100.0)].into_iter().collect()),
            FeatureInfluence::new(vec![gears, doors], [(price.clone(), 10.0)].into_iter().collect()),
        ]);

        let mut config = FeatureConfiguration::new(
            "car",
            [("Auto".to_string(), true)].into_iter().collect(),
            [("Gaenge".to_string(), 5), ("Tueren".to_string(), 4)].into_iter().collect(),
            HashMap::new(),
        );

        let result = model.evaluate(&mut config);
        assert_eq!(result[&price], 5000.0 + 500.0 + 200.0);

        let contributions = model.contributions(&config);
        assert_eq!(contributions.len(), 3);
        assert_eq!(contributions[2].multiplier, 20.0);
        assert_eq!(contributions[2].values["Preis"], 200.0);
    }

    #[test]
    fn test_inactive_rows_do_not_contribute() {
        let model = binary_model();
        let mut config = binary_config(&[("feature1", false), ("feature2", false)]);

        model.evaluate(&mut config);

        assert!(model.contributions(&config).is_empty());
        assert!(config.property_values.values().all(|&v| v == 0.0));
        assert_eq!(config.property_values.len(), 3);
    }

    #[test]
    fn test_row_order_does_not_matter() {
        let f1 = Feature::binary("feature1");
        let f2 = Feature::binary("feature2");
        let rows = vec![
            row(&[f1.clone()], &[("property_1", 2.0)]),
            row(&[f2.clone()], &[("property_1", 3.0)]),
            row(&[f1, f2], &[("property_1", -1.0)]),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();

        let forward = PerformanceInfluenceModel::new(properties(), rows);
        let backward = PerformanceInfluenceModel::new(properties(), reversed);

        let mut a = binary_config(&[("feature1", true), ("feature2", true)]);
        let mut b = a.clone();
        forward.evaluate(&mut a);
        backward.evaluate(&mut b);

        assert_eq!(a.property_value("property_1"), b.property_value("property_1"));
    }

    #[test]
    fn test_minimize_unknown_property() {
        let model = binary_model();
        assert!(!model.minimize("property2").unwrap());
        assert!(matches!(
            model.minimize("latency"),
            Err(VaroptError::PropertyNotInModel { name }) if name == "latency"
        ));
    }

    #[test]
    fn test_initial_property_map() {
        let map = binary_model().initial_property_map();
        assert_eq!(map.len(), 3);
        assert!(map.values().all(|&v| v == 0.0));
    }

    #[test]
    fn test_influence_display() {
        let influence = row(&[Feature::binary("a"), Feature::binary("b")], &[("p", 0.5)]);
        assert_eq!(influence.to_string(), "a,b->p:0.5");
    }
}

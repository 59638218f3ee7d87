use thiserror::Error;

use varopt_sat::EnumerationError;

#[derive(Error, Debug)]
pub enum VaroptError {
    // Configuration/model mismatch
    #[error("Configuration contains foreign features: {}", .foreign.join(", "))]
    ConfigurationNotSubsetOfModel { foreign: Vec<String> },

    #[error("The given configuration is not valid for this system")]
    ConfigurationNotValid,

    #[error("The numeric features in the configuration don't match the model (missing: [{}], unexpected: [{}])",
        .missing.join(", "), .unexpected.join(", "))]
    NumericFeaturesInConfigDontMatchModel { missing: Vec<String>, unexpected: Vec<String> },

    #[error("Value {value} is not in the domain of numeric feature {feature}")]
    NumericValueInConfigInvalid { feature: String, value: i64 },

    // Enumeration errors
    #[error("Valid model enumeration failed: {0}")]
    EnumerationFailed(#[from] EnumerationError),

    #[error("Valid model enumeration was interrupted: {0}")]
    InterruptedDuringEnumeration(String),

    #[error("This model has no valid configurations")]
    ModelHasNoValidConfigurations,

    // Optimization errors
    #[error("The optimum for {property} has already been reached")]
    AlreadyOptimum { property: String },

    #[error("No such property in model: {name}")]
    PropertyNotInModel { name: String },

    // Feature errors
    #[error("Next value {value} of {feature} exceeds the maximum {max}")]
    NumericFeatureValueOverBounds { feature: String, value: i64, max: i64 },

    #[error("Feature {feature} is not a numeric one")]
    FeatureNotNumeric { feature: String },

    #[error("Invalid domain for numeric feature {feature}: {reason}")]
    InvalidNumericDomain { feature: String, reason: String },

    #[error("Influence row references feature {feature} which is not part of the feature model")]
    InfluenceFeatureNotInModel { feature: String },

    #[error("Influence row uses feature {feature} with a different kind than the feature model (numeric in model: {numeric_in_model})")]
    InfluenceFeatureKindMismatch { feature: String, numeric_in_model: bool },

    // Engine configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse engine configuration: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VaroptError>;

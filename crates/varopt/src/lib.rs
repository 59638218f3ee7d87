pub mod config;
pub mod configuration;
pub mod error;
pub mod feature;
pub mod feature_model;
pub mod influence;
pub mod property;
pub mod system;

pub use config::EngineConfig;
pub use configuration::FeatureConfiguration;
pub use error::{Result, VaroptError};
pub use feature::{Feature, FeatureKind, StepFunction};
pub use feature_model::{EnumerationState, FailureReason, FeatureModel, ValidModels};
pub use influence::{FeatureInfluence, InfluenceContribution, PerformanceInfluenceModel};
pub use property::Property;
pub use system::{FeatureSystem, StepDirection};
pub use varopt_sat::{ClauseSet, Literal, Variable};

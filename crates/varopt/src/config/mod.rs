//! Engine configuration
//!
//! Tunables for enumeration and optimization, loaded from (in priority order,
//! highest to lowest):
//!
//! 1. Environment variables (`VAROPT_*`)
//! 2. A JSON configuration file
//! 3. Built-in defaults
//!
//! # Example
//!
//! ```rust,no_run
//! use varopt::config::EngineConfig;
//! use std::path::Path;
//!
//! let config = EngineConfig::build(Some(Path::new("varopt.json")), true).unwrap();
//! println!("Enumeration timeout: {:?}", config.enumeration_timeout());
//! ```

mod config;
mod source;

pub use config::EngineConfig;
pub use source::ConfigLoader;

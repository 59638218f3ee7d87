/// Integration tests for the engine configuration
///
/// These tests verify loading from JSON files and environment variables.

use std::env;
use std::fs;
use std::time::Duration;

use tempfile::TempDir;
use varopt::config::{ConfigLoader, EngineConfig};
use varopt::VaroptError;

#[test]
fn test_config_defaults() {
    let config = EngineConfig::default();

    assert_eq!(config.enumeration_timeout(), Duration::from_secs(30 * 60));
    assert_eq!(config.global_sample_count, 10);
    assert_eq!(config.global_refine_distance, 3);
    assert_eq!(config.sample_seed, None);
}

#[test]
fn test_load_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("varopt.json");
    fs::write(
        &config_file,
        r#"{
            "enumeration-timeout-secs": 60,
            "global-sample-count": 20,
            "sample-seed": 1234
        }"#,
    )
    .unwrap();

    let config = EngineConfig::load_file(&config_file).unwrap();

    assert_eq!(config.enumeration_timeout(), Duration::from_secs(60));
    assert_eq!(config.global_sample_count, 20);
    assert_eq!(config.global_refine_distance, 3);
    assert_eq!(config.sample_seed, Some(1234));
}

#[test]
fn test_load_missing_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = EngineConfig::load_file(temp_dir.path().join("missing.json")).unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
fn test_load_invalid_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("varopt.json");
    fs::write(&config_file, "{ not json").unwrap();

    let err = EngineConfig::load_file(&config_file).unwrap_err();
    assert!(matches!(err, VaroptError::Config(_)));
}

#[test]
fn test_zero_sample_count_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("varopt.json");
    fs::write(&config_file, r#"{"global-sample-count": 0}"#).unwrap();

    let err = EngineConfig::load_file(&config_file).unwrap_err();
    assert!(matches!(err, VaroptError::Config(_)));
}

#[test]
fn test_environment_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("varopt.json");
    fs::write(&config_file, r#"{"global-refine-distance": 2}"#).unwrap();

    env::set_var("VAROPT_GLOBAL_REFINE_DISTANCE", "5");

    let loader = ConfigLoader::new(true);
    assert_eq!(loader.get_env_usize("global-refine-distance"), Some(5));

    let with_env = EngineConfig::build(Some(config_file.as_path()), true).unwrap();
    let without_env = EngineConfig::build(Some(config_file.as_path()), false).unwrap();

    env::remove_var("VAROPT_GLOBAL_REFINE_DISTANCE");

    assert_eq!(with_env.global_refine_distance, 5);
    assert_eq!(without_env.global_refine_distance, 2);
}

//! Tests for config file resolution and loading
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate environment variables are marked with #[serial].

use narr_common::config::{
    load_or_default, load_toml, resolve_config_file, ConfigSource, LoggingConfig,
};
use narr_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

const TEST_ENV_VAR: &str = "NARR_COMMON_TEST_CONFIG";

#[derive(Debug, Default, Deserialize, PartialEq)]
struct SampleConfig {
    #[serde(default)]
    threshold: f64,
    #[serde(default)]
    logging: LoggingConfig,
}

#[test]
#[serial]
fn test_cli_path_has_highest_priority() {
    let dir = TempDir::new().unwrap();
    let cli = dir.path().join("cli.toml");
    let from_env = dir.path().join("env.toml");
    fs::write(&cli, "threshold = 1.0").unwrap();
    fs::write(&from_env, "threshold = 2.0").unwrap();
    env::set_var(TEST_ENV_VAR, &from_env);

    let source = resolve_config_file(Some(&cli), TEST_ENV_VAR, "sample.toml").unwrap();
    assert_eq!(source, ConfigSource::CommandLine(cli.clone()));

    env::remove_var(TEST_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_path() {
    let dir = TempDir::new().unwrap();
    let from_env = dir.path().join("env.toml");
    fs::write(&from_env, "threshold = 2.0").unwrap();
    env::set_var(TEST_ENV_VAR, &from_env);

    let (config, source): (SampleConfig, _) =
        load_or_default(None, TEST_ENV_VAR, "sample.toml").unwrap();
    assert_eq!(source, ConfigSource::Environment(from_env.clone()));
    assert_eq!(config.threshold, 2.0);
    assert_eq!(config.logging.level, "info");

    env::remove_var(TEST_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_explicit_path_is_an_error() {
    env::remove_var(TEST_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let result = resolve_config_file(Some(&missing), TEST_ENV_VAR, "sample.toml");
    assert!(matches!(result, Err(Error::Config(_))));

    env::set_var(TEST_ENV_VAR, &missing);
    let result = resolve_config_file(None, TEST_ENV_VAR, "sample.toml");
    assert!(matches!(result, Err(Error::Config(_))));
    env::remove_var(TEST_ENV_VAR);
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_user_config_dir_then_defaults() {
    env::remove_var(TEST_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let previous = env::var_os("XDG_CONFIG_HOME");
    env::set_var("XDG_CONFIG_HOME", dir.path());

    // Nothing on disk yet: defaults
    let (config, source): (SampleConfig, _) =
        load_or_default(None, TEST_ENV_VAR, "sample.toml").unwrap();
    assert_eq!(source, ConfigSource::Defaults);
    assert_eq!(config, SampleConfig::default());

    let narr_dir = dir.path().join("narr");
    fs::create_dir_all(&narr_dir).unwrap();
    fs::write(
        narr_dir.join("sample.toml"),
        "threshold = 3.5\n[logging]\nlevel = \"debug\"\n",
    )
    .unwrap();

    let (config, source): (SampleConfig, _) =
        load_or_default(None, TEST_ENV_VAR, "sample.toml").unwrap();
    assert!(matches!(source, ConfigSource::UserConfigDir(_)));
    assert_eq!(config.threshold, 3.5);
    assert_eq!(config.logging.level, "debug");

    match previous {
        Some(value) => env::set_var("XDG_CONFIG_HOME", value),
        None => env::remove_var("XDG_CONFIG_HOME"),
    }
}

#[test]
fn test_malformed_toml_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "threshold = [unterminated").unwrap();

    let result: Result<SampleConfig, _> = load_toml(&path);
    assert!(matches!(result, Err(Error::Toml(_))));
}

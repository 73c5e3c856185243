//! Configuration file resolution and loading
//!
//! Config file location follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config directory (`<config_dir>/narr/<file_name>`)
//! 4. None: caller falls back to built-in defaults
//!
//! A file named explicitly (CLI or environment) must exist. A missing file at
//! the per-user location is not an error.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory under the platform config dir holding narr config files
pub const CONFIG_DIR_NAME: &str = "narr";

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level or EnvFilter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where a resolved config file came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine(PathBuf),
    Environment(PathBuf),
    UserConfigDir(PathBuf),
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::CommandLine(p)
            | ConfigSource::Environment(p)
            | ConfigSource::UserConfigDir(p) => Some(p),
            ConfigSource::Defaults => None,
        }
    }
}

/// Resolve which config file to read
///
/// # Arguments
/// * `cli_arg` - Path given on the command line, if any
/// * `env_var_name` - Environment variable that may name a path
/// * `file_name` - File name looked up under the per-user config directory
pub fn resolve_config_file(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Result<ConfigSource> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return Ok(ConfigSource::CommandLine(path.to_path_buf()));
    }

    // Priority 2: Environment variable
    if let Ok(value) = std::env::var(env_var_name) {
        if !value.is_empty() {
            let path = PathBuf::from(value);
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file named by {} not found: {}",
                    env_var_name,
                    path.display()
                )));
            }
            return Ok(ConfigSource::Environment(path));
        }
    }

    // Priority 3: Per-user config directory
    if let Some(path) = user_config_path(file_name) {
        if path.exists() {
            return Ok(ConfigSource::UserConfigDir(path));
        }
        debug!("No config at {}, using defaults", path.display());
    }

    // Priority 4: Built-in defaults
    Ok(ConfigSource::Defaults)
}

/// Per-user config file path for the current platform
pub fn user_config_path(file_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(file_name))
}

/// Read and deserialize a TOML file
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let value = toml::from_str(&content)?;
    info!("Loaded configuration from {}", path.display());
    Ok(value)
}

/// Resolve and load a config, or use `T::default()` when no file applies
pub fn load_or_default<T>(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Result<(T, ConfigSource)>
where
    T: DeserializeOwned + Default,
{
    let source = resolve_config_file(cli_arg, env_var_name, file_name)?;
    let value = match source.path() {
        Some(path) => load_toml(path)?,
        None => T::default(),
    };
    Ok((value, source))
}

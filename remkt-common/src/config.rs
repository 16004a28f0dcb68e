//! Configuration file resolution and TOML loading
//!
//! Config file location follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config directory (`<config dir>/remkt/<file>`)
//! 4. Compiled defaults (fallback)
//!
//! A file named explicitly (CLI or environment) must exist and parse. The
//! per-user file is optional: when missing, a warning is logged and the
//! compiled defaults are used.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory name under the platform config dir
pub const CONFIG_DIR_NAME: &str = "remkt";

/// Logging section shared by every remkt config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Where a config file was found (or not)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLocation {
    /// Named on the command line or via environment; must exist
    Explicit(PathBuf),
    /// Per-user default path; may be absent
    UserDefault(PathBuf),
    /// No candidate path at all; use compiled defaults
    CompiledDefaults,
}

impl ConfigLocation {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigLocation::Explicit(p) | ConfigLocation::UserDefault(p) => Some(p),
            ConfigLocation::CompiledDefaults => None,
        }
    }
}

/// Resolve which config file to read
///
/// # Arguments
/// * `cli_arg` - Path given on the command line, if any
/// * `env_var_name` - Environment variable consulted second
/// * `file_name` - File name under the per-user config directory
pub fn resolve_config_location(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> ConfigLocation {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return ConfigLocation::Explicit(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return ConfigLocation::Explicit(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config directory
    if let Some(path) = default_config_path(file_name) {
        return ConfigLocation::UserDefault(path);
    }

    // Priority 4: Compiled defaults
    ConfigLocation::CompiledDefaults
}

/// Per-user config path for `file_name`, if the platform has a config dir
pub fn default_config_path(file_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(file_name))
}

/// Load a TOML config from the resolved location
///
/// Missing per-user files degrade to `T::default()`; missing explicit files
/// and malformed files of either kind are errors.
pub fn load_toml_config<T>(location: &ConfigLocation) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match location {
        ConfigLocation::Explicit(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            read_toml_file(path)
        }
        ConfigLocation::UserDefault(path) => {
            if path.exists() {
                read_toml_file(path)
            } else {
                warn!(
                    "No config file at {}, using compiled defaults",
                    path.display()
                );
                Ok(T::default())
            }
        }
        ConfigLocation::CompiledDefaults => {
            debug!("No config directory available, using compiled defaults");
            Ok(T::default())
        }
    }
}

/// Read and parse one TOML file
pub fn read_toml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Sample {
        name: String,
        logging: LoggingConfig,
    }

    #[test]
    fn test_cli_arg_wins() {
        let location =
            resolve_config_location(Some(Path::new("/tmp/x.toml")), "REMKT_UNUSED_VAR", "a.toml");
        assert_eq!(location, ConfigLocation::Explicit(PathBuf::from("/tmp/x.toml")));
    }

    #[test]
    fn test_compiled_defaults_load() {
        let config: Sample = load_toml_config(&ConfigLocation::CompiledDefaults).unwrap();
        assert_eq!(config, Sample::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let location = ConfigLocation::Explicit(PathBuf::from("/nonexistent/remkt/none.toml"));
        let result: Result<Sample> = load_toml_config(&location);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_user_default_falls_back() {
        let location = ConfigLocation::UserDefault(PathBuf::from("/nonexistent/remkt/none.toml"));
        let config: Sample = load_toml_config(&location).unwrap();
        assert_eq!(config, Sample::default());
    }
}

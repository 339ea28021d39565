//! Configuration file resolution and loading
//!
//! Config file location follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Platform config directory (`<config_dir>/clipq/config.toml`)
//!
//! When no file is found the caller falls back to built-in defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name looked up inside the platform config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory name under the platform config directory
pub const CONFIG_DIR_NAME: &str = "clipq";

/// Resolve which config file to load, if any
///
/// Returns `None` when neither the CLI, the environment, nor the platform
/// config directory points at an existing file.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|p| p.exists())
}

/// Platform-specific default config file path
///
/// - Linux: `~/.config/clipq/config.toml`
/// - macOS: `~/Library/Application Support/clipq/config.toml`
/// - Windows: `%APPDATA%\clipq\config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Parse a TOML config file into `T`
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Load `T` from the resolved config file, or use its defaults
///
/// A missing file means built-in defaults. A file that exists but fails to
/// parse is an error.
pub fn load_or_default<T: DeserializeOwned + Default>(
    cli_arg: Option<&Path>,
    env_var_name: &str,
) -> Result<T> {
    match resolve_config_path(cli_arg, env_var_name) {
        Some(path) if path.exists() => {
            info!("Loading configuration from {}", path.display());
            load_toml(&path)
        }
        Some(path) => {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            Ok(T::default())
        }
        None => {
            info!("No config file found, using built-in defaults");
            Ok(T::default())
        }
    }
}

// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, ScriptdError};

/// Load a configuration file and return the raw, unvalidated `RawConfigFile`.
///
/// `base_dir` is set to the directory holding the file so relative script
/// paths resolve the same way regardless of the working directory.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ScriptdError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mut config: RawConfigFile = toml::from_str(&contents)?;
    config.base_dir = Some(config_root_dir(path));

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// This is the entry point the daemon uses; any error here is fatal to
/// startup.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Default config location: `Scriptd.toml` in the current directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Scriptd.toml")
}

/// Directory containing the config file.
///
/// A bare filename like "Scriptd.toml" (parent = "") falls back to the
/// current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

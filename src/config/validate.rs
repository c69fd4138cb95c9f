// src/config/validate.rs

use std::collections::HashMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, ScriptdError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ScriptdError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let base_dir = match raw.base_dir {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        Ok(ConfigFile::new_unchecked(
            raw.server,
            raw.default,
            raw.script,
            base_dir,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_scripts(cfg)?;
    validate_server(cfg)?;
    validate_script_entries(cfg)?;
    validate_unique_tokens(cfg)?;
    Ok(())
}

fn ensure_has_scripts(cfg: &RawConfigFile) -> Result<()> {
    if cfg.script.is_empty() {
        return Err(ScriptdError::ConfigError(
            "config must contain at least one [[script]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(cfg: &RawConfigFile) -> Result<()> {
    let server = &cfg.server;
    if !server.enabled {
        return Ok(());
    }

    if server.host.trim().is_empty() {
        return Err(ScriptdError::ConfigError(
            "[server].host must not be empty".to_string(),
        ));
    }
    if server.port == 0 {
        return Err(ScriptdError::ConfigError(
            "[server].port must be a fixed port (got 0)".to_string(),
        ));
    }
    if server.max_request_bytes == 0 {
        return Err(ScriptdError::ConfigError(
            "[server].max_request_bytes must be >= 1 (got 0)".to_string(),
        ));
    }
    if server.read_timeout_ms == 0 || server.idle_timeout_ms == 0 {
        return Err(ScriptdError::ConfigError(
            "[server] timeouts must be >= 1 ms".to_string(),
        ));
    }
    Ok(())
}

fn validate_script_entries(cfg: &RawConfigFile) -> Result<()> {
    for (idx, script) in cfg.script.iter().enumerate() {
        if script.name.trim().is_empty() {
            return Err(ScriptdError::ConfigError(format!(
                "script #{} has an empty `name`",
                idx + 1
            )));
        }
        if script.path.trim().is_empty() {
            return Err(ScriptdError::ConfigError(format!(
                "script '{}' has an empty `path`",
                script.name
            )));
        }
        if script.token.trim().is_empty() {
            return Err(ScriptdError::ConfigError(format!(
                "script '{}' has an empty `token`",
                script.name
            )));
        }
        // Incoming tokens are trimmed before lookup, so a padded token could
        // never match.
        if script.token.trim() != script.token {
            return Err(ScriptdError::ConfigError(format!(
                "script '{}' has leading or trailing whitespace in `token`",
                script.name
            )));
        }
    }
    Ok(())
}

fn validate_unique_tokens(cfg: &RawConfigFile) -> Result<()> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for script in cfg.script.iter() {
        if let Some(previous) = seen.insert(script.token.as_str(), script.name.as_str()) {
            return Err(ScriptdError::ConfigError(format!(
                "scripts '{}' and '{}' share the same trigger token",
                previous, script.name
            )));
        }
    }
    Ok(())
}


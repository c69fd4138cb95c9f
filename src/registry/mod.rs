// src/registry/mod.rs

//! Script Registry: the static table of script definitions.
//!
//! Built once from a validated [`ConfigFile`] and read-only afterwards, so it
//! is shared as a plain `Arc<ScriptRegistry>` without any locking.
//!
//! - [`trigger_table`] maps trigger tokens to script ids.

pub mod trigger_table;

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::config::ConfigFile;
use crate::errors::{Result, ScriptdError};
use crate::types::ScriptId;

pub use trigger_table::{TriggerEntry, TriggerTable};

/// Immutable description of one registered script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDefinition {
    pub id: ScriptId,
    pub display_name: String,
    pub executable_path: PathBuf,
    pub trigger_token: Vec<u8>,
    pub default_args: Vec<String>,
    /// Program the script is launched through, if any (e.g. `python3`).
    pub interpreter: Option<String>,
}

impl ScriptDefinition {
    /// Build a definition whose id is derived from `executable_path`.
    pub fn new(
        display_name: impl Into<String>,
        executable_path: impl AsRef<Path>,
        trigger_token: impl Into<Vec<u8>>,
        default_args: Vec<String>,
    ) -> Result<Self> {
        let executable_path = absolute_normalized(executable_path.as_ref())?;
        Ok(Self {
            id: ScriptId::from_path(&executable_path),
            display_name: display_name.into(),
            executable_path,
            trigger_token: trigger_token.into(),
            default_args,
            interpreter: None,
        })
    }

    pub fn with_interpreter(mut self, interpreter: Option<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// File name of the script, as shown in trigger acknowledgments.
    pub fn file_name(&self) -> String {
        self.executable_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// A token as configured, before it is folded into the [`TriggerTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerBinding {
    pub token: Vec<u8>,
    pub id: ScriptId,
    pub args: Vec<String>,
}

/// Read-only lookup of scripts by id.
#[derive(Debug, Clone, Default)]
pub struct ScriptRegistry {
    /// Definitions in configuration order.
    scripts: Vec<ScriptDefinition>,
    index: HashMap<ScriptId, usize>,
    /// Every configured token, including those of duplicate entries.
    bindings: Vec<TriggerBinding>,
}

impl ScriptRegistry {
    /// Build the registry from a validated config.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut definitions = Vec::with_capacity(cfg.script.len());
        for script in cfg.script.iter() {
            let path = script.resolved_path(&cfg.base_dir);
            let def = ScriptDefinition::new(
                script.name.clone(),
                &path,
                script.token.as_bytes().to_vec(),
                script.args.clone(),
            )?
            .with_interpreter(script.effective_interpreter(&cfg.default).map(str::to_string));
            definitions.push(def);
        }
        Ok(Self::from_definitions(definitions))
    }

    /// Build the registry from explicit definitions.
    ///
    /// Definitions that resolve to an id already present are folded into the
    /// first one; their token still triggers that script with their own args.
    pub fn from_definitions(definitions: Vec<ScriptDefinition>) -> Self {
        let mut registry = Self::default();

        for def in definitions {
            registry.bindings.push(TriggerBinding {
                token: def.trigger_token.clone(),
                id: def.id.clone(),
                args: def.default_args.clone(),
            });

            if registry.index.contains_key(&def.id) {
                warn!(
                    script = %def.id,
                    name = %def.display_name,
                    "script configured more than once; keeping the first definition"
                );
                continue;
            }

            debug!(script = %def.id, name = %def.display_name, "registered script");
            registry.index.insert(def.id.clone(), registry.scripts.len());
            registry.scripts.push(def);
        }

        registry
    }

    pub fn resolve(&self, id: &ScriptId) -> Result<&ScriptDefinition> {
        self.get(id)
            .ok_or_else(|| ScriptdError::ScriptNotFound(id.to_string()))
    }

    pub fn get(&self, id: &ScriptId) -> Option<&ScriptDefinition> {
        self.index.get(id).map(|&idx| &self.scripts[idx])
    }

    pub fn contains(&self, id: &ScriptId) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScriptDefinition> {
        self.scripts.iter()
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn bindings(&self) -> &[TriggerBinding] {
        &self.bindings
    }
}

/// Make `path` absolute and drop `.`/`..` components without touching the
/// filesystem (the script does not need to exist yet).
pub fn absolute_normalized(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

// src/registry/trigger_table.rs

use std::collections::HashMap;

use tracing::warn;

use crate::registry::ScriptRegistry;
use crate::types::ScriptId;

/// What a matched token resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEntry {
    pub id: ScriptId,
    /// Arguments to start the script with (the token's own `args`).
    pub args: Vec<String>,
}

/// Token → script mapping, built once at startup and never mutated.
///
/// Tokens are compared byte-for-byte. If two bindings share a token the last
/// one registered wins; config loading already rejects that case, so this
/// only matters for tables built by hand.
#[derive(Debug, Clone, Default)]
pub struct TriggerTable {
    entries: HashMap<Vec<u8>, TriggerEntry>,
}

impl TriggerTable {
    pub fn from_registry(registry: &ScriptRegistry) -> Self {
        let mut entries = HashMap::new();

        for binding in registry.bindings() {
            let entry = TriggerEntry {
                id: binding.id.clone(),
                args: binding.args.clone(),
            };
            if let Some(previous) = entries.insert(binding.token.clone(), entry) {
                warn!(
                    token = %String::from_utf8_lossy(&binding.token),
                    replaced = %previous.id,
                    script = %binding.id,
                    "trigger token registered twice; last registration wins"
                );
            }
        }

        Self { entries }
    }

    pub fn lookup(&self, token: &[u8]) -> Option<&TriggerEntry> {
        self.entries.get(token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

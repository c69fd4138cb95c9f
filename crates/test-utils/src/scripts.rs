#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use scriptd::registry::{ScriptDefinition, ScriptRegistry};

/// A temp directory of `sh` scripts.
///
/// Scripts are launched through `sh` rather than executed directly so tests
/// never exec a file that was written a moment ago.
pub struct ScriptDir {
    dir: TempDir,
}

impl ScriptDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Write `body` to `<dir>/<file_name>` and return its path.
    pub fn write(&self, file_name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(file_name);
        fs::write(&path, body).expect("write script");
        path
    }

    /// Definition for a script in this directory, launched through `sh`.
    pub fn definition(&self, name: &str, file_name: &str, token: &str) -> ScriptDefinition {
        ScriptDefinition::new(name, self.dir.path().join(file_name), token, vec![])
            .expect("absolute script path")
            .with_interpreter(Some("sh".to_string()))
    }
}

impl Default for ScriptDir {
    fn default() -> Self {
        Self::new()
    }
}

pub fn registry_of(definitions: Vec<ScriptDefinition>) -> Arc<ScriptRegistry> {
    Arc::new(ScriptRegistry::from_definitions(definitions))
}

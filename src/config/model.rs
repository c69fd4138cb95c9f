// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration exactly as deserialized from TOML, before validation.
///
/// ```toml
/// [server]
/// host = "127.0.0.1"
/// port = 54321
///
/// [default]
/// interpreter = "python3"
///
/// [[script]]
/// name = "Test script"
/// path = "test.py"
/// token = "RUN_SCRIPT_TEST"
/// ```
///
/// Turn it into a [`ConfigFile`] with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Trigger server settings from `[server]`.
    #[serde(default)]
    pub server: ServerSection,

    /// Defaults shared by all scripts from `[default]`.
    #[serde(default)]
    pub default: DefaultSection,

    /// All `[[script]]` entries, in file order.
    #[serde(default)]
    pub script: Vec<ScriptConfig>,

    /// Directory relative script paths are resolved against.
    ///
    /// Not part of the TOML; the loader fills it in from the config path.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>`, so holding one means the
/// invariants checked in `validate.rs` hold.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub server: ServerSection,
    pub default: DefaultSection,
    pub script: Vec<ScriptConfig>,
    pub base_dir: PathBuf,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        server: ServerSection,
        default: DefaultSection,
        script: Vec<ScriptConfig>,
        base_dir: PathBuf,
    ) -> Self {
        Self {
            server,
            default,
            script,
            base_dir,
        }
    }

    /// `host:port` string the trigger server binds to.
    pub fn server_addr(&self) -> String {
        self.server.addr()
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// Set to `false` to run without the network trigger.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on the bytes read from one connection.
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,

    /// Overall time allowed for a client to deliver its token.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Silence tolerated after the first bytes before the token is
    /// considered complete (for clients that never half-close).
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Reply with the real start outcome instead of always "triggered".
    #[serde(default)]
    pub detailed_replies: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    54321
}

fn default_max_request_bytes() -> usize {
    1024
}

fn default_read_timeout_ms() -> u64 {
    5000
}

fn default_idle_timeout_ms() -> u64 {
    250
}

impl ServerSection {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            host: default_host(),
            port: default_port(),
            max_request_bytes: default_max_request_bytes(),
            read_timeout_ms: default_read_timeout_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            detailed_replies: false,
        }
    }
}

/// `[default]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultSection {
    /// Program used to launch scripts that do not name their own.
    ///
    /// If unset, the script path itself is executed.
    #[serde(default)]
    pub interpreter: Option<String>,
}

/// One `[[script]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptConfig {
    /// Display name.
    pub name: String,

    /// Path to the script; relative paths are taken from the config
    /// file's directory.
    pub path: String,

    /// Secret message that triggers this script over TCP.
    pub token: String,

    /// Arguments appended after the script id.
    #[serde(default)]
    pub args: Vec<String>,

    /// Per-script override of `[default].interpreter`.
    #[serde(default)]
    pub interpreter: Option<String>,
}

impl ScriptConfig {
    pub fn effective_interpreter<'a>(&'a self, default: &'a DefaultSection) -> Option<&'a str> {
        self.interpreter
            .as_deref()
            .or(default.interpreter.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    /// Path as configured, joined onto `base_dir` when relative.
    pub fn resolved_path(&self, base_dir: &Path) -> PathBuf {
        let p = Path::new(&self.path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            base_dir.join(p)
        }
    }
}

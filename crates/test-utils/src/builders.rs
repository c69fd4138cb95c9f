#![allow(dead_code)]

use std::path::Path;

use scriptd::config::{ConfigFile, DefaultSection, RawConfigFile, ScriptConfig, ServerSection};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                server: ServerSection::default(),
                default: DefaultSection::default(),
                script: Vec::new(),
                base_dir: None,
            },
        }
    }

    pub fn with_script(mut self, script: ScriptConfig) -> Self {
        self.config.script.push(script);
        self
    }

    pub fn with_base_dir(mut self, dir: &Path) -> Self {
        self.config.base_dir = Some(dir.to_path_buf());
        self
    }

    pub fn with_default_interpreter(mut self, interpreter: &str) -> Self {
        self.config.default.interpreter = Some(interpreter.to_string());
        self
    }

    pub fn server_disabled(mut self) -> Self {
        self.config.server.enabled = false;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn detailed_replies(mut self, val: bool) -> Self {
        self.config.server.detailed_replies = val;
        self
    }

    /// The unvalidated config, for tests that expect validation to fail.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ScriptConfig`.
pub struct ScriptConfigBuilder {
    script: ScriptConfig,
}

impl ScriptConfigBuilder {
    pub fn new(name: &str, path: &str, token: &str) -> Self {
        Self {
            script: ScriptConfig {
                name: name.to_string(),
                path: path.to_string(),
                token: token.to_string(),
                args: vec![],
                interpreter: None,
            },
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.script.args.push(arg.to_string());
        self
    }

    pub fn interpreter(mut self, interpreter: &str) -> Self {
        self.script.interpreter = Some(interpreter.to_string());
        self
    }

    pub fn build(self) -> ScriptConfig {
        self.script
    }
}

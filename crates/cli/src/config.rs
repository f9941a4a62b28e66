//! Layered configuration: defaults, then a TOML file, then environment
//! variables. Command-line flags are applied last by the caller.

use std::path::{Path, PathBuf};

use archcheck_solver::EngineConfig;
use serde::Deserialize;

/// Environment variable naming the config file when `--config` is absent.
pub(crate) const CONFIG_ENV: &str = "ARCHCHECK_CONFIG";
const TIMEOUT_ENV: &str = "ARCHCHECK_ENGINE_TIMEOUT";
const WORK_DIR_ENV: &str = "ARCHCHECK_WORK_DIR";
const PORT_ENV: &str = "ARCHCHECK_PORT";

/// Default listen port for `archcheck serve`; the diagram editor expects it.
pub(crate) const DEFAULT_PORT: u16 = 3001;

/// Maximum request body size: 10 MB.
const DEFAULT_MAX_BODY: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ArchcheckConfig {
    pub(crate) engine: EngineConfig,
    pub(crate) server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ServerConfig {
    pub(crate) port: u16,
    pub(crate) max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: DEFAULT_PORT,
            max_body_bytes: DEFAULT_MAX_BODY,
        }
    }
}

impl ArchcheckConfig {
    /// Load from `path`, or from `$ARCHCHECK_CONFIG`, or defaults; then
    /// apply environment overrides.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, String> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(from_env) {
            Some(p) => Self::from_file(&p)?,
            None => ArchcheckConfig::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config
            .engine
            .validate()
            .map_err(|e| format!("invalid engine config: {}", e))?;
        Ok(config)
    }

    pub(crate) fn from_file(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("error reading config '{}': {}", path.display(), e))?;
        toml::from_str(&text)
            .map_err(|e| format!("error parsing config '{}': {}", path.display(), e))
    }

    /// Apply `ARCHCHECK_*` overrides looked up through `lookup`.
    pub(crate) fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), String> {
        if let Some(v) = lookup(TIMEOUT_ENV) {
            self.engine.timeout_secs = v
                .trim()
                .parse()
                .map_err(|_| format!("{} must be a number of seconds, got '{}'", TIMEOUT_ENV, v))?;
        }
        if let Some(v) = lookup(WORK_DIR_ENV).filter(|v| !v.is_empty()) {
            self.engine.work_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup(PORT_ENV) {
            self.server.port = v
                .trim()
                .parse()
                .map_err(|_| format!("{} must be a port number, got '{}'", PORT_ENV, v))?;
        }
        Ok(())
    }
}

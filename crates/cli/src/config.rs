//! `livecode.toml` configuration.
//!
//! Precedence, lowest to highest: built-in defaults, the config file,
//! `LIVECODE_*` environment variables, command-line flags. Every field is
//! optional in the file.
//!
//! ```toml
//! [generator]
//! url = "http://127.0.0.1:5000"
//! timeout_secs = 120
//!
//! [sandbox]
//! max_steps = 1000000
//! max_call_depth = 200
//!
//! [serve]
//! port = 8080
//! debounce_ms = 0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use livecode_eval::SandboxLimits;
use serde::{Deserialize, Serialize};

/// Looked up in the working directory when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "livecode.toml";

pub(crate) const ENV_GENERATOR_URL: &str = "LIVECODE_GENERATOR_URL";
pub(crate) const ENV_API_KEY: &str = "LIVECODE_API_KEY";
pub(crate) const ENV_PORT: &str = "LIVECODE_PORT";

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("could not read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse '{path}': {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    pub(crate) generator: GeneratorConfig,
    pub(crate) sandbox: SandboxLimits,
    pub(crate) serve: ServeConfig,
}

/// `[generator]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GeneratorConfig {
    pub(crate) url: String,
    pub(crate) timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            url: "http://127.0.0.1:5000".to_string(),
            timeout_secs: 120,
        }
    }
}

impl GeneratorConfig {
    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// `[serve]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ServeConfig {
    pub(crate) port: u16,
    /// Delay before a staged edit is evaluated; 0 evaluates every edit at once.
    pub(crate) debounce_ms: u64,
    /// When set, every route except `/health` requires this key.
    pub(crate) api_key: Option<String>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        ServeConfig {
            port: 8080,
            debounce_ms: 0,
            api_key: None,
        }
    }
}

impl Config {
    /// Load `explicit`, or `livecode.toml` from the working directory when it
    /// exists, then apply the process environment.
    pub(crate) fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match explicit {
            Some(path) => Config::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Config::from_file(default)?
                } else {
                    Config::default()
                }
            }
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub(crate) fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Config::from_toml(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    pub(crate) fn from_toml(content: &str) -> Result<Config, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Override fields from `LIVECODE_*` variables. Empty values are ignored.
    pub(crate) fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = get(ENV_GENERATOR_URL) {
            self.generator.url = url;
        }
        if let Some(key) = get(ENV_API_KEY) {
            self.serve.api_key = Some(key);
        }
        if let Some(port) = get(ENV_PORT) {
            self.serve.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_PORT,
                value: port,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            "[sandbox]\nmax_steps = 500\n\n[serve]\ndebounce_ms = 250\n",
        )
        .unwrap();
        assert_eq!(config.sandbox.max_steps, 500);
        assert_eq!(config.sandbox.max_call_depth, SandboxLimits::default().max_call_depth);
        assert_eq!(config.serve.debounce_ms, 250);
        assert_eq!(config.serve.port, 8080);
        assert_eq!(config.generator, GeneratorConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml("[generator]\nendpoint = \"x\"\n").unwrap_err();
        assert!(err.contains("endpoint"));
    }

    #[test]
    fn environment_overrides_file() {
        let env: HashMap<&str, &str> = [
            (ENV_GENERATOR_URL, "http://gen.internal:9000"),
            (ENV_PORT, "9191"),
            (ENV_API_KEY, ""),
        ]
        .into_iter()
        .collect();
        let mut config = Config::from_toml("[serve]\nport = 1000\n").unwrap();
        config
            .apply_env(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.generator.url, "http://gen.internal:9000");
        assert_eq!(config.serve.port, 9191);
        assert_eq!(config.serve.api_key, None);
    }

    #[test]
    fn bad_port_in_environment() {
        let mut config = Config::default();
        let err = config
            .apply_env(|name| (name == ENV_PORT).then(|| "eighty".to_string()))
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid value for LIVECODE_PORT: 'eighty'");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Config::from_file(Path::new("/no/such/livecode.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}

//! SandLoop configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::agent::AgentConfig;

/// Main SandLoop configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Planner backend configuration
    pub planner: PlannerConfig,

    /// Sandbox and tool limits
    pub sandbox: SandboxConfig,

    /// Agent loop settings
    pub agent: AgentConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the planner API key is available. Call this early in
    /// startup to fail fast with a clear error message.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.planner.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "Planner API key not found. Set the {} environment variable.",
                self.planner.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .sandloop.yml
        let local_config = PathBuf::from(".sandloop.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/sandloop/sandloop.yml
        if let Some(user_config) = Self::user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log level, before logging is set up
    ///
    /// Errors are swallowed; the full load reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".sandloop.yml")];
                paths.extend(Self::user_config_path());
                paths
            }
        };

        candidates
            .iter()
            .find(|p| p.exists())
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sandloop").join("sandloop.yml"))
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Planner backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Provider name (currently only "anthropic" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl PlannerConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .map_err(|_| eyre::eyre!("Environment variable {} is not set", self.api_key_env))
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 8192,
            timeout_ms: 300_000,
        }
    }
}

/// Sandbox and tool limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Characters returned by a file read before truncation
    #[serde(rename = "max-file-chars")]
    pub max_file_chars: usize,

    /// Characters kept from each script output stream
    #[serde(rename = "max-output-chars")]
    pub max_output_chars: usize,

    /// Wall-clock limit for a script, in milliseconds
    #[serde(rename = "script-timeout-ms")]
    pub script_timeout_ms: u64,

    /// Extension a file must have to be run (without the dot)
    #[serde(rename = "script-extension")]
    pub script_extension: String,

    /// Program used to run scripts
    pub interpreter: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_file_chars: 10_000,
            max_output_chars: 10_000,
            script_timeout_ms: 30_000,
            script_extension: "py".to_string(),
            interpreter: "python3".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.planner.provider, "anthropic");
        assert_eq!(config.sandbox.max_file_chars, 10_000);
        assert_eq!(config.sandbox.script_timeout_ms, 30_000);
        assert_eq!(config.sandbox.script_extension, "py");
        assert_eq!(config.agent.max_iterations, 20);
        assert!(config.agent.bootstrap.is_empty());
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_deserialize_partial() {
        let yaml = r#"
sandbox:
  max-file-chars: 500
  interpreter: python3.12
agent:
  max-iterations: 5
log-level: debug
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.sandbox.max_file_chars, 500);
        assert_eq!(config.sandbox.interpreter, "python3.12");
        // Defaults should apply
        assert_eq!(config.sandbox.script_timeout_ms, 30_000);
        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(config.planner.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_deserialize_bootstrap() {
        let yaml = r#"
agent:
  bootstrap:
    - tool: get_files_info
      args:
        directory: "."
    - tool: get_file_content
      args:
        file_path: main.py
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.agent.bootstrap.len(), 2);
        assert_eq!(config.agent.bootstrap[0].tool, "get_files_info");
        assert_eq!(config.agent.bootstrap[1].args["file_path"], "main.py");
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sandloop.yml");
        fs::write(&path, "log-level: warn\nplanner:\n  model: test-model\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.planner.model, "test-model");
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("warn"));
    }

    #[test]
    fn test_load_explicit_path_missing() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("missing.yml");

        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load_log_level(Some(&path)).is_none());
    }

    #[test]
    fn test_validate_missing_key() {
        let mut config = Config::default();
        config.planner.api_key_env = "SANDLOOP_TEST_KEY_THAT_IS_NEVER_SET".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SANDLOOP_TEST_KEY_THAT_IS_NEVER_SET"));
        assert!(config.planner.get_api_key().is_err());
    }
}

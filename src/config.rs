use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API key for the completion service
    pub api_key: Option<String>,

    /// Environment variable consulted when `api_key` is not set
    pub api_key_env: String,

    /// Model used for every completion
    pub model: String,

    /// Base URL of the Generative Language API
    pub base_url: String,

    /// Per-request timeout enforced by the HTTP client
    pub request_timeout_secs: u64,

    /// Optional generation parameters
    pub generation: GenerationConfig,

    /// Log output
    pub logging: LoggingConfig,

    /// UI preferences
    pub ui: UiConfig,

    /// Application home directory (not serialized)
    #[serde(skip)]
    pub app_home: PathBuf,
}

/// Generation parameters forwarded to the model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter, overridden by `RUST_LOG`
    pub level: String,
    /// Log directory; defaults to `<app_home>/logs`
    pub dir: Option<PathBuf>,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Redraw interval in milliseconds
    pub tick_rate_ms: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { tick_rate_ms: 100 }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        Config {
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 60,
            generation: GenerationConfig::default(),
            logging: LoggingConfig::default(),
            ui: UiConfig::default(),
            app_home: home.join(".codeassist"),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from `~/.codeassist/config.toml`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let app_home = match path {
            Some(path) => path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
            None => dirs::home_dir()
                .context("Could not find home directory")?
                .join(".codeassist"),
        };
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| app_home.join("config.toml"));

        fs::create_dir_all(&app_home).context("Failed to create application directory")?;

        let mut config = if config_path.exists() {
            Self::from_file(&config_path)?
        } else {
            Config::default()
        };

        config.app_home = app_home;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Get API key from config or environment
    pub fn api_key(&self) -> Option<String> {
        self.resolve_api_key(|name| std::env::var(name).ok())
    }

    /// Blank values on either side count as unset
    fn resolve_api_key(&self, lookup_env: impl FnOnce(&str) -> Option<String>) -> Option<String> {
        let non_blank = |key: &String| !key.trim().is_empty();

        self.api_key
            .clone()
            .filter(non_blank)
            .or_else(|| lookup_env(&self.api_key_env).filter(non_blank))
    }

    /// Check if API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// Directory the rolling log files are written to
    pub fn log_dir(&self) -> PathBuf {
        self.logging
            .dir
            .clone()
            .unwrap_or_else(|| self.app_home.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.app_home, dir.path());
        assert_eq!(config.log_dir(), dir.path().join("logs"));
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "model = \"gemini-2.0-flash\"").unwrap();
        writeln!(file, "[generation]").unwrap();
        writeln!(file, "temperature = 0.2").unwrap();
        writeln!(file, "[logging]").unwrap();
        writeln!(file, "level = \"debug\"").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.generation.temperature, Some(0.2));
        assert_eq!(config.generation.max_output_tokens, None);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.ui.tick_rate_ms, 100);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "model = [").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_api_key_prefers_config_value() {
        let config = Config {
            api_key: Some("from-config".to_string()),
            api_key_env: "CODEASSIST_TEST_UNSET_KEY".to_string(),
            ..Config::default()
        };
        assert_eq!(config.api_key().as_deref(), Some("from-config"));
        assert!(config.has_api_key());
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let config = Config {
            api_key: Some("   ".to_string()),
            api_key_env: "CODEASSIST_TEST_UNSET_KEY".to_string(),
            ..Config::default()
        };
        assert_eq!(config.api_key(), None);
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_blank_config_key_falls_back_to_env() {
        let config = Config {
            api_key: Some("   ".to_string()),
            api_key_env: "CODEASSIST_KEY".to_string(),
            ..Config::default()
        };
        let lookup = |name: &str| (name == "CODEASSIST_KEY").then(|| "env-key".to_string());

        assert_eq!(config.resolve_api_key(lookup).as_deref(), Some("env-key"));
        assert_eq!(config.resolve_api_key(|_| Some(" \t".to_string())), None);
    }
}

use std::path::PathBuf;

use eyre::{Result, bail};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::chunk::MAX_CHUNK_SIZE;
use crate::summarize::{DEFAULT_API_BASE, DEFAULT_MODEL};

pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";
pub const DEFAULT_LANGUAGE: &str = "zh-TW";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub language: Option<String>,
    pub model: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub api_base: Option<String>,
    pub max_chunk_size: Option<usize>,
    /// Keep retrying when captions are reported disabled or unavailable
    pub retry_permanent_failures: Option<bool>,
}

impl Config {
    /// Load config from ~/.config/ytsum/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytsum")
        .join("config.toml")
}

/// Effective settings after CLI flags, config file and defaults are merged
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub language: String,
    pub model: String,
    pub output_dir: PathBuf,
    pub api_base: String,
    pub max_chunk_size: usize,
    pub retry_permanent_failures: bool,
}

impl Settings {
    pub fn resolve(cli: &crate::cli::Cli, config: Config) -> Self {
        Self {
            language: cli
                .language
                .clone()
                .or(config.language)
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            model: cli
                .model
                .clone()
                .or(config.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            output_dir: cli
                .output_dir
                .clone()
                .or(config.output_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            api_base: config.api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            max_chunk_size: config.max_chunk_size.unwrap_or(MAX_CHUNK_SIZE),
            retry_permanent_failures: config.retry_permanent_failures.unwrap_or(false),
        }
    }
}

/// Read the Gemini API key from the environment
pub fn api_key() -> Result<String> {
    require_api_key(std::env::var(API_KEY_ENV).ok())
}

fn require_api_key(value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => bail!("請設定環境變數 {API_KEY_ENV}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
language = "en"
model = "gemini-2.5-flash"
output_dir = "/tmp/summaries"
api_base = "https://proxy.example.com"
max_chunk_size = 12000
retry_permanent_failures = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.language.as_deref(), Some("en"));
        assert_eq!(config.model.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/summaries")));
        assert_eq!(config.api_base.as_deref(), Some("https://proxy.example.com"));
        assert_eq!(config.max_chunk_size, Some(12000));
        assert_eq!(config.retry_permanent_failures, Some(true));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.language.is_none());
        assert!(config.model.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(r#"language = "ja""#).unwrap();
        assert_eq!(config.language.as_deref(), Some("ja"));
        assert!(config.output_dir.is_none());
    }

    #[test]
    fn test_settings_defaults() {
        let cli = Cli::parse_from(["ytsum", "dQw4w9WgXcQ"]);
        let settings = Settings::resolve(&cli, Config::default());
        assert_eq!(settings.language, "zh-TW");
        assert_eq!(settings.model, "gemini-2.0-flash");
        assert_eq!(settings.output_dir, PathBuf::from("."));
        assert_eq!(settings.api_base, DEFAULT_API_BASE);
        assert_eq!(settings.max_chunk_size, 30_000);
        assert!(!settings.retry_permanent_failures);
    }

    #[test]
    fn test_settings_cli_overrides_config() {
        let cli = Cli::parse_from(["ytsum", "dQw4w9WgXcQ", "--language", "en"]);
        let config = Config {
            language: Some("ja".to_string()),
            model: Some("gemini-2.5-pro".to_string()),
            retry_permanent_failures: Some(true),
            ..Config::default()
        };
        let settings = Settings::resolve(&cli, config);
        assert_eq!(settings.language, "en");
        assert_eq!(settings.model, "gemini-2.5-pro");
        assert!(settings.retry_permanent_failures);
    }

    #[test]
    fn test_require_api_key() {
        assert!(require_api_key(None).is_err());
        assert!(require_api_key(Some("  ".to_string())).is_err());
        assert_eq!(require_api_key(Some("abc".to_string())).unwrap(), "abc");
        let msg = require_api_key(None).unwrap_err().to_string();
        assert!(msg.contains("GOOGLE_API_KEY"));
    }
}

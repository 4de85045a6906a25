//! CellTutor configuration
//!
//! Owned by the process entry point and handed to constructors; nothing in
//! the library reads global state except [`TutorConfig::apply_env`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TutorError};

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorConfig {
    /// Registry and artifact locations
    pub storage: StorageSettings,

    /// Text generator selection
    pub generator: GeneratorConfig,

    /// Logging settings for the driver
    pub logging: LoggingSettings,
}

impl TutorConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the database path
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage.db_path = path.into();
        self
    }

    /// Set the artifacts directory
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage.artifacts_dir = dir.into();
        self
    }

    /// Set the text generator provider
    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.generator.provider = provider;
        self
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| TutorError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from `path` when given, otherwise defaults; then apply env overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env()
    }

    /// Override settings from `CELLTUTOR_*` and `GEMINI_API_KEY`
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(db) = std::env::var("CELLTUTOR_DB") {
            self.storage.db_path = db.into();
        }
        if let Ok(dir) = std::env::var("CELLTUTOR_ARTIFACTS") {
            self.storage.artifacts_dir = dir.into();
        }
        if let Ok(provider) = std::env::var("CELLTUTOR_PROVIDER") {
            self.generator.provider = provider.parse()?;
        }
        if self.generator.api_key.is_none() {
            self.generator.api_key = std::env::var("GEMINI_API_KEY").ok();
        }
        Ok(self)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TutorError::Config(e.to_string()))
    }
}

/// Storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Directory receiving rendered diagrams and animations
    pub artifacts_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("celltutor.db"),
            artifacts_dir: PathBuf::from("agents"),
        }
    }
}

/// Available text generator providers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Mock,
    Gemini,
}

impl std::str::FromStr for ProviderKind {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(TutorError::Config(format!("Unknown provider: {}", other))),
        }
    }
}

/// Text generator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub provider: ProviderKind,

    /// Model name for hosted providers
    pub model: String,

    /// API key; `GEMINI_API_KEY` is used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// HTTP timeout for hosted providers
    pub timeout_secs: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Mock,
            model: "gemini-pro".to_string(),
            api_key: None,
            timeout_secs: 60,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    pub filter: String,

    /// Write logs to this file instead of stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TutorConfig::default();
        assert_eq!(config.storage.db_path, PathBuf::from("celltutor.db"));
        assert_eq!(config.storage.artifacts_dir, PathBuf::from("agents"));
        assert_eq!(config.generator.provider, ProviderKind::Mock);
        assert_eq!(config.generator.timeout_secs, 60);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: TutorConfig = toml::from_str(
            r#"
            [storage]
            db_path = "/tmp/tutor.db"

            [generator]
            provider = "gemini"
            model = "gemini-1.5-flash"
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.db_path, PathBuf::from("/tmp/tutor.db"));
        assert_eq!(config.storage.artifacts_dir, PathBuf::from("agents"));
        assert_eq!(config.generator.provider, ProviderKind::Gemini);
        assert_eq!(config.generator.model, "gemini-1.5-flash");
        assert_eq!(config.generator.timeout_secs, 60);
    }

    #[test]
    fn test_from_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("celltutor.toml");
        let config = TutorConfig::new()
            .with_db_path(dir.path().join("x.db"))
            .with_provider(ProviderKind::Gemini);
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();

        let loaded = TutorConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[storage\ndb_path = ").unwrap();
        let err = TutorConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, TutorError::Config(_)));
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("Mock".parse::<ProviderKind>().unwrap(), ProviderKind::Mock);
        assert_eq!("gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert!("openai".parse::<ProviderKind>().is_err());
    }
}

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SubbatchError};
use crate::language::Language;

fn default_endpoint() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_model() -> String {
    "qwen3:30b-a3b".to_string()
}

fn default_timeout_secs() -> u64 {
    180
}

fn default_workers() -> usize {
    3
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub translate: TranslateConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Ollama endpoint URL (server root or the full generate URL)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// LLM model to use for translation
    #[serde(default = "default_model")]
    pub model: String,
    /// Timeout for one backend request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Language of the subtitle files to translate from
    #[serde(default)]
    pub source: Language,
    /// Number of folders processed in parallel
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Translate even when the target file already exists
    #[serde(default)]
    pub force: bool,
    /// Stop early for folders whose target file already exists
    #[serde(default = "default_true")]
    pub skip_if_target_exists: bool,
    /// Show progress bars on the terminal
    #[serde(default = "default_true")]
    pub show_progress: bool,
    /// Ask the backend for the model before starting
    #[serde(default = "default_true")]
    pub check_backend: bool,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            source: Language::default(),
            workers: default_workers(),
            force: false,
            skip_if_target_exists: true,
            show_progress: true,
            check_backend: true,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubbatchError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| SubbatchError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubbatchError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubbatchError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch.workers == 0 {
            return Err(SubbatchError::Config("workers must be at least 1".to_string()));
        }
        if self.translate.timeout_secs == 0 {
            return Err(SubbatchError::Config("timeout_secs must be at least 1".to_string()));
        }
        if self.batch.source.code.trim().is_empty() {
            return Err(SubbatchError::Config("source language code must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.translate.endpoint, "http://127.0.0.1:11434");
        assert_eq!(config.translate.timeout_secs, 180);
        assert_eq!(config.batch.workers, 3);
        assert_eq!(config.batch.source, Language::new("English", "en"));
        assert!(config.batch.skip_if_target_exists);
        assert!(!config.batch.force);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str("[batch]\nworkers = 8\n").unwrap();
        assert_eq!(config.batch.workers, 8);
        assert_eq!(config.translate.model, "qwen3:30b-a3b");
        assert!(config.batch.skip_if_target_exists);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subbatch.toml");

        let mut config = Config::default();
        config.translate.model = "llama3.2:3b".to_string();
        config.batch.source = Language::new("German", "de");
        config.batch.force = true;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.translate.model, "llama3.2:3b");
        assert_eq!(loaded.batch.source.code, "de");
        assert!(loaded.batch.force);
    }

    #[test]
    fn test_rejects_zero_workers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subbatch.toml");
        std::fs::write(&path, "[batch]\nworkers = 0\n").unwrap();

        assert!(matches!(Config::from_file(&path), Err(SubbatchError::Config(_))));
    }
}

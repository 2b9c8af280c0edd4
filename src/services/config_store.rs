// Configuration Storage Service
// Handles config file read/write, version backup, and heuristic rule tables

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::detection::heuristic::{
    default_rules, HeuristicScorer, RuleError, RuleSpec, ScoringThresholds,
};
use super::providers::OPENAI_DEFAULT_MODEL;
use crate::models::DEFAULT_MAX_REVIEWS;

const CONFIG_FILE_NAME: &str = "config.json";
const BACKUPS_KEPT: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid heuristic rule table: {0}")]
    Rules(#[from] RuleError),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError + '_ {
    move |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heuristics: Option<HeuristicsConfig>,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            provider: ProviderConfig::default(),
            analysis: AnalysisConfig::default(),
            heuristics: None,
            api_keys: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Compile the configured rule table, or the built-in one when none is set.
    pub fn build_scorer(&self) -> Result<HeuristicScorer, ConfigError> {
        match &self.heuristics {
            Some(h) => Ok(HeuristicScorer::from_specs(h.rules.clone(), h.thresholds.clone())?),
            None => Ok(HeuristicScorer::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    #[serde(default = "default_max_reviews")]
    pub max_reviews: usize,
    /// Overall deadline for the classification call; `None` relies on the HTTP timeout.
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: Option<u64>,
    /// Accept a summary-only service answer instead of falling back.
    #[serde(default = "default_true")]
    pub accept_degraded: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_reviews: default_max_reviews(),
            deadline_secs: default_deadline_secs(),
            accept_degraded: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeuristicsConfig {
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub thresholds: ScoringThresholds,
}

fn default_model() -> String { OPENAI_DEFAULT_MODEL.to_string() }
fn default_temperature() -> f64 { 0.3 }
fn default_max_tokens() -> u32 { 2000 }
fn default_timeout_secs() -> u64 { 80 }
fn default_max_reviews() -> usize { DEFAULT_MAX_REVIEWS }
fn default_deadline_secs() -> Option<u64> { Some(120) }
fn default_true() -> bool { true }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join(CONFIG_FILE_NAME);
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("revcheck"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir).map_err(io_err(&self.config_dir))
    }

    /// Load configuration from file; a missing file yields defaults.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file).map_err(io_err(&self.config_file))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_file, content).map_err(io_err(&self.config_file))
    }

    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir).map_err(io_err(&backup_dir))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file).map_err(io_err(&backup_file))?;

        self.cleanup_old_backups(&backup_dir, BACKUPS_KEPT)
    }

    /// Remove old backups, keeping only the most recent `keep`
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), ConfigError> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(io_err(backup_dir))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Oldest first
        entries.sort_by_key(|e| {
            e.metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        });

        for entry in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }

    pub fn get_api_key(&self, provider: &str) -> Result<Option<String>, ConfigError> {
        let config = self.load()?;
        Ok(config
            .api_keys
            .get(provider)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty()))
    }

    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        config.api_keys.insert(provider.to_string(), key.trim().to_string());
        self.save(&config)
    }
}

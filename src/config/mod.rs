//! Configuration management for content-completer
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Hosted inference endpoint configuration
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Content database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Completion behaviour
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Inference transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of the Gradio space
    #[serde(default = "default_inference_base_url")]
    pub base_url: String,

    /// Read timeout in seconds for one prompt exchange
    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,

    /// User agent sent with every request
    #[serde(default = "default_inference_user_agent")]
    pub user_agent: String,

    /// Gradio fn_index of the predict call
    #[serde(default = "default_predict_fn_index")]
    pub predict_fn_index: u32,

    /// Gradio fn_index of the queue join call
    #[serde(default = "default_join_fn_index")]
    pub join_fn_index: u32,

    /// Gradio trigger_id sent with both calls
    #[serde(default = "default_trigger_id")]
    pub trigger_id: u32,

    /// Fixed session hash. When unset every run mints a fresh one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_hash: Option<String>,
}

/// Database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite content database (defaults to `content.db` next to the config)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Completion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Maximum characters of a freshly generated title
    #[serde(default = "default_max_title_length")]
    pub max_title_length: usize,

    /// Title assigned when neither title nor description exist
    #[serde(default = "default_default_title")]
    pub default_title: String,

    /// Title values that count as missing
    #[serde(default = "default_placeholder_titles")]
    pub placeholder_titles: Vec<String>,

    /// Minimum similarity (0.0 - 1.0) for a fuzzy category match
    #[serde(default = "default_category_match_cutoff")]
    pub category_match_cutoff: f64,

    /// Maximum number of fuzzy category candidates
    #[serde(default = "default_max_close_matches")]
    pub max_close_matches: usize,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for content-completer data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_inference_base_url(),
            timeout_secs: default_inference_timeout(),
            user_agent: default_inference_user_agent(),
            predict_fn_index: default_predict_fn_index(),
            join_fn_index: default_join_fn_index(),
            trigger_id: default_trigger_id(),
            session_hash: None,
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            max_title_length: default_max_title_length(),
            default_title: default_default_title(),
            placeholder_titles: default_placeholder_titles(),
            category_match_cutoff: default_category_match_cutoff(),
            max_close_matches: default_max_close_matches(),
        }
    }
}

impl Config {
    /// Get the default base directory (~/.content-completer)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".content-completer")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration rooted at `base_dir`
    pub fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: self.resolve_db_file(&base),
            base_dir: base,
        };
    }

    fn resolve_db_file(&self, base: &Path) -> PathBuf {
        match &self.database.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => base.join(path),
            None => base.join("content.db"),
        }
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: config.resolve_db_file(&base),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            return Self::load(&config.paths.config_file);
        }

        debug!("No config file found, using defaults");
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.inference.base_url).map_err(|e| {
            Error::Config(format!(
                "inference.base_url '{}' is not a valid URL: {}",
                self.inference.base_url, e
            ))
        })?;

        if self.inference.timeout_secs == 0 {
            return Err(Error::Config(
                "inference.timeout_secs must be positive".to_string(),
            ));
        }

        if let Some(hash) = &self.inference.session_hash {
            if hash.trim().is_empty() {
                return Err(Error::Config(
                    "inference.session_hash must not be blank when set".to_string(),
                ));
            }
        }

        if self.completion.max_title_length == 0 {
            return Err(Error::Config(
                "completion.max_title_length must be positive".to_string(),
            ));
        }

        if self.completion.default_title.trim().is_empty() {
            return Err(Error::Config(
                "completion.default_title must not be blank".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.completion.category_match_cutoff) {
            return Err(Error::Config(
                "completion.category_match_cutoff must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.completion.max_close_matches == 0 {
            return Err(Error::Config(
                "completion.max_close_matches must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

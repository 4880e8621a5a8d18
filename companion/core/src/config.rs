//! TOML Configuration File Support
//!
//! Configuration loading for the companion core, from a TOML file at
//! `~/.config/chatpet/companion.toml` plus environment overrides.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. Environment variables
//! 2. TOML configuration file
//! 3. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [model]
//! path = "/data/local/tmp/llm/gemma3-1b-it-int4.task"
//! max_top_k = 64
//!
//! [history]
//! max_turns = 10
//!
//! [chat]
//! empty_input_reply = "Hmmm.. Could you say that again?"
//!
//! [worker]
//! thread_name = "companion-inference"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::ModelOptions;
use crate::history::DEFAULT_MAX_TURNS;
use crate::orchestrator::RequestConfig;

/// Reply given to empty messages without consulting the model
pub const DEFAULT_EMPTY_INPUT_REPLY: &str = "Hmmm.. Could you say that again?";

/// Name of the dedicated inference thread
pub const DEFAULT_WORKER_THREAD_NAME: &str = "companion-inference";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Model section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelToml {
    /// Path of the model file on the device
    pub path: Option<String>,

    /// Top-k sampling bound
    pub max_top_k: Option<u32>,
}

/// History section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryToml {
    /// Maximum turns kept for the day
    pub max_turns: Option<usize>,
}

/// Chat section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// Canned reply for empty messages
    pub empty_input_reply: Option<String>,
}

/// Worker section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerToml {
    /// Inference thread name
    pub thread_name: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionToml {
    /// Model configuration section
    pub model: ModelToml,

    /// History configuration section
    pub history: HistoryToml,

    /// Chat configuration section
    pub chat: ChatToml,

    /// Worker configuration section
    pub worker: WorkerToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved configuration for the companion core
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct CompanionConfig {
    /// Model file path; hosts may also supply one per request
    pub model_path: Option<String>,

    /// Options for handle construction
    pub model: ModelOptions,

    /// Maximum turns kept in the day's history
    pub max_turns: usize,

    /// Reply to empty messages
    pub empty_input_reply: String,

    /// Inference thread name
    pub worker_thread_name: String,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            model: ModelOptions::default(),
            max_turns: DEFAULT_MAX_TURNS,
            empty_input_reply: DEFAULT_EMPTY_INPUT_REPLY.to_string(),
            worker_thread_name: DEFAULT_WORKER_THREAD_NAME.to_string(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl CompanionConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model path
    #[must_use]
    pub fn with_model_path(mut self, model_path: impl Into<String>) -> Self {
        self.model_path = Some(model_path.into());
        self
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Request settings for `identity` using the configured model path
    #[must_use]
    pub fn request_config(&self, identity: impl Into<String>) -> RequestConfig {
        RequestConfig {
            identity: identity.into(),
            model_path: self.model_path.clone(),
        }
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "history.max_turns must be at least 1".to_string(),
            ));
        }
        if self.model.max_top_k == 0 {
            return Err(ConfigError::ValidationError(
                "model.max_top_k must be at least 1".to_string(),
            ));
        }
        if self.worker_thread_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "worker.thread_name must not be empty".to_string(),
            ));
        }
        if self.model_path.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "model.path must not be empty when set".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/chatpet/companion.toml` or the platform
/// equivalent.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("chatpet").join("companion.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the resulting values are invalid. A missing config file is not an error.
pub fn load_config() -> Result<CompanionConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or if validation fails.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<CompanionConfig, ConfigError> {
    let mut config = CompanionConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_config = read_toml(config_path)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, |key| std::env::var(key).ok());

    config.validate()?;
    Ok(config)
}

fn read_toml(path: &Path) -> Result<CompanionToml, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut CompanionConfig, toml: &CompanionToml) {
    if toml.model.path.is_some() {
        config.model_path = toml.model.path.clone();
    }
    if let Some(top_k) = toml.model.max_top_k {
        config.model.max_top_k = top_k;
    }
    if let Some(max_turns) = toml.history.max_turns {
        config.max_turns = max_turns;
    }
    if let Some(ref reply) = toml.chat.empty_input_reply {
        config.empty_input_reply = reply.clone();
    }
    if let Some(ref name) = toml.worker.thread_name {
        config.worker_thread_name = name.clone();
    }
}

/// Apply environment variable overrides to the config
///
/// Unparsable numeric values are ignored with a warning.
fn apply_env_config(config: &mut CompanionConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(path) = var("CHATPET_MODEL_PATH") {
        config.model_path = Some(path);
        config.source = ConfigSource::Env;
    }
    if let Some(top_k) = var("CHATPET_MAX_TOP_K") {
        match top_k.parse::<u32>() {
            Ok(n) => {
                config.model.max_top_k = n;
                config.source = ConfigSource::Env;
            }
            Err(e) => tracing::warn!(value = %top_k, error = %e, "Ignoring CHATPET_MAX_TOP_K"),
        }
    }
    if let Some(max_turns) = var("CHATPET_MAX_TURNS") {
        match max_turns.parse::<usize>() {
            Ok(n) => {
                config.max_turns = n;
                config.source = ConfigSource::Env;
            }
            Err(e) => tracing::warn!(value = %max_turns, error = %e, "Ignoring CHATPET_MAX_TURNS"),
        }
    }
    if let Some(reply) = var("CHATPET_EMPTY_REPLY") {
        config.empty_input_reply = reply;
        config.source = ConfigSource::Env;
    }
}

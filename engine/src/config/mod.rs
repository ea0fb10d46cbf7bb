//! Configuration management
//!
//! This module handles loading, validation, and management of the Facturo configuration.
//! Configuration is stored in TOML format at ~/.facturo/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level and export directory
//! - **extraction**: Extraction provider, timeout and API key sources
//! - **guide**: The guided question sequence for dictated invoices
//! - **session**: Reset behavior after an error
//! - **export**: Downstream API endpoint for finalized invoices (optional)
//! - **display**: Presentation settings
//!
//! The API key is never stored in this file. It is read from the environment
//! variable named by `extraction.api_key_env`, falling back to the OS keychain.
//!
//! # Examples
//!
//! ```no_run
//! use facturo_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Model: {}", config.extraction.gemini.model);
//! println!("Questions: {}", config.guide.questions.len());
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::reconcile::{GuidedQuestions, ResetPolicy};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Extraction client settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Guided question sequence
    #[serde(default)]
    pub guide: GuideConfig,

    /// Session behavior
    #[serde(default)]
    pub session: SessionConfig,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Presentation settings
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory finalized invoices are written to (supports ~ expansion)
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

/// Extraction client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Extraction provider (currently only "gemini")
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Timeout for a single extraction call in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Fall back to the OS keychain when the environment variable is unset
    #[serde(default = "default_true")]
    pub use_keychain: bool,

    /// Gemini provider settings
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Base URL for Gemini API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_gemini_model")]
    pub model: String,
    // Note: API key comes from env or OS keychain, not from config
}

/// Guided question sequence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuideConfig {
    /// Ordered prompts; the last one is the review prompt
    #[serde(default = "default_questions")]
    pub questions: Vec<String>,
}

/// Session behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    /// Keep the accumulated record when resetting out of the error phase
    #[serde(default)]
    pub preserve_record_on_error_reset: bool,
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Downstream billing API that accepts the invoice JSON
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding a bearer token for the endpoint
    #[serde(default)]
    pub token_env: Option<String>,

    /// Pretty-print exported JSON
    #[serde(default = "default_true")]
    pub pretty: bool,
}

/// Presentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Currency symbol used when rendering amounts
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("~/.facturo/exports")
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_questions() -> Vec<String> {
    vec![
        "Para empezar, ¿cuál es el nombre completo, identificación y dirección del cliente?"
            .to_string(),
        "Excelente. Ahora, por favor, dime los artículos de la factura, incluyendo descripción, cantidad y precio unitario."
            .to_string(),
        "Perfecto. ¿Hay algún concepto general o nota que quieras añadir a la factura?"
            .to_string(),
        "Hemos recopilado toda la información. Por favor, revísala.".to_string(),
    ]
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            export_dir: default_export_dir(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            timeout_secs: default_timeout_secs(),
            api_key_env: default_api_key_env(),
            use_keychain: true,
            gemini: GeminiConfig::default(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
        }
    }
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            questions: default_questions(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token_env: None,
            pretty: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.facturo/config.toml)
    ///
    /// If the configuration file doesn't exist, writes a default configuration
    /// there first.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written, TOML parsing
    /// fails, or validation fails.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, TOML parsing fails, or
    /// validation fails.
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default();

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Wrote default configuration to {}", path.display());

        config.validate_and_process()?;
        Ok(config)
    }

    /// Get the default configuration file path (~/.facturo/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".facturo").join("config.toml"))
    }

    /// Guided question sequence built from the `guide` section
    pub fn guided_questions(&self) -> Result<GuidedQuestions, EngineError> {
        GuidedQuestions::new(self.guide.questions.clone())
    }

    /// Reset policy built from the `session` section
    pub fn reset_policy(&self) -> ResetPolicy {
        if self.session.preserve_record_on_error_reset {
            ResetPolicy::PreserveRecord
        } else {
            ResetPolicy::Discard
        }
    }

    /// Validate and process configuration
    ///
    /// Checks enumerated values and ranges, and expands `~` in paths. Does not
    /// touch the file system; the export directory is created on first write.
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_providers = ["gemini"];
        if !valid_providers.contains(&self.extraction.provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid extraction provider '{}'. Must be one of: {}",
                self.extraction.provider,
                valid_providers.join(", ")
            )));
        }

        if self.extraction.timeout_secs == 0 {
            return Err(EngineError::Config(
                "extraction.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.extraction.api_key_env.trim().is_empty() {
            return Err(EngineError::Config(
                "extraction.api_key_env must not be empty".to_string(),
            ));
        }

        if self.extraction.gemini.model.trim().is_empty() {
            return Err(EngineError::Config(
                "extraction.gemini.model must not be empty".to_string(),
            ));
        }

        if !is_http_url(&self.extraction.gemini.base_url) {
            return Err(EngineError::Config(format!(
                "extraction.gemini.base_url must be an http(s) URL, got '{}'",
                self.extraction.gemini.base_url
            )));
        }

        // Builds the sequence once so an empty list fails here, not mid-session
        self.guided_questions()?;

        if let Some(endpoint) = &self.export.endpoint {
            if !is_http_url(endpoint) {
                return Err(EngineError::Config(format!(
                    "export.endpoint must be an http(s) URL, got '{}'",
                    endpoint
                )));
            }
        }

        self.core.export_dir = expand_path(&self.core.export_dir)?;

        Ok(())
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

pub mod string;

pub use string::SecretString;

use keyring::Entry;
use regex::Regex;
use sdk::errors::EngineError;
use std::sync::OnceLock;

use crate::config::ExtractionConfig;

/// Keychain service name all Facturo secrets live under
pub const SERVICE_NAME: &str = "facturo";

/// Keychain entry for the extraction provider's API key
pub const API_KEY_ENTRY: &str = "gemini_api_key";

/// Where a resolved API key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Environment,
    Keychain,
}

/// SecretManager stores and retrieves secrets in the OS keychain.
///
/// Secrets are stored in:
/// - macOS: Keychain
/// - Windows: Credential Manager
/// - Linux: Secret Service (libsecret)
///
/// Unlike an interactive tool, a missing secret is reported as `None`; the
/// `key set` command is the only place a user types one in.
pub struct SecretManager {
    service_name: String,
}

static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Patterns for credentials that might appear in provider error bodies
///
/// - Google API keys: `AIza` + 35 chars
/// - `key=` query parameters
/// - `x-goog-api-key` header echoes
/// - Bearer tokens
fn secret_patterns() -> &'static [Regex] {
    SECRET_PATTERNS.get_or_init(|| {
        [
            r"AIza[0-9A-Za-z\-_]{35}",
            r"(?i)([?&]key=)[^&\s]+",
            r#"(?i)x-goog-api-key["']?\s*[:=]\s*["']?[^\s"',}]+"#,
            r"Bearer\s+[^\s]{20,}",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Replace anything that looks like a credential with `[REDACTED]`
pub fn scrub(text: &str) -> String {
    let mut result = text.to_string();
    for pattern in secret_patterns() {
        result = pattern.replace_all(&result, "[REDACTED]").into_owned();
    }
    result
}

impl SecretManager {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, EngineError> {
        Entry::new(&self.service_name, key).map_err(|e| {
            EngineError::KeyringError(format!("Failed to create keyring entry: {}", e))
        })
    }

    /// Look a secret up in the keychain
    ///
    /// # Errors
    /// Returns `EngineError::KeyringError` if the keychain itself fails.
    pub fn get_secret(&self, key: &str) -> Result<Option<SecretString>, EngineError> {
        match self.entry(key)?.get_password() {
            Ok(secret) => {
                tracing::debug!("Retrieved secret '{}' from keychain", key);
                Ok(Some(SecretString::new(secret)))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(EngineError::KeyringError(format!(
                "Failed to retrieve secret '{}': {}",
                key, e
            ))),
        }
    }

    pub fn set_secret(&self, key: &str, value: &SecretString) -> Result<(), EngineError> {
        if value.is_blank() {
            return Err(EngineError::KeyringError(
                "Secret cannot be empty".to_string(),
            ));
        }

        self.entry(key)?.set_password(value.expose()).map_err(|e| {
            EngineError::KeyringError(format!("Failed to store secret '{}': {}", key, e))
        })?;

        tracing::info!("Stored secret '{}' in keychain", key);
        Ok(())
    }

    pub fn delete_secret(&self, key: &str) -> Result<(), EngineError> {
        match self.entry(key)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                tracing::info!("Deleted secret '{}' from keychain", key);
                Ok(())
            }
            Err(e) => Err(EngineError::KeyringError(format!(
                "Failed to delete secret '{}': {}",
                key, e
            ))),
        }
    }

    pub fn has_secret(&self, key: &str) -> bool {
        matches!(self.get_secret(key), Ok(Some(_)))
    }

    pub fn scrub(&self, text: &str) -> String {
        scrub(text)
    }
}

/// Resolve the extraction API key: environment variable first, then keychain
///
/// There is no built-in fallback credential; with neither source set this
/// fails with a configuration error telling the user how to provide one.
pub fn resolve_api_key(
    config: &ExtractionConfig,
    manager: &SecretManager,
) -> Result<(SecretString, KeySource), EngineError> {
    if let Some(key) = SecretString::from_env(&config.api_key_env) {
        tracing::debug!("Using API key from ${}", config.api_key_env);
        return Ok((key, KeySource::Environment));
    }

    if config.use_keychain {
        if let Some(key) = manager.get_secret(API_KEY_ENTRY)? {
            return Ok((key, KeySource::Keychain));
        }
    }

    Err(EngineError::Config(format!(
        "No API key found. Set ${} or run `facturo key set`",
        config.api_key_env
    )))
}

//! Error types and handling
//!
//! This module provides the error types used throughout the Facturo engine.
//! All errors implement the `FacturoErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! All error hints are static strings so that:
//! - No secrets (API keys, tokens) are included
//! - No raw model output is echoed back to the user
//! - All messages are safe to display to end users

use thiserror::Error;

/// Trait for Facturo error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait FacturoErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain
    /// secrets, file paths, or internal implementation details.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be cleared with a session reset. Non-recoverable
    /// errors indicate a caller bug or require manual intervention.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Capture**: Camera/microphone/file capture could not produce an artifact
/// - **Extraction**: Network, model or parse failure from the extraction client
/// - **Session**: An action was attempted in a phase that does not allow it
/// - **Export**: Writing or submitting the finalized record failed
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, FacturoErrorExt};
///
/// let error = EngineError::Extraction("model returned garbage".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let misuse = EngineError::InvalidTransition {
///     phase: "processing".to_string(),
///     action: "start".to_string(),
/// };
/// assert!(!misuse.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Capture errors
    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    // Extraction errors
    #[error("Extraction failed: {0}")]
    Extraction(String),

    // Session state machine errors
    #[error("Action '{action}' is not allowed while the session is {phase}")]
    InvalidTransition { phase: String, action: String },

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Export errors
    #[error("Export failed: {0}")]
    Export(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FacturoErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::CaptureUnavailable(_) => {
                "Could not access the capture device. Check permissions and try again"
            }
            Self::Extraction(_) => "The AI could not read the data. Reset and try again",
            Self::InvalidTransition { .. } => "That action is not available right now",
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
            Self::Network(_) => "Network operation failed. Check your connection",
            Self::Export(_) => "Could not export the invoice. Check the destination",
            Self::Serialization(_) => "The invoice data could not be encoded",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidTransition { .. } | Self::Config(_))
    }
}

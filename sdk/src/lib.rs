//! Facturo SDK
//!
//! Shared types for Facturo components: the invoice record and its wire
//! format, partial extraction results, capture artifacts and the engine
//! error taxonomy. This crate is used by the engine and by anything that
//! consumes exported invoices.

/// Capture artifacts and events
pub mod capture;

/// Error types and handling
pub mod errors;

/// Record and partial result types
pub mod types;

// Re-export commonly used types
pub use capture::{Artifact, CaptureEvent, Modality};
pub use errors::{EngineError, FacturoErrorExt};
pub use types::{LineItem, PartialParty, PartialResult, Party, Record};

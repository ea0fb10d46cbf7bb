//! Facturo Engine Library
//!
//! This library provides the core functionality of the Facturo engine.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Telemetry and Observability
pub mod telemetry;

/// Session state machine and record reconciliation
pub mod reconcile;

/// Extraction clients that turn artifacts into partial results
pub mod extraction;

/// Message bus for inter-component communication
pub mod message_bus;

/// Async driver around the reconciliation engine
pub mod driver;

/// Capture adapters for dictation and receipt photos
pub mod capture;

/// Export of finalized invoices
pub mod export;

/// Terminal presentation of sessions and invoices
pub mod render;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;

//! CLI interface for Facturo
//!
//! Command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Facturo: build invoices from dictation and receipt photos
///
/// Dictate or photograph the data, answer a few guided questions, review the
/// result and export it as JSON.
#[derive(Parser, Debug)]
#[command(name = "facturo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build an invoice by dictating, one line per utterance
    ///
    /// Type `:done` to confirm the reviewed invoice, `:reset` to start over
    /// and `:quit` to leave without saving.
    Dictate {
        /// Directory to write the finalized invoice to (defaults to core.export_dir)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Also POST the finalized invoice to export.endpoint
        #[arg(long)]
        submit: bool,
    },

    /// Extract an invoice from one or more receipt photos
    Scan {
        /// Image files (JPEG, PNG, WebP or HEIC), processed in order
        #[arg(required = true, value_name = "IMAGE")]
        images: Vec<PathBuf>,

        /// Directory to write the finalized invoice to (defaults to core.export_dir)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Also POST the finalized invoice to export.endpoint
        #[arg(long)]
        submit: bool,
    },

    /// Merge recorded extraction results offline and show the outcome
    Replay {
        /// JSON file holding an array of partial results
        file: PathBuf,
    },

    /// Manage the extraction API key in the OS keychain
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum KeyAction {
    /// Store the API key (read from stdin)
    Set,

    /// Show where the API key would be taken from
    Status,

    /// Remove the API key from the keychain
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Validate configuration file
    Validate,
}

//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// user-aggregator - load a user's details, comments and friends in one go
///
/// The user is loaded first; comments and friends are then loaded
/// concurrently, each bounded by a timeout. A failing or slow dependent
/// source yields an empty list instead of failing the whole run.
///
/// Examples:
///   user-aggregator --base-url https://api.example.com
///   user-aggregator --fixture demo.toml --format json
///   user-aggregator --base-url http://localhost:8080 --timeout-ms 500 --deadline-ms 3000
///   user-aggregator --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Base URL of the user service
    ///
    /// Can also be set via USER_AGGREGATOR_URL env var or .user-aggregator.toml.
    #[arg(long, value_name = "URL", env = "USER_AGGREGATOR_URL")]
    pub base_url: Option<String>,

    /// Play back a TOML fixture instead of calling the user service
    ///
    /// Takes precedence over --base-url.
    #[arg(long, value_name = "FILE")]
    pub fixture: Option<PathBuf>,

    /// Time budget of each dependent fetch in milliseconds
    ///
    /// Default: from config or 2000ms.
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Cancel the whole aggregation after this many milliseconds
    #[arg(long, value_name = "MS")]
    pub deadline_ms: Option<u64>,

    /// Output file path for the report (stdout if omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .user-aggregator.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .user-aggregator.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref base_url) = self.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref fixture) = self.fixture {
            if !fixture.is_file() {
                return Err(format!("Fixture file does not exist: {}", fixture.display()));
            }
        }

        if self.timeout_ms == Some(0) {
            return Err("Timeout must be at least 1 millisecond".to_string());
        }

        if self.deadline_ms == Some(0) {
            return Err("Deadline must be at least 1 millisecond".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

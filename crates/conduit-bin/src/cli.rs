// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `validate-metadata` / `validate-details`: sanitize raw JSON offline
//! - `test-connection`: probe a platform from the inventory
//! - `test-resource`: probe one resource without a device alias
//! - `fetch`: orchestrated fetch for one device
//! - `version`: show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use conduit_config::LogFormat;

// =============================================================================
// Main CLI Structure
// =============================================================================

/// conduit - validated connectors for REST, time-series, OPC UA and SDK platforms
#[derive(Parser, Debug)]
#[command(
    name = "conduit",
    author = "Sylvex <contact@sylvex.io>",
    version = conduit_core::VERSION,
    about = "Validated platform connectors for REST, time-series, OPC UA and SDK backends",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Settings file path (YAML, TOML or JSON)
    #[arg(short, long, env = "CONDUIT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Inventory file with platforms, resources and device links
    #[arg(short, long, global = true)]
    pub inventory: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json, compact)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormatArg>,

    /// Enable quiet mode (warnings and errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Validate platform metadata and print its canonical form
    #[command(name = "validate-metadata")]
    ValidateMetadata(ValidateArgs),

    /// Validate resource details and print their canonical form
    #[command(name = "validate-details")]
    ValidateDetails(ValidateArgs),

    /// Check that a platform from the inventory is reachable
    #[command(name = "test-connection")]
    TestConnection(TestConnectionArgs),

    /// Run one resource against its platform
    #[command(name = "test-resource")]
    TestResource(TestResourceArgs),

    /// Fetch every resource of a platform for one device
    Fetch(FetchArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the validation commands.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Platform or resource type (e.g. REST, TimeSeries, rest_endpoint)
    #[arg(short = 't', long = "type")]
    pub kind: String,

    /// Raw JSON, or `@path` to read it from a file
    pub input: String,
}

/// Arguments for `test-connection`.
#[derive(Args, Debug, Clone)]
pub struct TestConnectionArgs {
    /// Platform id
    #[arg(short, long)]
    pub platform: i64,
}

/// Arguments for `test-resource`.
#[derive(Args, Debug, Clone)]
pub struct TestResourceArgs {
    /// Resource id
    #[arg(short, long)]
    pub resource: i64,
}

/// Arguments for `fetch`.
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Platform id
    #[arg(short, long)]
    pub platform: i64,

    /// Device id
    #[arg(short, long)]
    pub device: i64,

    /// Override passed to every resource, as `key=value` (repeatable)
    #[arg(long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable text format
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
            LogFormatArg::Compact => LogFormat::Compact,
        }
    }
}

// =============================================================================
// Helper Methods
// =============================================================================

/// Parses `key=value`.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Level forced by `--quiet` / `--verbose` / `--log-level`, if any.
    pub fn log_level_override(&self) -> Option<&str> {
        if self.quiet {
            Some("warn")
        } else if self.verbose {
            Some("debug")
        } else {
            self.log_level.as_deref()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

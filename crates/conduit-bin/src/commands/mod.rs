// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `validate-metadata` / `validate-details`: offline sanitization
//! - `test-connection` / `test-resource`: probes against the inventory
//! - `fetch`: orchestrated fetch
//! - `version`: show version information

mod fetch;
mod probe;
mod validate;
mod version;

pub use fetch::fetch;
pub use probe::{test_connection, test_resource};
pub use validate::{read_input, validate_details, validate_metadata};
pub use version::version;

use conduit_config::Settings;
use serde::Serialize;

use crate::cli::{Cli, Commands};
use crate::error::{BinError, BinResult};

/// Executes the command selected on the command line.
pub async fn execute(cli: &Cli, settings: &Settings) -> BinResult<()> {
    match &cli.command {
        Commands::ValidateMetadata(args) => validate::validate_metadata(args),
        Commands::ValidateDetails(args) => validate::validate_details(args),
        Commands::TestConnection(args) => probe::test_connection(settings, args).await,
        Commands::TestResource(args) => probe::test_resource(settings, args).await,
        Commands::Fetch(args) => fetch::fetch(settings, args).await,
        Commands::Version => version::version(),
    }
}

/// Prints `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> BinResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| BinError::runtime(format!("failed to render output: {}", e)))?;
    println!("{}", text);
    Ok(())
}

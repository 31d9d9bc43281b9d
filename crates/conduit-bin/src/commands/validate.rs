// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the validation commands.

use std::fs;

use conduit_core::sanitize;
use tracing::debug;

use crate::cli::ValidateArgs;
use crate::error::{BinError, BinResult};

/// Returns the literal argument, or the file content for `@path`.
pub fn read_input(arg: &str) -> BinResult<String> {
    match arg.strip_prefix('@') {
        Some(path) => fs::read_to_string(path).map_err(|e| BinError::io(format!("{}: {}", path, e))),
        None => Ok(arg.to_string()),
    }
}

/// Executes `validate-metadata`.
pub fn validate_metadata(args: &ValidateArgs) -> BinResult<()> {
    let raw = read_input(&args.input)?;
    let sanitized = sanitize::validate_metadata(&args.kind, &raw)?;
    debug!(platform_type = %args.kind, "Metadata accepted");
    println!("{}", sanitized.canonical());
    Ok(())
}

/// Executes `validate-details`.
pub fn validate_details(args: &ValidateArgs) -> BinResult<()> {
    let raw = read_input(&args.input)?;
    let sanitized = sanitize::validate_details(&args.kind, &raw)?;
    debug!(resource_type = %args.kind, "Details accepted");
    println!("{}", sanitized.canonical());
    Ok(())
}

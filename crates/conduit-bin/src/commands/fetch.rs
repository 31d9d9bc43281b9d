// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `fetch` command.
//!
//! Prints the envelope on success. When every resource failed the per-resource
//! report is still printed before the command exits with a driver error code.

use conduit_config::Settings;
use conduit_engine::FetchRequest;
use tracing::warn;

use super::print_json;
use crate::cli::FetchArgs;
use crate::error::BinResult;
use crate::runtime::build_engine;
use crate::shutdown::interruptible_context;

/// Builds the engine request from CLI arguments.
pub fn request_from(args: &FetchArgs) -> FetchRequest {
    args.params
        .iter()
        .fold(FetchRequest::new(args.platform, args.device), |request, (key, value)| {
            request.with_override(key.as_str(), value.as_str())
        })
}

/// Executes `fetch`.
pub async fn fetch(settings: &Settings, args: &FetchArgs) -> BinResult<()> {
    let engine = build_engine(settings)?;
    let ctx = interruptible_context();

    match engine.fetch(&ctx, &request_from(args)).await {
        Ok(envelope) => {
            if envelope.data.failure_count() > 0 {
                warn!(
                    platform = args.platform,
                    device = args.device,
                    failed = envelope.data.failure_count(),
                    "Some resources failed"
                );
            }
            print_json(&envelope)
        }
        Err(e) => {
            if let Some(report) = e.report() {
                print_json(report)?;
            }
            Err(e.into())
        }
    }
}

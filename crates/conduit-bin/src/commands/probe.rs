// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of `test-connection` and `test-resource`.

use conduit_config::Settings;
use tracing::info;

use super::print_json;
use crate::cli::{TestConnectionArgs, TestResourceArgs};
use crate::error::BinResult;
use crate::runtime::build_engine;
use crate::shutdown::interruptible_context;

/// Executes `test-connection`.
pub async fn test_connection(settings: &Settings, args: &TestConnectionArgs) -> BinResult<()> {
    let engine = build_engine(settings)?;
    let ctx = interruptible_context();

    let report = engine.test_connection(&ctx, args.platform).await?;
    info!(
        platform = args.platform,
        latency_ms = report.latency_ms,
        "Connection test passed"
    );
    print_json(&report)
}

/// Executes `test-resource`.
pub async fn test_resource(settings: &Settings, args: &TestResourceArgs) -> BinResult<()> {
    let engine = build_engine(settings)?;
    let ctx = interruptible_context();

    let envelope = engine.test_resource(&ctx, args.resource).await?;
    print_json(&envelope)
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! conduit - validated platform connectors
//!
//! Main binary entry point.

use conduit_bin::error::report_error_and_exit;
use conduit_bin::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    if let Err(e) = conduit_bin::run(cli).await {
        report_error_and_exit(e);
    }
}

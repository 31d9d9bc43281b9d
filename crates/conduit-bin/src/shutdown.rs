// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Interrupt handling.
//!
//! Ctrl-C cancels the request context. Drivers observe the token, fail with
//! `Canceled`, and the engine still runs a bounded disconnect.

use conduit_core::context::{CancelToken, FetchContext};
use tracing::{info, warn};

/// Returns a context canceled on the first interrupt.
pub fn interruptible_context() -> FetchContext {
    let token = CancelToken::new();
    let signal_token = token.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, canceling in-flight work");
                signal_token.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for interrupt"),
        }
    });

    FetchContext::with_cancel(token)
}

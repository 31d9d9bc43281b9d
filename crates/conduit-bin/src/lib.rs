// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # conduit-bin
//!
//! Command-line front end for the conduit driver layer.
//!
//! ## Architecture
//!
//! ```text
//!                      main.rs
//!                         │
//!                   ┌─────▼─────┐
//!                   │  cli.rs   │  argument parsing
//!                   └─────┬─────┘
//!                         │
//!          ┌──────────────┼──────────────┐
//!          ▼              ▼              ▼
//!     ┌─────────┐   ┌──────────┐   ┌──────────┐
//!     │ runtime │   │ logging  │   │ commands │
//!     │Settings │   └──────────┘   └────┬─────┘
//!     │ + Engine│                       │
//!     └─────────┘                 ┌─────▼─────┐
//!                                 │ shutdown  │  Ctrl-C ─► CancelToken
//!                                 └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Sanitize metadata offline
//! conduit validate-metadata --type REST '{"base_endpoint":"https://api.example.com"}'
//!
//! # Probe a platform from the inventory
//! conduit -i inventory.yaml test-connection --platform 1
//!
//! # Fetch every resource for device 42
//! conduit -i inventory.yaml fetch --platform 1 --device 42 --param time_range=-15m
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolves settings, starts logging and runs the selected command.
pub async fn run(cli: Cli) -> BinResult<()> {
    let settings = runtime::load_settings(&cli)?;
    init_logging(&settings.logging.level, settings.logging.format)?;
    commands::execute(&cli, &settings).await
}

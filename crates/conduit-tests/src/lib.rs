// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # conduit Integration Tests
//!
//! Cross-crate tests for the validator, the drivers and the orchestrator.
//!
//! ## Module Structure
//!
//! - [`common`]: shared fixtures and mocks
//!   - `fixtures`: platform, resource and device-link records
//!   - `mocks`: in-memory store and a scriptable OPC UA transport
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p conduit-tests
//! cargo test -p conduit-tests --test integration_validation
//! cargo test -p conduit-tests --test integration_fetch
//! cargo test -p conduit-tests --test integration_lifecycle
//! cargo test -p conduit-tests --test integration_inventory
//! ```
//!
//! ## Test Categories
//!
//! ### Validation (`integration_validation.rs`)
//! - Sanitizer laws: idempotence, path containment, credential stripping
//! - Scenarios A, B and C
//!
//! ### Fetch (`integration_fetch.rs`)
//! - Scenario D and partial-failure aggregation across every driver kind
//! - Override merging and alias injection through the engine
//!
//! ### Lifecycle (`integration_lifecycle.rs`)
//! - Scenario E (expired deadline) and F (double disconnect) per driver
//! - Cancellation with bounded cleanup
//!
//! ### Inventory (`integration_inventory.rs`)
//! - File-backed store end to end

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::fixtures::*;
    pub use crate::common::mocks::*;
    pub use crate::common::init_test_logging;
}

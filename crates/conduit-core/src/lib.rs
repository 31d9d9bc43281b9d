// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # conduit-core
//!
//! Core abstractions for the conduit platform driver layer.
//!
//! This crate provides the types and traits shared by every connector:
//!
//! - **Types**: `Platform`, `Resource`, `DeviceLink` records and the `PlatformStore` collaborator
//! - **Schema**: typed metadata and details per platform / resource type
//! - **Sanitize**: validation of untrusted JSON into `Sanitized<T>` values
//! - **Driver**: the `PlatformDriver` contract, factories and registry
//! - **Context**: deadline and cancellation propagation
//! - **Output**: structured fetch results
//! - **Error**: unified error hierarchy
//!
//! ## Example
//!
//! ```
//! use conduit_core::sanitize::{validate_details, validate_metadata};
//!
//! let metadata = validate_metadata(
//!     "REST",
//!     r#"{"base_endpoint":"https://api.example.com","auth":{"type":"none"}}"#,
//! ).unwrap();
//! let details = validate_details("rest_endpoint", r#"{"method":"get","path":"assets"}"#).unwrap();
//!
//! assert_eq!(details.canonical(), r#"{"method":"GET","path":"/assets","headers":{},"query_params":{}}"#);
//! assert!(metadata.canonical().contains("https://api.example.com/"));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod address;
pub mod error;
pub mod types;

// =============================================================================
// Configuration Modules
// =============================================================================

pub mod schema;
pub mod sanitize;

// =============================================================================
// Driver Modules
// =============================================================================

pub mod context;
pub mod driver;
pub mod output;

// =============================================================================
// Re-exports
// =============================================================================

pub use context::{CancelToken, FetchContext};
pub use driver::{DriverFactory, DriverRegistry, PlatformDriver};
pub use error::{ConduitError, ConfigError, DriverError, DriverResult};
pub use output::FetchOutput;
pub use sanitize::Sanitized;
pub use schema::{PlatformMetadata, ResourceDetails};
pub use types::{DeviceLink, Platform, PlatformStore, PlatformType, Resource, ResourceType};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

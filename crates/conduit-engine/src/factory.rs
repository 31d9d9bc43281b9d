// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Driver factory.
//!
//! Registers one factory per supported platform type. Adding a platform type
//! touches the schema, one driver crate, and one line here.

use std::sync::Arc;

use conduit_core::driver::{DriverRegistry, PlatformDriver};
use conduit_core::error::{DriverError, DriverResult};
use conduit_core::sanitize::Sanitized;
use conduit_core::schema::PlatformMetadata;
use conduit_core::types::{PlatformType, ResourceType};
use conduit_opcua::OpcUaDriverFactory;
use conduit_rest::RestDriverFactory;
use conduit_sdk::SdkDriverFactory;
use conduit_timeseries::TimeSeriesDriverFactory;
use once_cell::sync::Lazy;

static DEFAULT_REGISTRY: Lazy<DriverRegistry> = Lazy::new(default_registry);

/// Builds a registry holding every built-in driver.
pub fn default_registry() -> DriverRegistry {
    DriverRegistry::new()
        .with(Arc::new(RestDriverFactory))
        .with(Arc::new(TimeSeriesDriverFactory))
        .with(Arc::new(OpcUaDriverFactory::new()))
        .with(Arc::new(SdkDriverFactory::default()))
}

/// Creates a driver for a platform type given as its stored string.
///
/// # Errors
///
/// - `DriverError::UnsupportedPlatformType` naming the offending value
/// - `DriverError::InvalidMetadata` when the metadata belongs to another type
pub fn get_driver(
    platform_type: &str,
    metadata: &Sanitized<PlatformMetadata>,
) -> DriverResult<Box<dyn PlatformDriver>> {
    DEFAULT_REGISTRY.create(platform_type, platform_type, metadata)
}

/// Rejects a resource type the platform type cannot serve.
pub fn check_compatibility(platform_type: PlatformType, resource_type: ResourceType) -> DriverResult<()> {
    if platform_type.accepts(resource_type) {
        Ok(())
    } else {
        Err(DriverError::incompatible(resource_type.as_str(), platform_type.as_str()))
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Platform driver abstraction layer.
//!
//! Every connector implements [`PlatformDriver`]. Drivers are built by a
//! [`DriverFactory`] from sanitized metadata and looked up through a
//! [`DriverRegistry`] keyed by [`PlatformType`].
//!
//! # Design Principles
//!
//! - **Sanitized input only**: drivers accept `Sanitized<_>` values, never raw JSON
//! - **Context everywhere**: every blocking call takes a [`FetchContext`]
//! - **One instance per fetch**: drivers are not shared between requests
//! - **Idempotent disconnect**: disconnecting twice is not an error
//!
//! # Lifecycle
//!
//! ```text
//!   factory.create() ─► connect(ctx) ─► fetch_data(ctx, d)* ─► disconnect(ctx)
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::FetchContext;
use crate::error::{DriverError, DriverResult};
use crate::output::FetchOutput;
use crate::sanitize::Sanitized;
use crate::schema::{PlatformMetadata, ResourceDetails};
use crate::types::{PlatformType, ResourceType};

// =============================================================================
// PlatformDriver Trait
// =============================================================================

/// The contract every connector implements.
///
/// Implementations are not required to support concurrent calls; callers
/// serialize access to one instance or create one instance per fetch.
#[async_trait]
pub trait PlatformDriver: Send + Sync {
    /// Human-readable instance name used in logs.
    fn name(&self) -> &str;

    /// Platform type served by this driver.
    fn platform_type(&self) -> PlatformType;

    /// Returns `true` while a session is open. Stateless drivers report
    /// `true` between `connect` and `disconnect`.
    fn is_connected(&self) -> bool;

    /// Establishes connection state; a no-op for stateless protocols.
    ///
    /// # Errors
    ///
    /// - `DriverError::Timeout` when the context deadline passes
    /// - `DriverError::Canceled` when the context is canceled
    /// - `DriverError::ConnectionFailed` when the target is unreachable
    async fn connect(&mut self, ctx: &FetchContext) -> DriverResult<()>;

    /// Executes exactly one logical read.
    async fn fetch_data(
        &mut self,
        ctx: &FetchContext,
        details: &Sanitized<ResourceDetails>,
    ) -> DriverResult<FetchOutput>;

    /// Releases connection state. Calling it when not connected is a no-op.
    async fn disconnect(&mut self, ctx: &FetchContext) -> DriverResult<()>;

    /// Live reachability check that performs no data fetch.
    async fn validate_config(&mut self, ctx: &FetchContext) -> DriverResult<()>;

    /// Read-only probe of a resource; defaults to [`fetch_data`](Self::fetch_data).
    async fn test_resource(
        &mut self,
        ctx: &FetchContext,
        details: &Sanitized<ResourceDetails>,
    ) -> DriverResult<FetchOutput> {
        self.fetch_data(ctx, details).await
    }
}

/// Rejects details whose kind does not belong to `platform_type`.
pub fn ensure_details_kind(
    platform_type: PlatformType,
    details: &ResourceDetails,
) -> DriverResult<()> {
    let resource_type: ResourceType = details.resource_type();
    if platform_type.accepts(resource_type) {
        Ok(())
    } else {
        Err(DriverError::invalid_details(format!(
            "{} driver cannot execute {} details",
            platform_type, resource_type
        )))
    }
}

// =============================================================================
// Driver Factory
// =============================================================================

/// Builds drivers of one platform type.
pub trait DriverFactory: Send + Sync {
    /// Platform type this factory builds.
    fn platform_type(&self) -> PlatformType;

    /// Creates a driver from sanitized metadata.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::InvalidMetadata` when the metadata does not fit
    /// this driver. Never panics.
    fn create(
        &self,
        name: &str,
        metadata: &Sanitized<PlatformMetadata>,
    ) -> DriverResult<Box<dyn PlatformDriver>>;
}

// =============================================================================
// Driver Registry
// =============================================================================

/// Maps platform types to their factories.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<PlatformType, Arc<dyn DriverFactory>>,
}

impl DriverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory, replacing any previous one for the same type.
    pub fn register(&mut self, factory: Arc<dyn DriverFactory>) {
        self.factories.insert(factory.platform_type(), factory);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, factory: Arc<dyn DriverFactory>) -> Self {
        self.register(factory);
        self
    }

    /// Returns `true` if a factory exists for `platform_type`.
    pub fn supports(&self, platform_type: PlatformType) -> bool {
        self.factories.contains_key(&platform_type)
    }

    /// Registered platform types.
    pub fn platform_types(&self) -> Vec<PlatformType> {
        let mut types: Vec<_> = self.factories.keys().copied().collect();
        types.sort_by_key(|t| t.as_str());
        types
    }

    /// Creates a driver for a platform type given as its stored string.
    ///
    /// # Errors
    ///
    /// - `DriverError::UnsupportedPlatformType` naming the offending value
    /// - `DriverError::InvalidMetadata` when the metadata belongs to another type
    pub fn create(
        &self,
        platform_type: &str,
        name: &str,
        metadata: &Sanitized<PlatformMetadata>,
    ) -> DriverResult<Box<dyn PlatformDriver>> {
        let parsed: PlatformType = platform_type
            .parse()
            .map_err(|_| DriverError::unsupported_platform_type(platform_type))?;
        self.create_for(parsed, name, metadata)
    }

    /// Creates a driver for a known platform type.
    pub fn create_for(
        &self,
        platform_type: PlatformType,
        name: &str,
        metadata: &Sanitized<PlatformMetadata>,
    ) -> DriverResult<Box<dyn PlatformDriver>> {
        let factory = self
            .factories
            .get(&platform_type)
            .ok_or_else(|| DriverError::unsupported_platform_type(platform_type.as_str()))?;

        if metadata.platform_type() != platform_type {
            return Err(DriverError::invalid_metadata(format!(
                "metadata was validated for {} but platform type is {}",
                metadata.platform_type(),
                platform_type
            )));
        }

        factory.create(name, metadata)
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("platform_types", &self.platform_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::SdkReading;
    use crate::sanitize::{validate_details, validate_metadata};
    use chrono::Utc;

    struct EchoDriver {
        name: String,
        connected: bool,
    }

    #[async_trait]
    impl PlatformDriver for EchoDriver {
        fn name(&self) -> &str {
            &self.name
        }

        fn platform_type(&self) -> PlatformType {
            PlatformType::Sdk
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn connect(&mut self, ctx: &FetchContext) -> DriverResult<()> {
            ctx.check("connect")?;
            self.connected = true;
            Ok(())
        }

        async fn fetch_data(
            &mut self,
            _ctx: &FetchContext,
            details: &Sanitized<ResourceDetails>,
        ) -> DriverResult<FetchOutput> {
            ensure_details_kind(self.platform_type(), details)?;
            Ok(FetchOutput::Sdk(SdkReading {
                device: self.name.clone(),
                method: "echo".into(),
                value: serde_json::Value::Null,
                timestamp: Utc::now(),
            }))
        }

        async fn disconnect(&mut self, _ctx: &FetchContext) -> DriverResult<()> {
            self.connected = false;
            Ok(())
        }

        async fn validate_config(&mut self, _ctx: &FetchContext) -> DriverResult<()> {
            Ok(())
        }
    }

    struct EchoFactory;

    impl DriverFactory for EchoFactory {
        fn platform_type(&self) -> PlatformType {
            PlatformType::Sdk
        }

        fn create(
            &self,
            name: &str,
            _metadata: &Sanitized<PlatformMetadata>,
        ) -> DriverResult<Box<dyn PlatformDriver>> {
            Ok(Box::new(EchoDriver {
                name: name.to_string(),
                connected: false,
            }))
        }
    }

    fn sdk_metadata() -> Sanitized<PlatformMetadata> {
        validate_metadata("SDK", r#"{"endpoint":"gw","access_key":"a","secret_key":"s"}"#).unwrap()
    }

    #[test]
    fn test_registry_unknown_type() {
        let registry = DriverRegistry::new().with(Arc::new(EchoFactory));
        let err = registry.create("Modbus", "x", &sdk_metadata()).err().unwrap();
        match err {
            DriverError::UnsupportedPlatformType { value } => assert_eq!(value, "Modbus"),
            other => panic!("unexpected {:?}", other),
        }

        let err = registry.create("REST", "x", &sdk_metadata()).err().unwrap();
        assert!(matches!(err, DriverError::UnsupportedPlatformType { .. }));
    }

    #[test]
    fn test_registry_rejects_mismatched_metadata() {
        let registry = DriverRegistry::new().with(Arc::new(EchoFactory));
        let rest = validate_metadata("REST", r#"{"base_endpoint":"https://a.io"}"#).unwrap();
        let err = registry.create("SDK", "x", &rest).err().unwrap();
        assert!(matches!(err, DriverError::InvalidMetadata { .. }));
    }

    #[tokio::test]
    async fn test_default_test_resource_delegates_to_fetch() {
        let registry = DriverRegistry::new().with(Arc::new(EchoFactory));
        let mut driver = registry.create("SDK", "echo-1", &sdk_metadata()).unwrap();
        let ctx = FetchContext::new();

        driver.connect(&ctx).await.unwrap();
        assert!(driver.is_connected());

        let details = validate_details("sdk_method", "{}").unwrap();
        let output = driver.test_resource(&ctx, &details).await.unwrap();
        assert_eq!(output.as_sdk().map(|r| r.device.as_str()), Some("echo-1"));

        let wrong = validate_details("opcua_node", r#"{"node_id":"i=85"}"#).unwrap();
        let err = driver.fetch_data(&ctx, &wrong).await.unwrap_err();
        assert!(matches!(err, DriverError::InvalidDetails { .. }));
    }
}

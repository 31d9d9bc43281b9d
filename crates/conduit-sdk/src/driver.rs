// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Generic vendor SDK driver.
//!
//! Every SDK call is scoped to one device, normally the alias injected at
//! fetch time. Session setup and calls are bounded by the context and by the
//! metadata timeout, whichever ends first.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use conduit_core::context::FetchContext;
use conduit_core::driver::{ensure_details_kind, DriverFactory, PlatformDriver};
use conduit_core::error::{DriverError, DriverResult};
use conduit_core::output::{FetchOutput, SdkReading};
use conduit_core::sanitize::Sanitized;
use conduit_core::schema::{PlatformMetadata, ResourceDetails, SdkMetadata};
use conduit_core::types::PlatformType;
use tracing::{debug, info};

use crate::client::{SdkClient, SimulatedClient, SimulationProfile};

/// Driver for vendor SDK platforms.
pub struct SdkDriver {
    name: String,
    metadata: SdkMetadata,
    client: Box<dyn SdkClient>,
}

impl SdkDriver {
    /// Creates a driver backed by the simulated client.
    pub fn new(
        name: impl Into<String>,
        metadata: &Sanitized<PlatformMetadata>,
        profile: SimulationProfile,
    ) -> DriverResult<Self> {
        let metadata = sdk_metadata(metadata)?;
        let client = Box::new(SimulatedClient::new(metadata, profile));
        Ok(Self::with_client(name, metadata.clone(), client))
    }

    /// Creates a driver around a vendor client.
    pub fn with_client(name: impl Into<String>, metadata: SdkMetadata, client: Box<dyn SdkClient>) -> Self {
        Self {
            name: name.into(),
            metadata,
            client,
        }
    }
}

fn sdk_metadata(metadata: &Sanitized<PlatformMetadata>) -> DriverResult<&SdkMetadata> {
    match metadata.get() {
        PlatformMetadata::Sdk(m) => Ok(m),
        other => Err(DriverError::invalid_metadata(format!(
            "expected SDK metadata, got {}",
            other.platform_type()
        ))),
    }
}

#[async_trait]
impl PlatformDriver for SdkDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn platform_type(&self) -> PlatformType {
        PlatformType::Sdk
    }

    fn is_connected(&self) -> bool {
        self.client.is_open()
    }

    async fn connect(&mut self, ctx: &FetchContext) -> DriverResult<()> {
        let ctx = ctx.with_timeout(self.metadata.timeout());
        let start = Instant::now();
        ctx.run("connect", self.client.open()).await?;
        info!(
            driver = %self.name,
            endpoint = %self.metadata.endpoint,
            latency_ms = start.elapsed().as_millis() as u64,
            "SDK session opened"
        );
        Ok(())
    }

    async fn fetch_data(
        &mut self,
        ctx: &FetchContext,
        details: &Sanitized<ResourceDetails>,
    ) -> DriverResult<FetchOutput> {
        ensure_details_kind(PlatformType::Sdk, details)?;
        let details = match details.get() {
            ResourceDetails::Sdk(d) => d,
            _ => return Err(DriverError::invalid_details("expected SDK details")),
        };
        if !self.client.is_open() {
            return Err(DriverError::NotConnected);
        }
        let device = details
            .device
            .as_deref()
            .ok_or_else(|| DriverError::invalid_details("SDK calls need a device alias"))?;

        let ctx = ctx.with_timeout(self.metadata.timeout());
        let value = ctx
            .run("fetch", self.client.call(device, &details.method, &details.params))
            .await?;

        debug!(driver = %self.name, device, method = %details.method, "SDK call completed");
        Ok(FetchOutput::Sdk(SdkReading {
            device: device.to_string(),
            method: details.method.clone(),
            value,
            timestamp: Utc::now(),
        }))
    }

    async fn disconnect(&mut self, ctx: &FetchContext) -> DriverResult<()> {
        ctx.run("disconnect", self.client.close()).await
    }

    async fn validate_config(&mut self, ctx: &FetchContext) -> DriverResult<()> {
        self.connect(ctx).await?;
        self.disconnect(ctx).await
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Factory for [`SdkDriver`].
#[derive(Debug, Clone, Default)]
pub struct SdkDriverFactory {
    profile: SimulationProfile,
}

impl SdkDriverFactory {
    /// Factory with a custom simulation profile.
    pub fn with_profile(profile: SimulationProfile) -> Self {
        Self { profile }
    }
}

impl DriverFactory for SdkDriverFactory {
    fn platform_type(&self) -> PlatformType {
        PlatformType::Sdk
    }

    fn create(
        &self,
        name: &str,
        metadata: &Sanitized<PlatformMetadata>,
    ) -> DriverResult<Box<dyn PlatformDriver>> {
        Ok(Box::new(SdkDriver::new(name, metadata, self.profile.clone())?))
    }
}
